use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use binwatch_core::{
    config::AlertSettings,
    model::{Bin, BinId, Location, Recipient, RecipientId, SensorId},
};
use binwatch_notifier_mail::MailSettings;
use serde::Deserialize;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Root of the daemon's TOML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DaemonConfig {
    pub alerts: AlertSettings,
    pub mail: MailSettings,
    pub bins: Vec<BinConfig>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BinConfig {
    pub id: String,
    pub name: String,
    pub sensor: String,
    pub height: f64,
    pub threshold: f64,
    pub location: Option<String>,
    #[serde(default)]
    pub recipients: Vec<RecipientConfig>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecipientConfig {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

impl DaemonConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the fill and alert logic cannot work with.
    fn validate(&self) -> Result<()> {
        ensure!(
            self.alerts.has_valid_scale(),
            "alerts.percentage_scale must be finite and positive, got {}",
            self.alerts.percentage_scale
        );
        ensure!(
            self.alerts.try_interval().is_some(),
            "alerts.interval_minutes must be between 0 and {} minutes, got {}",
            i64::MAX / MILLIS_PER_MINUTE,
            self.alerts.interval_minutes
        );
        ensure!(self.mail.timeout_ms > 0, "mail.timeout_ms must be positive");
        Ok(())
    }

    /// Bins as seeded into the store, with empty alert state.
    pub(crate) fn seed_bins(&self) -> Vec<Bin> {
        self.bins.iter().map(BinConfig::to_bin).collect()
    }
}

impl BinConfig {
    fn to_bin(&self) -> Bin {
        Bin {
            id: BinId(self.id.clone()),
            name: self.name.clone(),
            sensor: SensorId(self.sensor.clone()),
            height: self.height,
            threshold: self.threshold,
            current_fill_percentage: 0.0,
            last_alert_time: None,
            location: self.location.clone().map(|address| Location { address }),
            recipients: self
                .recipients
                .iter()
                .map(|recipient| Recipient {
                    id: RecipientId(recipient.id.clone()),
                    name: recipient.name.clone(),
                    email: recipient.email.clone(),
                })
                .collect(),
        }
    }
}
