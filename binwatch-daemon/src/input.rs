use binwatch_core::model::SensorId;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Line {
    /// Blank line or `#` comment.
    Skip,
    Reading { sensor: SensorId, distance: f64 },
    Malformed(String),
}

/// Parse one `<sensor-id> <distance>` line from the reading feed.
pub(crate) fn parse_line(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Line::Skip;
    }

    let mut fields = line.split_whitespace();
    let (Some(sensor), Some(distance), None) = (fields.next(), fields.next(), fields.next())
    else {
        return Line::Malformed(format!("expected `<sensor> <distance>`, got `{line}`"));
    };

    match distance.parse::<f64>() {
        Ok(distance) => Line::Reading {
            sensor: SensorId(sensor.to_owned()),
            distance,
        },
        Err(err) => Line::Malformed(format!("invalid distance `{distance}`: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reading() {
        assert_eq!(
            parse_line("  s-100   12.5 "),
            Line::Reading {
                sensor: SensorId("s-100".into()),
                distance: 12.5,
            }
        );
    }

    #[test]
    fn skips_blank_and_comments() {
        assert_eq!(parse_line(""), Line::Skip);
        assert_eq!(parse_line("   "), Line::Skip);
        assert_eq!(parse_line("# calibration run"), Line::Skip);
    }

    #[test]
    fn rejects_malformed_lines() {
        for raw in ["s-100", "s-100 12 extra", "s-100 deep"] {
            assert!(matches!(parse_line(raw), Line::Malformed(_)), "{raw}");
        }
    }

    #[test]
    fn negative_distance_passes_through() {
        assert!(
            matches!(parse_line("s-1 -3"), Line::Reading { distance, .. } if distance < 0.0),
            "negative readings are left to the calculator"
        );
    }
}
