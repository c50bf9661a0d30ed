/// Formatting helpers for log output
use time::{format_description, OffsetDateTime};

use crate::models::{Fields, Value};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format.
/// Falls back to the default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]")
        .ok()
        .and_then(|format| dt.format(&format).ok())
        .unwrap_or_else(|| dt.to_string())
}

/// Render fields as `name=value` pairs on one line
pub fn format_fields(fields: &Fields) -> String {
    fields
        .iter()
        .map(|(name, value)| match value {
            Value::Number(number) => format!("{}={:.2}", name, number),
            other => format!("{}={}", name, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_datetime() {
        let dt = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(format_datetime(&dt), "05.03.2024 - 07:08:09");
    }

    #[test]
    fn formats_fields_in_order() {
        let fields: Fields = vec![
            ("T_C", Value::Number(22.3)),
            ("P_Pa", Value::Integer(101_000)),
            ("AQI_accuracy", Value::Name("HIGH")),
        ];
        assert_eq!(
            format_fields(&fields),
            "T_C=22.30 P_Pa=101000 AQI_accuracy=HIGH"
        );
    }

    #[test]
    fn empty_fields_render_empty() {
        assert_eq!(format_fields(&Vec::new()), "");
    }
}
