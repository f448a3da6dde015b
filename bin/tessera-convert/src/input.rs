use std::io::BufRead;

use serde::de::DeserializeOwned;
use tessera_error::{ErrorContext as _, GenericError};

/// Reads one JSON document per line.
///
/// Blank lines are ignored. Fails on the first line that cannot be read or decoded, naming its line number.
pub fn read_json_lines<T, R>(reader: R) -> Result<Vec<T>, GenericError>
where
    T: DeserializeOwned,
    R: BufRead,
{
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line.with_error_context(|| format!("Failed to read input line {}.", line_number))?;
        if line.trim().is_empty() {
            continue;
        }

        let item = serde_json::from_str(&line)
            .with_error_context(|| format!("Failed to decode input line {}.", line_number))?;
        items.push(item);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use tessera_measurement::{FamilySamples, FieldValue, Measurement, MetricFamily};

    use super::*;

    #[test]
    fn measurements() {
        let input = concat!(
            r#"{"name":"cpu","tags":{"host":"a"},"timestamp":"2024-01-01T00:00:00Z","fields":{"usage":10.5}}"#,
            "\n\n",
            r#"{"name":"cpu","timestamp":"2024-01-01T00:00:10Z","fields":{"count":3,"up":true}}"#,
            "\n",
        );

        let measurements = read_json_lines::<Measurement, _>(input.as_bytes()).unwrap();
        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].tags().get("host"), Some("a"));
        assert_eq!(
            measurements[1].fields(),
            &[
                ("count".to_string(), FieldValue::I64(3)),
                ("up".to_string(), FieldValue::Bool(true))
            ]
        );
    }

    #[test]
    fn families() {
        let input = r#"{"name":"up","type":"gauge","samples":[{"labels":{"job":"node"},"value":1}]}"#;

        let families = read_json_lines::<MetricFamily, _>(input.as_bytes()).unwrap();
        assert_eq!(families.len(), 1);
        assert!(matches!(families[0].samples(), FamilySamples::Gauge(samples) if samples.len() == 1));
    }

    #[test]
    fn bad_line_is_reported() {
        let input = concat!(
            r#"{"name":"cpu","timestamp":"2024-01-01T00:00:00Z","fields":{"usage":1.0}}"#,
            "\n",
            r#"{"name":"cpu","timestamp":"2024-01-01T00:00:00Z","fields":{}}"#,
            "\n",
        );

        let err = read_json_lines::<Measurement, _>(input.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to decode input line 2.");
    }
}
