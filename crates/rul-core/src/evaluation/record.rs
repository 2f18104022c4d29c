//! Typed decoding of persisted evaluation rows.
//!
//! The `calculations` and `predictions` columns arrive either as native
//! JSON/JSONB values or as JSON encoded in a text column. Both go through the
//! same typed decoding here; anything that does not fit becomes a
//! [`RulError::MalformedStoredRecord`] for that row alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{RulError, RulResult};

/// Placeholder used in errors when the model name itself is unreadable.
const UNNAMED: &str = "<unnamed>";

/// A metric as it was stored.
///
/// Stores are inconsistent about metric types (`0.91` vs `"0.91"`). The
/// stored form is kept so re-encoding returns exactly what was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// Numeric value of the metric.
    ///
    /// Text metrics are validated during decoding, so after a successful
    /// [`decode_row`] this never yields NaN.
    pub fn value(&self) -> f64 {
        match self {
            MetricValue::Number(v) => *v,
            MetricValue::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }

    fn from_json(name: &str, value: &Value) -> Result<Self, String> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(MetricValue::Number)
                .ok_or_else(|| format!("metric '{}' is out of f64 range", name)),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(MetricValue::Text(s.clone())),
                _ => Err(format!("metric '{}' is not numeric: {:?}", name, s)),
            },
            other => Err(format!(
                "metric '{}' must be a number or numeric string, got {}",
                name,
                json_kind(other)
            )),
        }
    }
}

/// How a structured column arrived from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredColumn {
    /// Native JSON/JSONB (or array) value.
    Structured(Value),
    /// JSON encoded in a text column.
    Text(String),
    /// SQL NULL.
    Null,
    /// A column type the adapter cannot read; holds the type name.
    Unsupported(String),
}

impl StoredColumn {
    fn into_value(self, column: &str) -> Result<Value, String> {
        match self {
            // A JSON string inside a JSON column is double-encoded text
            StoredColumn::Structured(Value::String(text)) | StoredColumn::Text(text) => {
                serde_json::from_str(&text)
                    .map_err(|e| format!("{} is not valid JSON text: {}", column, e))
            }
            StoredColumn::Structured(value) => Ok(value),
            StoredColumn::Null => Err(format!("{} is NULL", column)),
            StoredColumn::Unsupported(ty) => {
                Err(format!("{} has unsupported column type {}", column, ty))
            }
        }
    }
}

/// One evaluation row as read from the store, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvaluationRow {
    pub model: Option<String>,
    pub calculations: StoredColumn,
    pub predictions: StoredColumn,
}

/// Decoded evaluation results for one trained model variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub model_name: String,
    /// Metric name → value, e.g. `"Accuracy"`, `"RMSE"`.
    pub calculations: BTreeMap<String, MetricValue>,
    /// Raw prediction series. Never empty.
    pub predictions: Vec<f64>,
}

impl EvaluationRecord {
    /// Re-encode the structured columns as JSON text.
    pub fn encode(&self) -> RawEvaluationRow {
        RawEvaluationRow {
            model: Some(self.model_name.clone()),
            calculations: StoredColumn::Text(json!(self.calculations).to_string()),
            predictions: StoredColumn::Text(json!(self.predictions).to_string()),
        }
    }
}

/// Decode one stored row into an [`EvaluationRecord`].
///
/// # Errors
///
/// [`RulError::MalformedStoredRecord`] when the model name is missing or
/// either structured column fails to decode.
pub fn decode_row(raw: RawEvaluationRow) -> RulResult<EvaluationRecord> {
    let model_name = raw
        .model
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| RulError::malformed(UNNAMED, "model name is NULL or empty"))?;

    let calculations = raw
        .calculations
        .into_value("calculations")
        .and_then(|value| decode_calculations(&value))
        .map_err(|message| RulError::malformed(model_name.as_str(), message))?;

    let predictions = raw
        .predictions
        .into_value("predictions")
        .and_then(|value| decode_predictions(&value))
        .map_err(|message| RulError::malformed(model_name.as_str(), message))?;

    Ok(EvaluationRecord {
        model_name,
        calculations,
        predictions,
    })
}

fn decode_calculations(value: &Value) -> Result<BTreeMap<String, MetricValue>, String> {
    let object = value.as_object().ok_or_else(|| {
        format!("calculations must be a JSON object, got {}", json_kind(value))
    })?;

    object
        .iter()
        .map(|(name, metric)| MetricValue::from_json(name, metric).map(|m| (name.clone(), m)))
        .collect()
}

fn decode_predictions(value: &Value) -> Result<Vec<f64>, String> {
    let items = value.as_array().ok_or_else(|| {
        format!("predictions must be a JSON array, got {}", json_kind(value))
    })?;

    if items.is_empty() {
        return Err("predictions must not be empty".to_string());
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_f64()
                .ok_or_else(|| format!("predictions[{}] is not a number: {}", i, item))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lstm_row(calculations: StoredColumn, predictions: StoredColumn) -> RawEvaluationRow {
        RawEvaluationRow {
            model: Some("LSTM".to_string()),
            calculations,
            predictions,
        }
    }

    #[test]
    fn test_decodes_structured_columns() {
        let raw = lstm_row(
            StoredColumn::Structured(json!({"Accuracy": 0.91, "RMSE": 0.12})),
            StoredColumn::Structured(json!([1, 2, 3])),
        );

        let record = decode_row(raw).unwrap();

        assert_eq!(record.model_name, "LSTM");
        assert_eq!(record.calculations["Accuracy"], MetricValue::Number(0.91));
        assert_eq!(record.predictions, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_decodes_text_columns() {
        let raw = lstm_row(
            StoredColumn::Text(r#"{"Accuracy":"0.91","RMSE":"0.12"}"#.to_string()),
            StoredColumn::Text("[1.5, 2.5]".to_string()),
        );

        let record = decode_row(raw).unwrap();

        assert_eq!(
            record.calculations["Accuracy"],
            MetricValue::Text("0.91".to_string())
        );
        assert!((record.calculations["RMSE"].value() - 0.12).abs() < 1e-12);
        assert_eq!(record.predictions, vec![1.5, 2.5]);
    }

    #[test]
    fn test_structured_and_text_decode_identically() {
        let structured = decode_row(lstm_row(
            StoredColumn::Structured(json!({"RMSE": 0.25})),
            StoredColumn::Structured(json!([4.0, 5.0])),
        ))
        .unwrap();
        let text = decode_row(lstm_row(
            StoredColumn::Text(r#"{"RMSE": 0.25}"#.to_string()),
            StoredColumn::Text("[4.0, 5.0]".to_string()),
        ))
        .unwrap();

        assert_eq!(structured, text);
    }

    #[test]
    fn test_decodes_json_strings_inside_json_columns() {
        let raw = lstm_row(
            StoredColumn::Structured(json!("{\"RMSE\": 0.12}")),
            StoredColumn::Structured(json!("[1, 2, 3]")),
        );

        let record = decode_row(raw).unwrap();

        assert_eq!(record.calculations["RMSE"], MetricValue::Number(0.12));
        assert_eq!(record.predictions, vec![1.0, 2.0, 3.0]);

        let bad = decode_row(lstm_row(
            StoredColumn::Structured(json!({})),
            StoredColumn::Structured(json!("not json")),
        ));
        assert!(matches!(bad, Err(RulError::MalformedStoredRecord { .. })));
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let originals = [
            lstm_row(
                StoredColumn::Text(r#"{"Accuracy":"0.91","RMSE":"0.12"}"#.to_string()),
                StoredColumn::Structured(json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10])),
            ),
            lstm_row(
                StoredColumn::Structured(json!({"MAE": 17.123456789, "R2": -0.5})),
                StoredColumn::Text("[0.1, 1e-9, 123456.789, -42]".to_string()),
            ),
        ];

        for raw in originals {
            let decoded = decode_row(raw).unwrap();
            let reencoded = decoded.encode();
            assert_eq!(decode_row(reencoded).unwrap(), decoded);
        }
    }

    #[test]
    fn test_invalid_json_text_is_malformed() {
        let err = decode_row(lstm_row(
            StoredColumn::Text("{not json".to_string()),
            StoredColumn::Structured(json!([1])),
        ))
        .unwrap_err();

        match err {
            RulError::MalformedStoredRecord { model, message } => {
                assert_eq!(model, "LSTM");
                assert!(message.contains("calculations"), "{message}");
            }
            other => panic!("expected MalformedStoredRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_predictions_are_malformed() {
        let err = decode_row(lstm_row(
            StoredColumn::Structured(json!({})),
            StoredColumn::Structured(json!([])),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_non_numeric_entries_are_malformed() {
        assert!(decode_row(lstm_row(
            StoredColumn::Structured(json!({"Accuracy": "high"})),
            StoredColumn::Structured(json!([1])),
        ))
        .is_err());

        assert!(decode_row(lstm_row(
            StoredColumn::Structured(json!({"Accuracy": 0.9})),
            StoredColumn::Structured(json!([1, "two"])),
        ))
        .is_err());

        assert!(decode_row(lstm_row(
            StoredColumn::Structured(json!([0.9])),
            StoredColumn::Structured(json!([1])),
        ))
        .is_err());
    }

    #[test]
    fn test_null_unsupported_and_unnamed_rows_are_malformed() {
        assert!(decode_row(lstm_row(
            StoredColumn::Null,
            StoredColumn::Structured(json!([1])),
        ))
        .is_err());
        assert!(decode_row(lstm_row(
            StoredColumn::Structured(json!({})),
            StoredColumn::Unsupported("bytea".to_string()),
        ))
        .is_err());

        let err = decode_row(RawEvaluationRow {
            model: None,
            calculations: StoredColumn::Structured(json!({})),
            predictions: StoredColumn::Structured(json!([1])),
        })
        .unwrap_err();
        assert!(err.to_string().contains(UNNAMED));
    }
}
