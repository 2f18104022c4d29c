//! Feature document parsing and validation.
//!
//! Two encodings are accepted:
//!
//! - JSON: `{ "data": [[f64, ...], ...], "features": n }`, recognised by a
//!   leading `{` after optional whitespace.
//! - Plain text: one row per line, whitespace-separated numbers. Blank lines
//!   and `#` comments are skipped; the width of the first row is the
//!   feature count.

use serde::Serialize;
use serde_json::Value;

use crate::error::{RulError, RulResult};

/// A validated feature matrix. Every row has exactly `feature_count` values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFeatureSet {
    rows: Vec<Vec<f64>>,
    feature_count: usize,
}

impl UploadedFeatureSet {
    /// Build from rows, checking that the matrix is non-empty and uniform.
    ///
    /// # Errors
    ///
    /// - `UnparsableUpload` for zero features, no rows, ragged rows or
    ///   non-finite values
    /// - `ShapeMismatch` when the rows agree with each other but not with
    ///   `feature_count`
    pub fn new(rows: Vec<Vec<f64>>, feature_count: usize) -> RulResult<Self> {
        if feature_count == 0 {
            return Err(RulError::UnparsableUpload(
                "features must be greater than 0".to_string(),
            ));
        }
        let first_width = match rows.first() {
            Some(row) => row.len(),
            None => return Err(RulError::UnparsableUpload("data has no rows".to_string())),
        };

        for (i, row) in rows.iter().enumerate() {
            if row.len() != first_width {
                return Err(RulError::UnparsableUpload(format!(
                    "ragged rows: row 0 has {} values, row {} has {}",
                    first_width,
                    i,
                    row.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(RulError::UnparsableUpload(format!(
                    "data[{}][{}] is not a finite number",
                    i, j
                )));
            }
        }

        if first_width != feature_count {
            return Err(RulError::ShapeMismatch {
                expected: feature_count,
                actual: first_width,
            });
        }

        Ok(Self {
            rows,
            feature_count,
        })
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Row-major flattening, `row_count * feature_count` values.
    pub fn flatten(&self) -> Vec<f64> {
        self.rows.iter().flatten().copied().collect()
    }
}

/// Parse an uploaded document into a validated [`UploadedFeatureSet`].
pub fn parse_feature_document(bytes: &[u8]) -> RulResult<UploadedFeatureSet> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| RulError::UnparsableUpload(format!("upload is not UTF-8 text: {}", e)))?;

    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Err(RulError::UnparsableUpload("upload is empty".to_string()));
    }

    if trimmed.starts_with('{') {
        parse_json_document(trimmed)
    } else {
        parse_text_matrix(trimmed)
    }
}

fn parse_json_document(text: &str) -> RulResult<UploadedFeatureSet> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| RulError::UnparsableUpload(format!("invalid JSON: {}", e)))?;

    let features = match document.get("features") {
        Some(value) => value.as_u64().ok_or_else(|| {
            RulError::UnparsableUpload(format!(
                "features must be a non-negative integer, got {}",
                value
            ))
        })?,
        None => return Err(RulError::UnparsableUpload("missing field 'features'".to_string())),
    };

    let data = document
        .get("data")
        .ok_or_else(|| RulError::UnparsableUpload("missing field 'data'".to_string()))?
        .as_array()
        .ok_or_else(|| RulError::UnparsableUpload("data must be an array of rows".to_string()))?;

    let rows = data
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let values = row.as_array().ok_or_else(|| {
                RulError::UnparsableUpload(format!("data[{}] is not an array", i))
            })?;
            values
                .iter()
                .enumerate()
                .map(|(j, v)| {
                    v.as_f64().ok_or_else(|| {
                        RulError::UnparsableUpload(format!(
                            "data[{}][{}] is not a number: {}",
                            i, j, v
                        ))
                    })
                })
                .collect::<RulResult<Vec<f64>>>()
        })
        .collect::<RulResult<Vec<Vec<f64>>>>()?;

    let features = usize::try_from(features)
        .map_err(|_| RulError::UnparsableUpload(format!("features={} is too large", features)))?;
    UploadedFeatureSet::new(rows, features)
}

fn parse_text_matrix(text: &str) -> RulResult<UploadedFeatureSet> {
    let mut rows = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let row = content
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    RulError::UnparsableUpload(format!(
                        "line {}: '{}' is not a number",
                        line_no + 1,
                        token
                    ))
                })
            })
            .collect::<RulResult<Vec<f64>>>()?;
        rows.push(row);
    }

    let width = rows.first().map(Vec::len).unwrap_or(0);
    UploadedFeatureSet::new(rows, width)
}
