//! JSON serialization for analysis results.

use crate::result::ImpactAnalysis;

/// Serialize an analysis to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails. Non-finite floats are written
/// as `null`.
pub fn to_json(analysis: &ImpactAnalysis) -> Result<String, serde_json::Error> {
    serde_json::to_string(analysis)
}

/// Serialize an analysis to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty(analysis: &ImpactAnalysis) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(analysis)
}
