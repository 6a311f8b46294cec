//! Per-field results returned by bridge write calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An error object as the bridge reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub code: u32,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl ApiError {
    /// "link button not pressed"
    pub const LINK_BUTTON_NOT_PRESSED: u32 = 101;
    /// "unauthorized user"
    pub const UNAUTHORIZED_USER: u32 = 1;
}

/// One entry of the result array the bridge returns for a write.
///
/// ```
/// use hue_node_rs::FieldResult;
///
/// let results: Vec<FieldResult> = serde_json::from_str(r#"[
///     {"success": {"/lights/1/state/on": true}},
///     {"error": {"type": 201, "address": "/lights/1/state/bri",
///                "description": "parameter, bri, is not modifiable. Device is set to off."}}
/// ]"#).unwrap();
///
/// assert!(results[0].is_success());
/// assert!(!FieldResult::all_success(&results));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldResult {
    Success(Value),
    Error(ApiError),
}

impl FieldResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FieldResult::Success(_))
    }

    /// True when every entry is affirmative.
    ///
    /// An empty list counts as success, matching a bridge that had nothing
    /// to change.
    pub fn all_success(results: &[FieldResult]) -> bool {
        results.iter().all(FieldResult::is_success)
    }

    /// The rejected fields, for logging.
    pub fn failures(results: &[FieldResult]) -> Vec<&ApiError> {
        results
            .iter()
            .filter_map(|r| match r {
                FieldResult::Error(err) => Some(err),
                FieldResult::Success(_) => None,
            })
            .collect()
    }
}
