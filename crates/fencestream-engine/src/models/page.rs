use serde::{Deserialize, Serialize};

use super::Action;

/// A named target surface accumulating the actions applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    /// Block-type keyword of the fence that created the page (e.g. `mermaid`).
    #[serde(rename = "type")]
    pub page_type: String,
    /// Append-only log in arrival order.
    #[serde(default)]
    pub steps: Vec<Action>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub forms: Vec<serde_json::Value>,
}

impl Page {
    pub const DEFAULT_TITLE: &'static str = "Untitled";

    pub fn new(id: impl Into<String>, page_type: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            id: id.into(),
            title: title.unwrap_or(Self::DEFAULT_TITLE).to_string(),
            page_type: page_type.into(),
            steps: Vec::new(),
            notes: Vec::new(),
            forms: Vec::new(),
        }
    }
}
