use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel a source delivers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Whatsapp,
    Webhook,
    GoogleSheets,
    #[serde(other)]
    Other,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whatsapp => write!(f, "whatsapp"),
            Self::Webhook => write!(f, "webhook"),
            Self::GoogleSheets => write!(f, "google_sheets"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl SourceKind {
    /// Unknown kinds map to `Other` rather than failing the row
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "whatsapp" => Self::Whatsapp,
            "webhook" => Self::Webhook,
            "google_sheets" => Self::GoogleSheets,
            _ => Self::Other,
        }
    }
}

/// Outbound integration endpoint (WhatsApp number, client webhook, sheet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub kind: SourceKind,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl Source {
    pub fn is_usable_for(&self, kind: SourceKind) -> bool {
        self.is_active && self.kind == kind
    }
}
