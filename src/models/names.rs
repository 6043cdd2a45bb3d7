use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted row of the `names` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NameRecord {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddNameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Uniform `{status, message}` wrapper used by every non-list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: String,
    pub message: String,
}

impl Envelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    pub db_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamesResponse {
    pub names: Vec<String>,
}
