use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ProxyEndpoint;

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Persisted client record: the secret and the ordered proxy pool.
/// The rotation cursor is deliberately absent; it is process state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub password: String,
    pub proxies: Vec<ProxyEndpoint>,
}

/// The whole persisted store: one JSON document on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: u32,
    #[serde(rename = "savedAt", default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
    pub clients: BTreeMap<String, ClientRecord>,
}

impl StoreDocument {
    pub fn empty() -> Self {
        Self {
            version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            clients: BTreeMap::new(),
        }
    }

    /// Parse the persisted document.
    ///
    /// Accepts the versioned layout, and falls back to the legacy
    /// versionless layout (a bare name -> record map) so config files
    /// written before the version field keep loading.
    pub fn from_json(data: &str) -> Result<Self> {
        if let Ok(doc) = serde_json::from_str::<StoreDocument>(data) {
            return Ok(doc);
        }

        let clients: BTreeMap<String, ClientRecord> = serde_json::from_str(data)?;
        Ok(Self {
            version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            clients,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-client row in the management listing. Secrets are never echoed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub proxies: usize,
    pub current_index: usize,
}

/// Request to register a new client with an optional initial proxy batch.
///
/// Fields default to empty so an absent field reports the same 400 as an
/// empty one; the handlers validate presence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddClientRequest {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub proxies: Vec<String>,
}

/// Request to append one proxy to a client's pool
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProxyRequest {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub proxy: String,
}

/// Request to remove one proxy from a client's pool
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveProxyRequest {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub proxy: String,
}

/// Request to advance a client's rotation cursor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateClientRequest {
    #[serde(default)]
    pub client_name: String,
}
