//! Store configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoreError;
use crate::{
    Result,
    constants::{DEFAULT_KEY, DEFAULT_QUEUE_CAPACITY, DEFAULT_ROOT},
};

/// Configuration for a [`Store`](super::Store).
///
/// Every field has a default, so a partial JSON object is a valid
/// configuration:
///
/// ```
/// # use collab::StoreConfig;
/// let config = StoreConfig::from_json(r#"{ "root": "board" }"#).unwrap();
/// assert_eq!(config.root, "board");
/// assert_eq!(config.key, "value");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store id, also used as the origin of the store's transactions.
    /// A random UUID is generated when unset.
    pub id: Option<String>,
    /// Name of the top-level shared map holding the root node
    pub root: String,
    /// Key of the root node inside the top-level map
    pub key: String,
    /// Capacity of the store's command queue and of handler event queues
    pub queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id: None,
            root: DEFAULT_ROOT.to_string(),
            key: DEFAULT_KEY.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            StoreError::InvalidConfig {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            StoreError::InvalidConfig {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// The configured id, or a fresh UUID when none is set.
    pub(crate) fn resolve_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}
