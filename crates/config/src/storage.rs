use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

/// Where downloaded files are persisted and how they are linked.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory of the local file store.
    pub root: PathBuf,
    /// Public base URL used in resource links. Derived from the request host when unset.
    pub public_url: Option<Url>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./local_files"),
            public_url: None,
        }
    }
}
