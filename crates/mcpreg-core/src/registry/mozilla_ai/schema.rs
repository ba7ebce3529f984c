//! mozilla-ai registry manifest
//!
//! A mapping from server ID to record with camelCase keys. Unlike mcpm, every
//! installation carries its own package, version, transports and deprecation.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::classifier::{ArgumentSchema, Env};
use crate::packages::{Publisher, Repository, Tool};

/// Whole manifest, keyed by server ID.
pub type MozillaAiManifest = BTreeMap<String, MozillaAiServer>;

/// One server record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MozillaAiServer {
    /// Server ID; the manifest key is used when absent
    pub id: String,

    pub name: String,

    pub display_name: String,

    pub description: String,

    pub license: String,

    pub categories: Vec<String>,

    pub tags: Vec<String>,

    pub homepage: Option<String>,

    pub publisher: Publisher,

    pub tools: Vec<Tool>,

    /// Declared arguments, keyed by placeholder name
    pub arguments: ArgumentSchema,

    /// Installations keyed by runtime; the key must match `type` and `command`
    pub installations: BTreeMap<String, MozillaAiInstallation>,

    /// Server-level transports, used when an installation declares none
    pub transports: Vec<String>,

    pub is_official: bool,

    pub deprecated: bool,
}

/// One installation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MozillaAiInstallation {
    #[serde(rename = "type")]
    pub kind: String,

    pub command: String,

    pub args: Vec<String>,

    pub env: Env,

    /// Package identifier; extracted from `args` when absent
    pub package: String,

    /// Version token; `latest` when absent
    pub version: String,

    pub description: String,

    pub recommended: bool,

    pub deprecated: bool,

    /// Overrides the server-level transports when non-empty
    pub transports: Vec<String>,

    pub repository: Option<Repository>,
}

impl MozillaAiInstallation {
    /// Whether the installation key, `type` and `command` all name the same runtime.
    pub fn is_consistent(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty()
            && key.eq_ignore_ascii_case(self.kind.trim())
            && key.eq_ignore_ascii_case(self.command.trim())
    }
}
