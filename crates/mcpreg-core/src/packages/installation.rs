//! Installations and transports.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::runtime::Runtime;

/// Wire transport a server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    Stdio,
    Sse,
    StreamableHttp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse => "sse",
            Transport::StreamableHttp => "streamable-http",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "sse" => Ok(Transport::Sse),
            "streamable-http" => Ok(Transport::StreamableHttp),
            _ => Err(()),
        }
    }
}

/// Non-empty set of transports. Defaults to `{stdio}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transports(BTreeSet<Transport>);

impl Transports {
    /// Keep the known transports in `values`; fall back to `{stdio}` when none survive.
    pub fn from_strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<Transport> = values
            .into_iter()
            .filter_map(|v| v.as_ref().parse().ok())
            .collect();
        Self::from_set(set)
    }

    pub fn from_set(set: BTreeSet<Transport>) -> Self {
        if set.is_empty() {
            Self::default()
        } else {
            Self(set)
        }
    }

    pub fn contains(&self, transport: Transport) -> bool {
        self.0.contains(&transport)
    }

    pub fn iter(&self) -> impl Iterator<Item = Transport> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl Default for Transports {
    fn default() -> Self {
        Self(BTreeSet::from([Transport::Stdio]))
    }
}

/// Source repository of an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// A runtime-specific way to launch a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub runtime: Runtime,
    pub package: String,
    /// Opaque version token, compared by equality only.
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub transports: Transports,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
}

/// Installations of one server, keyed by runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Installations(BTreeMap<Runtime, Installation>);

impl Installations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an installation, replacing any existing one for the same runtime.
    pub fn insert(&mut self, installation: Installation) {
        self.0.insert(installation.runtime, installation);
    }

    pub fn get(&self, runtime: Runtime) -> Option<&Installation> {
        self.0.get(&runtime)
    }

    pub fn runtimes(&self) -> Vec<Runtime> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Installation> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when there is at least one installation and every one is deprecated.
    pub fn all_deprecated(&self) -> bool {
        !self.0.is_empty() && self.0.values().all(|i| i.deprecated)
    }

    pub fn any_deprecated(&self) -> bool {
        self.0.values().any(|i| i.deprecated)
    }

    /// Installations whose runtime is in `supported`.
    pub fn filter_supported(&self, supported: &BTreeSet<Runtime>) -> Installations {
        Installations(
            self.0
                .iter()
                .filter(|(runtime, _)| supported.contains(runtime))
                .map(|(runtime, install)| (*runtime, install.clone()))
                .collect(),
        )
    }

    /// Installations flagged as recommended upstream.
    pub fn recommended(&self) -> Vec<&Installation> {
        self.0.values().filter(|i| i.recommended).collect()
    }

    /// Union of all installation transports, `{stdio}` when empty.
    pub fn transports(&self) -> Transports {
        Transports::from_set(self.0.values().flat_map(|i| i.transports.iter()).collect())
    }

    pub fn versions(&self) -> Vec<String> {
        self.0.values().map(|i| i.version.clone()).collect()
    }
}

impl FromIterator<Installation> for Installations {
    fn from_iter<T: IntoIterator<Item = Installation>>(iter: T) -> Self {
        let mut installations = Installations::new();
        for installation in iter {
            installations.insert(installation);
        }
        installations
    }
}
