//! Canonical server record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Arguments, Installation, Installations, Tools, Transports};
use crate::filter::normalize_string;
use crate::runtime::Runtime;

/// Who publishes a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A server as seen by every consumer, whatever registry it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// Lowercased, trimmed identifier; unique within a provider.
    pub id: String,
    /// ID of the provider that produced this record.
    pub source: String,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub publisher: Publisher,
    #[serde(default)]
    pub tools: Tools,
    pub installations: Installations,
    #[serde(default)]
    pub arguments: Arguments,
    #[serde(default)]
    pub is_official: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, rename = "_meta", skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Server {
    /// Runtimes this server can be launched with, sorted.
    pub fn runtimes(&self) -> Vec<Runtime> {
        self.installations.runtimes()
    }

    pub fn runtime_names(&self) -> Vec<String> {
        self.runtimes().iter().map(|r| r.as_str().to_string()).collect()
    }

    pub fn installation(&self, runtime: Runtime) -> Option<&Installation> {
        self.installations.get(runtime)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.names()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.get(name).is_some()
    }

    /// Union of installation transports; never empty.
    pub fn transports(&self) -> Transports {
        self.installations.transports()
    }

    /// Normalised versions of name-like fields, used for name matching.
    pub fn names(&self) -> [String; 3] {
        [
            normalize_string(&self.name),
            normalize_string(&self.display_name),
            self.id.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::{Installation, Tool, Transport};

    fn server() -> Server {
        let mut installations = Installations::new();
        for (runtime, transports) in [
            (Runtime::Uvx, vec!["stdio"]),
            (Runtime::Docker, vec!["sse"]),
        ] {
            installations.insert(Installation {
                runtime,
                package: "mcp-server-time".to_string(),
                version: "latest".to_string(),
                description: String::new(),
                recommended: runtime == Runtime::Uvx,
                deprecated: false,
                transports: Transports::from_strings(transports),
                repository: None,
            });
        }
        Server {
            id: "time".to_string(),
            source: "test".to_string(),
            name: "mcp-server-time".to_string(),
            display_name: "Time".to_string(),
            description: String::new(),
            license: "MIT".to_string(),
            categories: vec![],
            tags: vec![],
            homepage: None,
            publisher: Publisher::default(),
            tools: Tools::new(vec![Tool::new("get_current_time", "")]),
            installations,
            arguments: Arguments::new(),
            is_official: true,
            deprecated: false,
            meta: Map::new(),
        }
    }

    #[test]
    fn test_runtimes_sorted() {
        assert_eq!(server().runtime_names(), vec!["docker", "uvx"]);
    }

    #[test]
    fn test_transports_union() {
        let transports = server().transports();
        assert!(transports.contains(Transport::Stdio));
        assert!(transports.contains(Transport::Sse));
        assert_eq!(transports.len(), 2);
    }

    #[test]
    fn test_has_tool_is_case_insensitive() {
        assert!(server().has_tool("GET_CURRENT_TIME"));
        assert!(!server().has_tool("convert_time"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(server()).unwrap();
        assert_eq!(json["displayName"], "Time");
        assert_eq!(json["isOfficial"], true);
        assert_eq!(json["installations"]["uvx"]["package"], "mcp-server-time");
    }
}
