//! mcpm registry manifest
//!
//! Decodes the `servers.json` published by mcpm: a mapping from server name
//! to record, with snake_case keys and nulls where a field is unknown.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::classifier::{ArgumentSchema, Env};
use crate::packages::{Repository, Tool};

/// Whole manifest, keyed by server name.
pub type McpmManifest = BTreeMap<String, McpmServer>;

/// One server record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct McpmServer {
    /// Server name (usually equal to the manifest key)
    #[serde(deserialize_with = "nullable")]
    pub name: String,

    /// Human readable name
    #[serde(deserialize_with = "nullable")]
    pub display_name: String,

    #[serde(deserialize_with = "nullable")]
    pub description: String,

    /// Source repository, shared by every installation
    pub repository: Option<Repository>,

    pub homepage: Option<String>,

    /// Author, mapped onto the canonical publisher
    pub author: Option<McpmAuthor>,

    #[serde(deserialize_with = "nullable")]
    pub license: String,

    #[serde(deserialize_with = "nullable")]
    pub categories: Vec<String>,

    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,

    /// Declared arguments, keyed by placeholder name
    #[serde(deserialize_with = "nullable")]
    pub arguments: ArgumentSchema,

    /// Installation methods, keyed by an upstream method name that does not
    /// always match the command
    #[serde(deserialize_with = "nullable")]
    pub installations: BTreeMap<String, McpmInstallation>,

    #[serde(deserialize_with = "nullable")]
    pub tools: Vec<Tool>,

    #[serde(deserialize_with = "nullable")]
    pub is_official: bool,
}

/// Server author
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct McpmAuthor {
    #[serde(deserialize_with = "nullable")]
    pub name: String,

    pub email: Option<String>,

    pub url: Option<String>,
}

/// One installation method
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct McpmInstallation {
    /// Upstream method type (`uvx`, `npm`, `docker`, `python`, ...)
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,

    /// Executable; this is what determines the runtime
    #[serde(deserialize_with = "nullable")]
    pub command: String,

    #[serde(deserialize_with = "nullable")]
    pub args: Vec<String>,

    #[serde(deserialize_with = "nullable")]
    pub env: Env,

    #[serde(deserialize_with = "nullable")]
    pub description: String,

    #[serde(deserialize_with = "nullable")]
    pub recommended: bool,
}

/// Treat JSON `null` like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tolerates_nulls_and_unknown_fields() {
        let json = r#"{
            "time": {
                "name": "time",
                "display_name": "Time",
                "license": null,
                "tags": null,
                "author": {"name": "Anthropic"},
                "examples": [{"title": "ignored"}],
                "installations": {
                    "uvx": {"type": "uvx", "command": "uvx", "args": ["mcp-server-time"], "env": null}
                }
            }
        }"#;

        let manifest: McpmManifest = serde_json::from_str(json).unwrap();
        let time = &manifest["time"];
        assert_eq!(time.display_name, "Time");
        assert!(time.license.is_empty());
        assert!(time.tags.is_empty());
        assert_eq!(time.author.as_ref().unwrap().name, "Anthropic");
        assert!(time.installations["uvx"].env.is_empty());
    }

    #[test]
    fn test_decode_tools_normalises_names() {
        let json = r#"{
            "name": "x",
            "tools": [{"name": "  Get_Time ", "inputSchema": {"type": "object", "required": ["tz"]}}]
        }"#;

        let server: McpmServer = serde_json::from_str(json).unwrap();
        assert_eq!(server.tools[0].name, "get_time");
        assert_eq!(server.tools[0].input_schema.required, vec!["tz"]);
    }
}
