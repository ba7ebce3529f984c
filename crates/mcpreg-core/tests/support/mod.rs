#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use mcpreg_core::cache::Fetch;
use mcpreg_core::error::{RegistryError, Result};

pub const MCPM_URL: &str = "https://registry.test/mcpm/servers.json";
pub const MOZILLA_URL: &str = "https://registry.test/mozilla/registry.json";

/// In-memory [`Fetch`] that counts requests and can hold them until released.
#[derive(Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.as_bytes().to_vec());
        self
    }

    /// Every fetch waits for a permit from `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| RegistryError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// mcpm manifest with three uvx servers and one docker-only server.
pub const MCPM_MANIFEST: &str = r#"{
    "time": {
        "name": "time",
        "display_name": "Time",
        "license": "MIT",
        "tags": ["time", "timezone"],
        "arguments": {"TZ": {"description": "Timezone", "required": false}},
        "installations": {
            "uvx": {"type": "uvx", "command": "uvx", "args": ["mcp-server-time", "--local-timezone=${TZ}"]}
        },
        "tools": [{"name": "Get_Current_Time", "description": "Current time"}]
    },
    "fetch": {
        "name": "fetch",
        "display_name": "Fetch",
        "license": "MIT",
        "installations": {
            "uvx": {"type": "uvx", "command": "uvx", "args": ["mcp-server-fetch"]}
        }
    },
    "git": {
        "name": "git",
        "display_name": "Git",
        "license": "Apache-2.0",
        "arguments": {"REPO": {"description": "Repository path", "required": true}},
        "installations": {
            "uvx": {"type": "uvx", "command": "uvx", "args": ["mcp-server-git", "--repository", "${REPO}"]}
        }
    },
    "github": {
        "name": "github",
        "display_name": "GitHub",
        "license": "MIT",
        "is_official": true,
        "installations": {
            "docker": {"type": "docker", "command": "docker", "args": ["run", "-i", "--rm", "ghcr.io/github/github-mcp-server"]}
        }
    }
}"#;
