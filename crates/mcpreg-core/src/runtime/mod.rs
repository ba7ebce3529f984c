//! Runtime catalogue for MCP server installations.
//!
//! A [`Runtime`] names the tool used to launch a server (`uvx`, `npx`,
//! `docker`, `python`). Each runtime has a [`RuntimeSpec`] describing how its
//! command line is read:
//!
//! | Runtime | Ignored flags | Package token |
//! |---------|---------------|---------------|
//! | `uvx`    | `--from`, `--with`, `--python` | first plain token, never a URL |
//! | `npx`    | `-y`, `--yes`, `-p`, `--package` | first plain token |
//! | `docker` | `--rm`, `-i`, `-v`, `--name`, `--network`, `-d`, ... | first plain token after `run` |
//! | `python` | `-m`, `-u` | first plain token that is not a `.py` script |
//!
//! Short flags (single dash) are ignored for every runtime unless a spec says
//! otherwise.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Execution backend for an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Docker,
    Npx,
    Python,
    Uvx,
}

impl Runtime {
    /// Every runtime the catalogue knows about, in alphabetical order.
    pub fn all() -> [Runtime; 4] {
        [Runtime::Docker, Runtime::Npx, Runtime::Python, Runtime::Uvx]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Docker => "docker",
            Runtime::Npx => "npx",
            Runtime::Python => "python",
            Runtime::Uvx => "uvx",
        }
    }

    /// Command-line parsing rules for this runtime.
    pub fn spec(&self) -> &'static RuntimeSpec {
        match self {
            Runtime::Docker => &DOCKER_SPEC,
            Runtime::Npx => &NPX_SPEC,
            Runtime::Python => &PYTHON_SPEC,
            Runtime::Uvx => &UVX_SPEC,
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Runtime {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "docker" => Ok(Runtime::Docker),
            "npx" => Ok(Runtime::Npx),
            "python" => Ok(Runtime::Python),
            "uvx" => Ok(Runtime::Uvx),
            _ => Err(RegistryError::invalid(format!(
                "unsupported runtime '{}'. Valid values: docker, npx, python, uvx",
                value
            ))),
        }
    }
}

/// Runtimes used when the caller does not narrow the set.
pub fn default_supported_runtimes() -> BTreeSet<Runtime> {
    Runtime::all().into_iter().collect()
}

/// Parse a comma separated runtime list such as `"uvx,npx"`.
pub fn parse_runtimes(value: &str) -> Result<BTreeSet<Runtime>, RegistryError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Runtime::from_str)
        .collect()
}

/// Per-runtime rules for reading an installation's `args`.
#[derive(Debug)]
pub struct RuntimeSpec {
    /// Flags that belong to the runtime itself rather than the server.
    ignored_flags: &'static [&'static str],
    /// Ignored flags that also consume the following token as their value.
    value_flags: &'static [&'static str],
    /// Bare tokens that are runtime subcommands, never package names.
    subcommands: &'static [&'static str],
    /// Single-dash flags are skipped wholesale.
    ignore_short_flags: bool,
    /// Raw `http(s)://` tokens are not package names.
    reject_urls: bool,
}

static UVX_SPEC: RuntimeSpec = RuntimeSpec {
    ignored_flags: &["--from", "--with", "--python"],
    value_flags: &["--from", "--with", "--python"],
    subcommands: &[],
    ignore_short_flags: true,
    reject_urls: true,
};

static NPX_SPEC: RuntimeSpec = RuntimeSpec {
    ignored_flags: &["-y", "--yes", "-p", "--package"],
    value_flags: &["-p", "--package"],
    subcommands: &[],
    ignore_short_flags: true,
    reject_urls: false,
};

static DOCKER_SPEC: RuntimeSpec = RuntimeSpec {
    ignored_flags: &[
        "--rm",
        "-i",
        "-t",
        "-it",
        "--interactive",
        "--tty",
        "-v",
        "--volume",
        "--mount",
        "--name",
        "--network",
        "--detach",
        "-d",
        "-e",
        "--env",
        "-p",
        "--publish",
        "--init",
        "--pull",
    ],
    value_flags: &[
        "-v",
        "--volume",
        "--mount",
        "--name",
        "--network",
        "-e",
        "--env",
        "-p",
        "--publish",
        "--pull",
    ],
    subcommands: &["run"],
    ignore_short_flags: true,
    reject_urls: false,
};

static PYTHON_SPEC: RuntimeSpec = RuntimeSpec {
    ignored_flags: &["-m", "-u"],
    value_flags: &[],
    subcommands: &[],
    ignore_short_flags: true,
    reject_urls: false,
};

impl RuntimeSpec {
    /// Whether the classifier must skip `flag`.
    ///
    /// `--name=value` forms are judged by the part before `=`.
    pub fn should_ignore_flag(&self, flag: &str) -> bool {
        let name = flag.split_once('=').map(|(n, _)| n).unwrap_or(flag);
        if self.ignored_flags.contains(&name) {
            return true;
        }
        self.ignore_short_flags && is_short_flag(name)
    }

    /// Whether an ignored flag swallows the next token as its value.
    pub fn consumes_value(&self, flag: &str) -> bool {
        !flag.contains('=') && self.value_flags.contains(&flag)
    }

    /// First token in `args` that is a plain package identifier.
    ///
    /// Skips flags (and the values of value-taking runtime flags),
    /// placeholders, `git+` URLs, `.py` scripts, runtime subcommands and,
    /// where the runtime rejects them, raw `http(s)://` URLs.
    pub fn extract_package_name(&self, args: &[String]) -> Option<String> {
        let mut iter = args.iter();
        while let Some(token) = iter.next() {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if token.starts_with('-') {
                if self.consumes_value(token) {
                    iter.next();
                }
                continue;
            }
            if token.contains("${")
                || token.starts_with("git+")
                || token.ends_with(".py")
                || self.subcommands.contains(&token)
            {
                continue;
            }
            if self.reject_urls && (token.starts_with("http://") || token.starts_with("https://"))
            {
                continue;
            }
            return Some(token.to_string());
        }
        None
    }
}

fn is_short_flag(token: &str) -> bool {
    token.starts_with('-') && !token.starts_with("--") && token.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    #[test]
    fn test_runtime_round_trips_through_str() {
        for runtime in Runtime::all() {
            assert_eq!(runtime.as_str().parse::<Runtime>().unwrap(), runtime);
        }
        assert_eq!(" UVX ".parse::<Runtime>().unwrap(), Runtime::Uvx);
        assert!("bun".parse::<Runtime>().is_err());
    }

    #[test]
    fn test_default_supported_runtimes_contains_all() {
        assert_eq!(default_supported_runtimes().len(), 4);
    }

    #[test]
    fn test_parse_runtimes_skips_blanks() {
        let runtimes = parse_runtimes("uvx, ,npx").unwrap();
        assert_eq!(
            runtimes.into_iter().collect::<Vec<_>>(),
            vec![Runtime::Npx, Runtime::Uvx]
        );
        assert!(parse_runtimes("uvx,cargo").is_err());
    }

    // =========================================================================
    // Ignored flags
    // =========================================================================

    #[test]
    fn test_docker_ignores_container_flags() {
        let spec = Runtime::Docker.spec();
        for flag in ["--rm", "-i", "-v", "--name", "--network", "--detach", "-d"] {
            assert!(spec.should_ignore_flag(flag), "{flag} should be ignored");
        }
        assert!(spec.should_ignore_flag("--network=host"));
        assert!(!spec.should_ignore_flag("--config"));
    }

    #[test]
    fn test_npx_and_python_ignore_their_flags() {
        assert!(Runtime::Npx.spec().should_ignore_flag("-y"));
        assert!(Runtime::Python.spec().should_ignore_flag("-m"));
        assert!(!Runtime::Npx.spec().should_ignore_flag("--port"));
    }

    #[test]
    fn test_short_flags_ignored_by_default() {
        assert!(Runtime::Uvx.spec().should_ignore_flag("-x"));
        assert!(!Runtime::Uvx.spec().should_ignore_flag("-"));
    }

    // =========================================================================
    // Package extraction
    // =========================================================================

    #[test]
    fn test_extract_npx_package_skips_yes_flag() {
        let spec = Runtime::Npx.spec();
        let name = spec.extract_package_name(&args(&["-y", "obsidian-mcp", "${VAULT}"]));
        assert_eq!(name.as_deref(), Some("obsidian-mcp"));
    }

    #[test]
    fn test_extract_uvx_package_skips_urls_and_git() {
        let spec = Runtime::Uvx.spec();
        let name = spec.extract_package_name(&args(&[
            "--from",
            "git+https://github.com/org/repo",
            "https://example.com/pkg",
            "mcp-server-fetch",
        ]));
        assert_eq!(name.as_deref(), Some("mcp-server-fetch"));
    }

    #[test]
    fn test_extract_docker_package_skips_run_and_env_values() {
        let spec = Runtime::Docker.spec();
        let name = spec.extract_package_name(&args(&[
            "run",
            "-i",
            "--rm",
            "-e",
            "GITHUB_TOKEN",
            "ghcr.io/github/github-mcp-server",
        ]));
        assert_eq!(name.as_deref(), Some("ghcr.io/github/github-mcp-server"));
    }

    #[test]
    fn test_extract_python_package_skips_scripts() {
        let spec = Runtime::Python.spec();
        assert_eq!(
            spec.extract_package_name(&args(&["server.py"])),
            None
        );
        assert_eq!(
            spec.extract_package_name(&args(&["-m", "mcp_server_time"]))
                .as_deref(),
            Some("mcp_server_time")
        );
    }

    #[test]
    fn test_extract_returns_none_for_placeholders_only() {
        let spec = Runtime::Npx.spec();
        assert_eq!(spec.extract_package_name(&args(&["-y", "${PKG}"])), None);
        assert_eq!(spec.extract_package_name(&[]), None);
    }
}
