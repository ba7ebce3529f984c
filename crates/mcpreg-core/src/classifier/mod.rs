//! Argument classification
//!
//! Recovers typed [`ArgumentMetadata`] from an installation's command line and
//! environment, given the argument schema a registry declares for the server.
//!
//! ## Rules
//!
//! - `env` entries become `environment` arguments keyed by the variable name.
//! - `--flag=value` and `--flag value` become `argument` (value flags).
//! - `--flag` followed by another flag (or nothing) becomes `argument_bool`.
//! - A bare `${NAME}` whose `NAME` is declared becomes a positional argument,
//!   numbered from 1 in order of appearance.
//! - Runtime flags (see [`RuntimeSpec::should_ignore_flag`]) and bare literal
//!   tokens such as package names are skipped.
//!
//! Schema attributes (description, required, example) are attached whenever a
//! placeholder in the value, or the name itself, refers to a declared entry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::packages::{ArgumentMetadata, Arguments, VariableType};
use crate::runtime::{Runtime, RuntimeSpec};

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").ok());

static BARE_PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\$\{(\w+)\}$").ok());

/// Registry-declared metadata for one named argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaArgument {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, deserialize_with = "deserialize_example")]
    pub example: String,
}

/// Declared arguments of a server, keyed by placeholder name.
pub type ArgumentSchema = BTreeMap<String, SchemaArgument>;

/// Environment of an installation.
pub type Env = BTreeMap<String, String>;

fn deserialize_example<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Names of every placeholder in `value`, in order.
pub fn placeholders(value: &str) -> Vec<String> {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(value).map(|c| c[1].to_string()).collect()
}

/// Name of the placeholder when `value` is exactly `${NAME}`.
pub fn bare_placeholder(value: &str) -> Option<String> {
    BARE_PLACEHOLDER
        .as_ref()?
        .captures(value.trim())
        .map(|c| c[1].to_string())
}

fn apply_schema(arg: &mut ArgumentMetadata, entry: &SchemaArgument) {
    arg.description = entry.description.clone();
    arg.required = entry.required;
    arg.example = entry.example.clone();
}

/// First declared placeholder in `value`.
fn schema_entry_for_value<'s>(
    value: &str,
    schema: &'s ArgumentSchema,
) -> Option<&'s SchemaArgument> {
    placeholders(value)
        .into_iter()
        .find_map(|name| schema.get(&name))
}

/// Schema entry for a flag looked up by its own name, with or without dashes.
fn schema_entry_for_flag<'s>(flag: &str, schema: &'s ArgumentSchema) -> Option<&'s SchemaArgument> {
    schema
        .get(flag)
        .or_else(|| schema.get(flag.trim_start_matches('-')))
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-') && token.len() > 1
}

/// Classify one installation's `args` and `env` against `schema`.
pub fn classify(runtime: Runtime, args: &[String], env: &Env, schema: &ArgumentSchema) -> Arguments {
    let mut result = Arguments::new();
    classify_env(env, schema, &mut result);
    classify_args(runtime.spec(), args, schema, &mut result);
    result
}

fn classify_env(env: &Env, schema: &ArgumentSchema, result: &mut Arguments) {
    for (name, value) in env {
        let mut arg = ArgumentMetadata::new(name.clone(), VariableType::Environment);
        if let Some(entry) = schema_entry_for_value(value, schema) {
            apply_schema(&mut arg, entry);
        }
        if let Some(entry) = schema.get(name) {
            apply_schema(&mut arg, entry);
        }
        result.insert(arg);
    }
}

fn classify_args(spec: &RuntimeSpec, args: &[String], schema: &ArgumentSchema, result: &mut Arguments) {
    let mut position = 0;
    let mut i = 0;

    while i < args.len() {
        let token = args[i].trim();
        i += 1;

        if token.is_empty() {
            continue;
        }

        if is_flag(token) && spec.should_ignore_flag(token) {
            if spec.consumes_value(token) {
                i += 1;
            }
            continue;
        }

        if token.starts_with("--") {
            if let Some((flag, value)) = token.split_once('=') {
                result.insert(flag_argument(flag, Some(value), VariableType::Argument, schema));
                continue;
            }

            match args.get(i).map(|s| s.trim()) {
                Some(next) if !is_flag(next) => {
                    result.insert(flag_argument(token, Some(next), VariableType::Argument, schema));
                    i += 1;
                }
                _ => {
                    result.insert(flag_argument(token, None, VariableType::ArgumentBool, schema));
                }
            }
            continue;
        }

        if is_flag(token) {
            result.insert(flag_argument(token, None, VariableType::ArgumentBool, schema));
            continue;
        }

        if let Some(name) = bare_placeholder(token)
            && let Some(entry) = schema.get(&name)
        {
            // Positions advance only on insert so they stay contiguous.
            let mut arg = ArgumentMetadata::positional(name, position + 1);
            apply_schema(&mut arg, entry);
            if result.insert(arg) {
                position += 1;
            }
        }
    }
}

fn flag_argument(
    flag: &str,
    value: Option<&str>,
    variable_type: VariableType,
    schema: &ArgumentSchema,
) -> ArgumentMetadata {
    let mut arg = ArgumentMetadata::new(flag, variable_type);
    let entry = value
        .and_then(|v| schema_entry_for_value(v, schema))
        .or_else(|| schema_entry_for_flag(flag, schema));
    if let Some(entry) = entry {
        apply_schema(&mut arg, entry);
    }
    arg
}

/// Fold `discovered` into `target`; names already present are kept.
///
/// Newly seen positional arguments are numbered after the positionals already
/// in `target` so positions stay contiguous across installations.
pub fn merge_arguments(target: &mut Arguments, discovered: Arguments) {
    for mut arg in discovered.iter().cloned() {
        if target.contains(&arg.name) {
            continue;
        }
        if arg.position.is_some() {
            arg.position = Some(target.max_position() + 1);
        }
        target.insert(arg);
    }
}

/// One installation's raw command line, as seen by the classifier.
#[derive(Debug, Clone, Copy)]
pub struct InstallationArgs<'a> {
    /// Runtime resolved from the installation, `None` when unrecognised.
    pub runtime: Option<Runtime>,
    pub args: &'a [String],
    pub env: &'a Env,
}

/// Classify every installation and merge the results, first observation wins.
///
/// Installations with a runtime outside `supported` are skipped.
pub fn classify_installations<'a, I>(
    installations: I,
    supported: &BTreeSet<Runtime>,
    schema: &ArgumentSchema,
) -> Arguments
where
    I: IntoIterator<Item = InstallationArgs<'a>>,
{
    let mut merged = Arguments::new();
    for install in installations {
        let Some(runtime) = install.runtime.filter(|r| supported.contains(r)) else {
            continue;
        };
        merge_arguments(&mut merged, classify(runtime, install.args, install.env, schema));
    }
    merged
}
