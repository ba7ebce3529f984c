//! Argument metadata recovered from installation command lines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an argument reaches the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    /// Environment variable.
    Environment,
    /// Value flag, e.g. `--port 8080` or `--port=8080`.
    Argument,
    /// Boolean flag, e.g. `--verbose`.
    ArgumentBool,
    /// Bare positional value.
    PositionalArgument,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::Environment => "environment",
            VariableType::Argument => "argument",
            VariableType::ArgumentBool => "argument_bool",
            VariableType::PositionalArgument => "positional_argument",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed description of one server argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub example: String,
    pub variable_type: VariableType,
    /// 1-based; set only for positional arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl ArgumentMetadata {
    pub fn new(name: impl Into<String>, variable_type: VariableType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: false,
            example: String::new(),
            variable_type,
            position: None,
        }
    }

    pub fn positional(name: impl Into<String>, position: usize) -> Self {
        Self {
            position: Some(position),
            ..Self::new(name, VariableType::PositionalArgument)
        }
    }
}

/// Predicate over argument metadata, used with [`Arguments::filter_by`].
pub type ArgumentPredicate = fn(&ArgumentMetadata) -> bool;

pub fn is_required(arg: &ArgumentMetadata) -> bool {
    arg.required
}

pub fn is_env(arg: &ArgumentMetadata) -> bool {
    arg.variable_type == VariableType::Environment
}

pub fn is_value_flag(arg: &ArgumentMetadata) -> bool {
    arg.variable_type == VariableType::Argument
}

pub fn is_bool_flag(arg: &ArgumentMetadata) -> bool {
    arg.variable_type == VariableType::ArgumentBool
}

pub fn is_positional(arg: &ArgumentMetadata) -> bool {
    arg.variable_type == VariableType::PositionalArgument
}

pub fn is_flag(arg: &ArgumentMetadata) -> bool {
    is_value_flag(arg) || is_bool_flag(arg)
}

/// Arguments of a server keyed by name, kept in insertion order.
///
/// Names are unique; the first insertion of a name wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Vec<ArgumentMetadata>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `arg` unless its name is already present. Returns whether it was added.
    pub fn insert(&mut self, arg: ArgumentMetadata) -> bool {
        if self.contains(&arg.name) {
            return false;
        }
        self.0.push(arg);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ArgumentMetadata> {
        self.0.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArgumentMetadata> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|a| a.name.clone()).collect()
    }

    /// Highest positional index present, 0 when there are none.
    pub fn max_position(&self) -> usize {
        self.0.iter().filter_map(|a| a.position).max().unwrap_or(0)
    }

    /// Entries satisfying every predicate. No predicates keeps everything.
    pub fn filter_by(&self, predicates: &[ArgumentPredicate]) -> Arguments {
        Arguments(
            self.0
                .iter()
                .filter(|a| predicates.iter().all(|p| p(a)))
                .cloned()
                .collect(),
        )
    }

    /// Positional entries by position, then the rest by case-insensitive name.
    pub fn ordered(&self) -> Vec<ArgumentMetadata> {
        let mut positional: Vec<_> = self.0.iter().filter(|a| is_positional(a)).cloned().collect();
        positional.sort_by_key(|a| a.position.unwrap_or(usize::MAX));

        let mut rest: Vec<_> = self.0.iter().filter(|a| !is_positional(a)).cloned().collect();
        rest.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });

        positional.extend(rest);
        positional
    }
}

impl FromIterator<ArgumentMetadata> for Arguments {
    fn from_iter<T: IntoIterator<Item = ArgumentMetadata>>(iter: T) -> Self {
        let mut args = Arguments::new();
        for arg in iter {
            args.insert(arg);
        }
        args
    }
}
