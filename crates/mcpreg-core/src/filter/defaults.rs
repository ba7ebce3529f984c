//! Default matchers for servers and arguments.

use super::{
    MatchOptions, equals, equals_any, equals_bool, has_all, has_any, keys, partial, partial_all,
    wildcard,
};
use crate::packages::{ArgumentMetadata, Server};

/// Matchers every registry applies to servers. Adapters extend or override these.
///
/// `name` accepts `*` or a substring of the name, display name or ID.
pub fn server_match_options() -> MatchOptions<Server> {
    MatchOptions::new()
        .with_matcher(
            keys::NAME,
            wildcard(equals_any(vec![server_name, server_display_name, server_id])),
        )
        .with_matcher(keys::RUNTIME, has_any(|s: &Server| s.runtime_names()))
        .with_matcher(keys::TOOLS, has_all(|s: &Server| s.tool_names()))
        .with_matcher(keys::TAGS, partial_all(|s: &Server| s.tags.clone()))
        .with_matcher(keys::CATEGORIES, partial_all(|s: &Server| s.categories.clone()))
        .with_matcher(keys::VERSION, has_any(|s: &Server| s.installations.versions()))
        .with_matcher(keys::LICENSE, partial(|s: &Server| s.license.clone()))
        .with_matcher(keys::SOURCE, equals(|s: &Server| s.source.clone()))
        .with_matcher(keys::IS_OFFICIAL, equals_bool(|s: &Server| s.is_official))
}

fn server_name(s: &Server) -> String {
    s.name.clone()
}

fn server_display_name(s: &Server) -> String {
    s.display_name.clone()
}

fn server_id(s: &Server) -> String {
    s.id.clone()
}

/// Matchers for filtering a server's arguments with the same algebra.
pub fn argument_match_options() -> MatchOptions<ArgumentMetadata> {
    MatchOptions::new()
        .with_matcher(keys::NAME, wildcard(equals(|a: &ArgumentMetadata| a.name.clone())))
        .with_matcher(
            keys::TYPE,
            equals(|a: &ArgumentMetadata| a.variable_type.as_str().to_string()),
        )
        .with_matcher(keys::REQUIRED, equals_bool(|a: &ArgumentMetadata| a.required))
}
