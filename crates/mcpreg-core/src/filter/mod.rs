//! Generic filter algebra
//!
//! Filters are `key -> value` string pairs. Each key is bound to a
//! [`Matcher`] built from one of the predicate constructors below and a value
//! provider that reads a field from the record. All comparisons are made on
//! normalised (trimmed, lowercased) strings.
//!
//! | Predicate       | Semantics |
//! |-----------------|-----------|
//! | [`equals`]      | normalised equality |
//! | [`equals_bool`] | filter parsed as a boolean |
//! | [`partial`]     | filter is a substring of the field |
//! | [`equals_any`]  | filter is a substring of at least one field |
//! | [`has_any`]     | field list intersects the comma separated filter list |
//! | [`has_all`]     | field list is a superset of the filter list |
//! | [`has_only`]    | field list is a subset of the filter list |
//! | [`partial_all`] | every filter needle is a substring of some field item |

mod defaults;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::error::{RegistryError, Result};

pub use defaults::{argument_match_options, server_match_options};

/// Canonical filter key spellings.
pub mod keys {
    pub const NAME: &str = "name";
    pub const RUNTIME: &str = "runtime";
    pub const TOOLS: &str = "tools";
    pub const TAGS: &str = "tags";
    pub const CATEGORIES: &str = "categories";
    pub const VERSION: &str = "version";
    pub const LICENSE: &str = "license";
    pub const SOURCE: &str = "source";
    pub const IS_OFFICIAL: &str = "isOfficial";
    pub const DEPRECATED: &str = "deprecated";
    pub const TYPE: &str = "type";
    pub const REQUIRED: &str = "required";
}

/// Filter values keyed by filter name.
pub type Filters = BTreeMap<String, String>;

pub type StringValueProvider<T> = fn(&T) -> String;
pub type StringValuesProvider<T> = fn(&T) -> Vec<String>;
pub type BoolValueProvider<T> = fn(&T) -> bool;

/// Decides whether `item` satisfies one filter value.
pub type Matcher<T> = Arc<dyn Fn(&T, &str) -> Result<bool> + Send + Sync>;

/// Receives the key of an unsupported filter before the match is rejected.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Trim and lowercase.
pub fn normalize_string(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn normalize_slice<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|v| normalize_string(v.as_ref())).collect()
}

/// Split a comma separated filter value into normalised, non-empty parts.
pub fn split_filter_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(normalize_string)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Serde helper that normalises a string field while decoding.
pub fn deserialize_normalized<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_string(&raw))
}

fn matcher<T, F>(f: F) -> Matcher<T>
where
    F: Fn(&T, &str) -> Result<bool> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn equals<T: 'static>(provider: StringValueProvider<T>) -> Matcher<T> {
    matcher(move |item, value| Ok(normalize_string(&provider(item)) == normalize_string(value)))
}

pub fn equals_bool<T: 'static>(provider: BoolValueProvider<T>) -> Matcher<T> {
    matcher(move |item, value| {
        let wanted = parse_bool(value)?;
        Ok(provider(item) == wanted)
    })
}

pub fn partial<T: 'static>(provider: StringValueProvider<T>) -> Matcher<T> {
    matcher(move |item, value| {
        Ok(normalize_string(&provider(item)).contains(&normalize_string(value)))
    })
}

pub fn equals_any<T: 'static>(providers: Vec<StringValueProvider<T>>) -> Matcher<T> {
    matcher(move |item, value| {
        let needle = normalize_string(value);
        Ok(providers
            .iter()
            .any(|p| normalize_string(&p(item)).contains(&needle)))
    })
}

pub fn has_any<T: 'static>(provider: StringValuesProvider<T>) -> Matcher<T> {
    matcher(move |item, value| {
        let have: HashSet<String> = normalize_slice(&provider(item)).into_iter().collect();
        Ok(split_filter_list(value).iter().any(|v| have.contains(v)))
    })
}

pub fn has_all<T: 'static>(provider: StringValuesProvider<T>) -> Matcher<T> {
    matcher(move |item, value| {
        let have: HashSet<String> = normalize_slice(&provider(item)).into_iter().collect();
        Ok(split_filter_list(value).iter().all(|v| have.contains(v)))
    })
}

pub fn has_only<T: 'static>(provider: StringValuesProvider<T>) -> Matcher<T> {
    matcher(move |item, value| {
        let allowed: HashSet<String> = split_filter_list(value).into_iter().collect();
        Ok(normalize_slice(&provider(item))
            .iter()
            .all(|v| allowed.contains(v)))
    })
}

pub fn partial_all<T: 'static>(provider: StringValuesProvider<T>) -> Matcher<T> {
    matcher(move |item, value| {
        let have = normalize_slice(&provider(item));
        Ok(split_filter_list(value)
            .iter()
            .all(|needle| have.iter().any(|h| h.contains(needle.as_str()))))
    })
}

/// Literal `*` matches anything; other values go to `inner`.
pub fn wildcard<T: 'static>(inner: Matcher<T>) -> Matcher<T> {
    matcher(move |item, value| {
        if value.trim() == "*" {
            return Ok(true);
        }
        inner(item, value)
    })
}

fn parse_bool(value: &str) -> Result<bool> {
    match normalize_string(value).as_str() {
        "true" | "1" | "yes" | "t" => Ok(true),
        "false" | "0" | "no" | "f" => Ok(false),
        other => Err(RegistryError::invalid(format!(
            "invalid boolean filter value '{}'",
            other
        ))),
    }
}

/// Matchers, unsupported keys and the unsupported-key logger for one record type.
pub struct MatchOptions<T> {
    matchers: HashMap<String, Matcher<T>>,
    unsupported: HashSet<String>,
    log: LogFn,
}

impl<T> Clone for MatchOptions<T> {
    fn clone(&self) -> Self {
        Self {
            matchers: self.matchers.clone(),
            unsupported: self.unsupported.clone(),
            log: self.log.clone(),
        }
    }
}

impl<T> Default for MatchOptions<T> {
    fn default() -> Self {
        Self {
            matchers: HashMap::new(),
            unsupported: HashSet::new(),
            log: Arc::new(|key: &str| {
                tracing::warn!(key, "filter is not supported by this registry")
            }),
        }
    }
}

impl<T> MatchOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or override the matcher for `key`.
    pub fn with_matcher(mut self, key: &str, matcher: Matcher<T>) -> Self {
        self.matchers.insert(normalize_string(key), matcher);
        self
    }

    /// Mark `keys` as unsupported: any filter on them fails the match.
    pub fn with_unsupported<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.unsupported
            .extend(keys.into_iter().map(|k| normalize_string(k.as_ref())));
        self
    }

    pub fn with_log_fn(mut self, log: LogFn) -> Self {
        self.log = log;
        self
    }

    pub fn has_matcher(&self, key: &str) -> bool {
        self.matchers.contains_key(&normalize_string(key))
    }
}

/// Check `item` against every filter.
///
/// Empty keys and keys without a matcher are skipped. An unsupported key is
/// logged and rejects the item. `None` filters match everything.
pub fn match_item<T>(item: &T, filters: Option<&Filters>, options: &MatchOptions<T>) -> Result<bool> {
    let Some(filters) = filters else {
        return Ok(true);
    };

    for (key, value) in filters {
        let key = normalize_string(key);
        if key.is_empty() {
            continue;
        }
        if options.unsupported.contains(&key) {
            (options.log)(&key);
            return Ok(false);
        }
        let Some(matcher) = options.matchers.get(&key) else {
            continue;
        };
        if !matcher(item, value)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Copy `filters`, add `name` when absent, then let `mutate` adjust the copy.
pub fn prepare_filters(
    filters: Option<&Filters>,
    name: &str,
    mutate: Option<&dyn Fn(&mut Filters)>,
) -> Filters {
    let mut prepared = filters.cloned().unwrap_or_default();
    prepared
        .entry(keys::NAME.to_string())
        .or_insert_with(|| normalize_string(name));
    if let Some(mutate) = mutate {
        mutate(&mut prepared);
    }
    prepared
}

/// Validate `requested` against `available`.
///
/// Empty `requested` selects all of `available`.
pub fn match_requested_slice<S: AsRef<str>>(requested: &[S], available: &[S]) -> Result<Vec<String>> {
    let available = normalize_slice(available);
    if requested.is_empty() {
        return Ok(available);
    }

    let (found, missing): (Vec<String>, Vec<String>) = normalize_slice(requested)
        .into_iter()
        .filter(|v| !v.is_empty())
        .partition(|v| available.contains(v));

    if found.is_empty() {
        return Err(RegistryError::NoRequestedValues);
    }
    if !missing.is_empty() {
        return Err(RegistryError::MissingValues(missing));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Item {
        name: String,
        tags: Vec<String>,
        official: bool,
    }

    fn item() -> Item {
        Item {
            name: "Filesystem Server".to_string(),
            tags: vec!["Files".to_string(), "local-io".to_string()],
            official: true,
        }
    }

    fn name_of(i: &Item) -> String {
        i.name.clone()
    }

    fn tags_of(i: &Item) -> Vec<String> {
        i.tags.clone()
    }

    fn filters(pairs: &[(&str, &str)]) -> Filters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // =========================================================================
    // Normalisation
    // =========================================================================

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["  MiXeD ", "plain", "", "\tTabs\n"] {
            let once = normalize_string(raw);
            assert_eq!(normalize_string(&once), once);
        }
        assert_eq!(normalize_string("  MiXeD "), "mixed");
    }

    #[test]
    fn test_split_filter_list_drops_blanks() {
        assert_eq!(split_filter_list(" A, ,b ,"), vec!["a", "b"]);
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    #[test]
    fn test_equals_and_partial() {
        let i = item();
        assert!(equals(name_of)(&i, " filesystem server ").unwrap());
        assert!(!equals(name_of)(&i, "filesystem").unwrap());
        assert!(partial(name_of)(&i, "SYSTEM").unwrap());
    }

    #[test]
    fn test_equals_bool_parses_value() {
        let official: Matcher<Item> = equals_bool(|i: &Item| i.official);
        assert!(official(&item(), "true").unwrap());
        assert!(!official(&item(), "false").unwrap());
        assert!(official(&item(), "maybe").is_err());
    }

    #[test]
    fn test_equals_any_checks_each_provider() {
        let other: StringValueProvider<Item> = |_| "other".to_string();
        let m: Matcher<Item> = equals_any(vec![other, name_of]);
        assert!(m(&item(), "files").unwrap());
        assert!(!m(&item(), "nothing").unwrap());
    }

    #[test]
    fn test_set_predicates() {
        let i = item();
        assert!(has_any(tags_of)(&i, "nope,files").unwrap());
        assert!(!has_any(tags_of)(&i, "nope").unwrap());

        assert!(has_all(tags_of)(&i, "files,LOCAL-IO").unwrap());
        assert!(!has_all(tags_of)(&i, "files,remote").unwrap());

        assert!(has_only(tags_of)(&i, "files,local-io,extra").unwrap());
        assert!(!has_only(tags_of)(&i, "files").unwrap());

        assert!(partial_all(tags_of)(&i, "fil,io").unwrap());
        assert!(!partial_all(tags_of)(&i, "fil,net").unwrap());
    }

    #[test]
    fn test_wildcard_matches_anything() {
        let m = wildcard(equals(name_of));
        assert!(m(&item(), "*").unwrap());
        assert!(!m(&item(), "other").unwrap());
    }

    // =========================================================================
    // match_item
    // =========================================================================

    #[test]
    fn test_match_none_filters_matches() {
        let options = MatchOptions::<Item>::new();
        assert!(match_item(&item(), None, &options).unwrap());
    }

    #[test]
    fn test_match_skips_unknown_and_empty_keys() {
        let options = MatchOptions::new().with_matcher("name", partial(name_of));
        let f = filters(&[("colour", "blue"), ("  ", "x"), ("NAME", "file")]);
        assert!(match_item(&item(), Some(&f), &options).unwrap());
    }

    #[test]
    fn test_match_fails_on_first_rejecting_matcher() {
        let options = MatchOptions::new()
            .with_matcher("name", partial(name_of))
            .with_matcher("tags", has_all(tags_of));
        let f = filters(&[("name", "file"), ("tags", "remote")]);
        assert!(!match_item(&item(), Some(&f), &options).unwrap());
    }

    #[test]
    fn test_match_unsupported_key_logs_and_rejects() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = MatchOptions::new()
            .with_matcher("version", partial(name_of))
            .with_unsupported(["Version"])
            .with_log_fn(Arc::new(move |key: &str| {
                sink.lock().unwrap().push(key.to_string())
            }));

        let f = filters(&[("version", "1.0")]);
        assert!(!match_item(&item(), Some(&f), &options).unwrap());
        assert_eq!(*seen.lock().unwrap(), vec!["version".to_string()]);
    }

    // =========================================================================
    // prepare_filters / match_requested_slice
    // =========================================================================

    #[test]
    fn test_prepare_filters_injects_name_without_mutating_input() {
        let original = filters(&[("runtime", "uvx")]);
        let prepared = prepare_filters(Some(&original), "  Time ", None);
        assert_eq!(prepared.get("name").map(String::as_str), Some("time"));
        assert!(!original.contains_key("name"));
    }

    #[test]
    fn test_prepare_filters_preserves_existing_name_and_runs_mutator() {
        let original = filters(&[("name", "*"), ("version", "1.0")]);
        let strip: &dyn Fn(&mut Filters) = &|f| {
            f.remove("version");
        };
        let prepared = prepare_filters(Some(&original), "time", Some(strip));
        assert_eq!(prepared.get("name").map(String::as_str), Some("*"));
        assert!(!prepared.contains_key("version"));
        assert!(original.contains_key("version"));
    }

    #[test]
    fn test_match_requested_slice() {
        let available = ["Read", "write", "delete"];
        assert_eq!(
            match_requested_slice(&[], &available).unwrap(),
            vec!["read", "write", "delete"]
        );
        assert_eq!(
            match_requested_slice(&[" WRITE "], &available).unwrap(),
            vec!["write"]
        );
        assert_eq!(
            match_requested_slice(&["write", "x", "y"], &available).unwrap_err(),
            RegistryError::MissingValues(vec!["x".into(), "y".into()])
        );
        assert_eq!(
            match_requested_slice(&["x"], &available).unwrap_err(),
            RegistryError::NoRequestedValues
        );
    }
}
