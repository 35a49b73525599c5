//! Environment placeholder substitution.
//!
//! String values of the exact form `__NAME__` are replaced with the value of
//! the environment variable `NAME`, or with the empty string when it is unset.
//! `__MSG_*__` strings are browser localization placeholders and pass through.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Prefix reserved for `chrome.i18n` message placeholders.
const RESERVED_PREFIX: &str = "MSG_";

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"^__([^_].*)__$").expect("invalid placeholder pattern"))
}

/// Source of variable values for substitution.
pub trait EnvSource {
    /// Returns the value of `name`, or `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads variables from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Returns the variable name if `value` is a whole-string env placeholder.
pub fn placeholder_name(value: &str) -> Option<&str> {
    let name = placeholder_regex().captures(value)?.get(1)?.as_str();
    if name.starts_with(RESERVED_PREFIX) {
        None
    } else {
        Some(name)
    }
}

/// Substitutes placeholders from the process environment.
pub fn substitute_env(node: &Value) -> Value {
    substitute_env_with(node, &ProcessEnv)
}

/// Substitutes placeholders using `env`.
pub fn substitute_env_with<E: EnvSource + ?Sized>(node: &Value, env: &E) -> Value {
    match node {
        Value::String(s) => match placeholder_name(s) {
            Some(name) => Value::String(env.var(name).unwrap_or_default()),
            None => Value::String(s.clone()),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_env_with(item, env))
                .collect(),
        ),
        Value::Object(map) => {
            let substituted: Map<String, Value> = map
                .iter()
                .map(|(key, value)| (key.clone(), substitute_env_with(value, env)))
                .collect();
            Value::Object(substituted)
        }
        scalar => scalar.clone(),
    }
}
