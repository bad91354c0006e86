//! Environment variable parsing shared by the server and the chat client
//!
//! Every `from_env` constructor in this crate goes through a lookup function
//! so configuration can be tested without touching the process environment.

use std::str::FromStr;
use thiserror::Error;

/// Error for an environment variable that is set but unusable
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    pub var: String,
    pub value: String,
    pub reason: String,
}

impl ConfigError {
    fn new(var: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            var: var.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Lookup function over environment variables
pub trait Lookup: Fn(&str) -> Option<String> {}
impl<F: Fn(&str) -> Option<String>> Lookup for F {}

/// Lookup backed by the process environment
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Read a variable, treating empty values as unset
pub fn string(lookup: &impl Lookup, var: &str) -> Option<String> {
    lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a numeric (or any `FromStr`) variable
pub fn parsed<T>(lookup: &impl Lookup, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match string(lookup, var) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::new(var, &value, e.to_string())),
    }
}

/// Parse a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`)
pub fn flag(lookup: &impl Lookup, var: &str) -> Result<Option<bool>, ConfigError> {
    match string(lookup, var) {
        None => Ok(None),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::new(var, &value, "expected a boolean")),
        },
    }
}

/// Parse an optional limit where `none`/`off` disables it
pub fn limit(lookup: &impl Lookup, var: &str) -> Result<Option<Option<u64>>, ConfigError> {
    match string(lookup, var) {
        None => Ok(None),
        Some(value) if matches!(value.to_ascii_lowercase().as_str(), "none" | "off") => {
            Ok(Some(None))
        }
        Some(value) => value
            .parse()
            .map(|n| Some(Some(n)))
            .map_err(|e: std::num::ParseIntError| ConfigError::new(var, &value, e.to_string())),
    }
}

#[cfg(test)]
pub(crate) fn lookup_from(pairs: &[(&str, &str)]) -> impl Lookup {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name: &str| {
        owned
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }
}
