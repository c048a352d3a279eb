//! The configuration boundary: `ParameterList`, the already-tokenised
//! `label`/`type`/parameter bag every `@block`-derived object is built
//! from. No text grammar is parsed here — that is a collaborator's
//! concern; this crate consumes already-validated parameter lists.

use fsc_error::{FscResult, fsc_err};
use std::str::FromStr;

/// One `@block`'s worth of already-tokenised `key value` pairs, addressed
/// by a dotted block label (e.g. `selectivity[FishingSel]`).
#[derive(Clone, Debug, Default)]
pub struct ParameterList {
    label: String,
    entries: Vec<(String, String)>,
}

impl ParameterList {
    pub fn new(label: impl Into<String>) -> Self {
        ParameterList {
            label: label.into(),
            entries: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    fn require(&self, key: &str) -> FscResult<&str> {
        self.get(key)
            .ok_or_else(|| fsc_err!(Verify: "block '{}' is missing required parameter '{}'", self.label, key))
    }

    pub fn get_str(&self, key: &str) -> FscResult<&str> {
        self.require(key)
    }

    pub fn get_f64(&self, key: &str) -> FscResult<f64> {
        self.require(key)?
            .parse()
            .map_err(|_| fsc_err!(Verify: "block '{}' parameter '{}' is not a valid number", self.label, key))
    }

    pub fn get_f32(&self, key: &str) -> FscResult<f32> {
        self.require(key)?
            .parse()
            .map_err(|_| fsc_err!(Verify: "block '{}' parameter '{}' is not a valid number", self.label, key))
    }

    pub fn get_usize(&self, key: &str) -> FscResult<usize> {
        self.require(key)?
            .parse()
            .map_err(|_| fsc_err!(Verify: "block '{}' parameter '{}' is not a valid non-negative integer", self.label, key))
    }

    pub fn get_bool(&self, key: &str) -> FscResult<bool> {
        match self.require(key)? {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(fsc_err!(Verify: "block '{}' parameter '{}' is not a valid boolean: '{}'", self.label, key, other)),
        }
    }

    /// Parses a space-separated run of values into `T` via `FromStr`
    /// (e.g. `@estimate` phase lists, `@all_values` breakpoints).
    pub fn get_vec_f64(&self, key: &str) -> FscResult<Vec<f64>> {
        self.require(key)?
            .split_whitespace()
            .map(|tok| {
                tok.parse()
                    .map_err(|_| fsc_err!(Verify: "block '{}' parameter '{}' has a non-numeric token '{}'", self.label, key, tok))
            })
            .collect()
    }

    /// Parses a parameter via a `FromStr`-implementing enum (`get_enum`),
    /// e.g. a selectivity kind or growth-curve kind tag.
    pub fn get_enum<T: FromStr>(&self, key: &str) -> FscResult<T> {
        self.require(key)?
            .parse()
            .map_err(|_| fsc_err!(Verify: "block '{}' parameter '{}' is not a recognised value", self.label, key))
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }
}
