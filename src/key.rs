//! Cache key derivation.
//!
//! Keys look like `{counter}_{sha256 hex}`. The digest covers the counter id,
//! the report discriminator, the period and every parameter in key order, each
//! field length-prefixed so no two distinct inputs share an encoding. The OAuth
//! token never takes part.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::period::Period;
use crate::report::ReportKind;

/// Cache entry identifier, safe for file names and key-value stores
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a cached response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    Report(ReportKind),
    /// Arbitrary query; identified by a digest of its own parameters
    Raw,
}

pub fn derive_key<V: fmt::Display>(
    counter_id: &str,
    discriminator: &Discriminator,
    period: Option<&Period>,
    parameters: &BTreeMap<String, V>,
) -> CacheKey {
    let label = match discriminator {
        Discriminator::Report(kind) => kind.as_str().to_string(),
        Discriminator::Raw => format!("raw:{}", parameters_digest(parameters)),
    };

    let mut hasher = Sha256::new();
    feed(&mut hasher, counter_id);
    feed(&mut hasher, &label);
    match period {
        Some(period) => {
            feed(&mut hasher, &period.date1());
            feed(&mut hasher, &period.date2());
        }
        None => feed(&mut hasher, ""),
    }
    feed_parameters(&mut hasher, parameters);

    CacheKey(format!(
        "{}_{:x}",
        sanitize_prefix(counter_id),
        hasher.finalize()
    ))
}

fn parameters_digest<V: fmt::Display>(parameters: &BTreeMap<String, V>) -> String {
    let mut hasher = Sha256::new();
    feed_parameters(&mut hasher, parameters);
    format!("{:x}", hasher.finalize())
}

fn feed_parameters<V: fmt::Display>(hasher: &mut Sha256, parameters: &BTreeMap<String, V>) {
    hasher.update((parameters.len() as u64).to_le_bytes());
    for (name, value) in parameters {
        feed(hasher, name);
        feed(hasher, &value.to_string());
    }
}

fn feed(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

fn sanitize_prefix(counter_id: &str) -> String {
    let prefix: String = counter_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect();

    if prefix.is_empty() {
        "counter".to_string()
    } else {
        prefix
    }
}

/// Characters a derived key may contain
pub fn is_key_safe(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
