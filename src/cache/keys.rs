//! Cache key derivation.
//!
//! Keys are laid out as `{prefix}:{kind}:{namespace}:...` so every namespace of
//! a record kind can be addressed by prefix. Parameterised namespaces hash a
//! canonical JSON rendering of their parameters, which makes the key
//! independent of the order in which the parameters were assembled.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::types::RecordKind;

use super::store::CacheError;

/// Cached result families, each with its own key segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Detail,
    List,
    Search,
    Version,
    Updates,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Detail => "detail",
            Namespace::List => "list",
            Namespace::Search => "search",
            Namespace::Version => "version",
            Namespace::Updates => "updates",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    prefix: String,
}

impl CacheKeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn detail(&self, kind: RecordKind, id: &str) -> String {
        format!("{}:{kind}:detail:{id}", self.prefix)
    }

    pub fn version(&self, kind: RecordKind) -> String {
        format!("{}:{kind}:version", self.prefix)
    }

    /// Key holding the current generation tag of a kind's collection entries.
    pub fn generation(&self, kind: RecordKind) -> String {
        format!("{}:{kind}:generation", self.prefix)
    }

    /// Prefix shared by every key of `namespace` for `kind`.
    pub fn namespace_prefix(&self, kind: RecordKind, namespace: Namespace) -> String {
        format!("{}:{kind}:{}:", self.prefix, namespace.as_str())
    }

    /// Derive the key for a parameterised result.
    pub fn build_key<P>(
        &self,
        kind: RecordKind,
        namespace: Namespace,
        params: &P,
    ) -> Result<String, CacheError>
    where
        P: Serialize + ?Sized,
    {
        self.build_tagged_key(kind, namespace, params, None)
    }

    /// Like [`build_key`](Self::build_key), embedding a generation tag so that
    /// rotating the tag orphans every previously written entry.
    pub fn build_tagged_key<P>(
        &self,
        kind: RecordKind,
        namespace: Namespace,
        params: &P,
        generation: Option<&str>,
    ) -> Result<String, CacheError>
    where
        P: Serialize + ?Sized,
    {
        let value = serde_json::to_value(params).map_err(CacheError::serialization)?;
        let digest = params_digest(&value);
        let mut key = self.namespace_prefix(kind, namespace);
        if let Some(generation) = generation {
            key.push_str(generation);
            key.push(':');
        }
        key.push_str(&digest);
        Ok(key)
    }
}

/// SHA-256 of the canonical rendering, hex encoded.
pub fn params_digest(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            out.push('{');
            for (index, (key, item)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(text) => write_string(text, out),
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

fn write_string(text: &str, out: &mut String) {
    // Displaying a `Value::String` yields its escaped JSON form.
    let _ = write!(out, "{}", Value::String(text.to_string()));
}
