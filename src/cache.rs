//! Conditional-request support for the read path.
//!
//! A document's validator depends only on its name and `time.modified`.
//! Mutations that move `time.modified` (publish, tag, sync) change it;
//! mutations that leave it alone (star, unstar) do not.

use std::fmt;

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use crate::model::PackageDocument;

/// Opaque cache token, rendered as a quoted entity tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Validator(String);

impl Validator {
    /// The token without quotes.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an `If-None-Match` entry refers to this validator. Weak
    /// (`W/`) prefixes and missing quotes are tolerated.
    fn matches_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        let tag = tag
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(tag);
        tag == self.0
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// Conditional headers of a read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalRequest {
    pub if_none_match: Option<String>,
}

impl ConditionalRequest {
    pub fn if_none_match(value: impl Into<String>) -> Self {
        Self {
            if_none_match: Some(value.into()),
        }
    }

    fn is_satisfied_by(&self, validator: &Validator) -> bool {
        let Some(header) = self.if_none_match.as_deref() else {
            return false;
        };
        header
            .split(',')
            .any(|tag| tag.trim() == "*" || validator.matches_tag(tag))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome<'a> {
    /// The caller's copy is current; answer without a body.
    NotModified(Validator),
    /// Send the document along with its validator.
    Full {
        document: &'a PackageDocument,
        validator: Validator,
    },
}

impl CacheOutcome<'_> {
    pub fn validator(&self) -> &Validator {
        match self {
            CacheOutcome::NotModified(validator) => validator,
            CacheOutcome::Full { validator, .. } => validator,
        }
    }
}

pub fn validator_for(document: &PackageDocument) -> Validator {
    let modified = document
        .modified()
        .to_rfc3339_opts(SecondsFormat::Nanos, true);

    let mut hasher = Sha256::new();
    hasher.update(document.name().as_bytes());
    hasher.update([0u8]);
    hasher.update(modified.as_bytes());
    Validator(format!("{:x}", hasher.finalize()))
}

pub fn evaluate<'a>(request: &ConditionalRequest, document: &'a PackageDocument) -> CacheOutcome<'a> {
    let validator = validator_for(document);
    if request.is_satisfied_by(&validator) {
        CacheOutcome::NotModified(validator)
    } else {
        CacheOutcome::Full {
            document,
            validator,
        }
    }
}
