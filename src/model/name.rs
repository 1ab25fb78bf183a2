use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

const MAX_NAME_LENGTH: usize = 214;

/// Validated package name, plain (`pedding`) or scoped (`@scope/pedding`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_scoped(&self) -> bool {
        self.0.starts_with('@')
    }

    /// The scope without its `@`, for scoped names.
    pub fn scope(&self) -> Option<&str> {
        if !self.is_scoped() {
            return None;
        }
        self.0[1..].split('/').next()
    }

    /// The name without its scope.
    pub fn bare_name(&self) -> &str {
        match self.0.split_once('/') {
            Some((_, bare)) => bare,
            None => &self.0,
        }
    }

    /// Path segment used when addressing the upstream registry.
    ///
    /// Scoped names keep the `@` and encode the separator: `@scope%2fname`.
    pub fn url_path(&self) -> String {
        self.0.replacen('/', "%2f", 1)
    }
}

/// Shorthand used by the scheduler before a name has been validated.
pub fn is_scoped(name: &str) -> bool {
    name.starts_with('@')
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PackageName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RegistryError::InvalidName {
            name: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("name is empty"));
        }
        if s.len() > MAX_NAME_LENGTH {
            return Err(invalid("name is longer than 214 characters"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(invalid("name contains whitespace"));
        }

        let bare = match s.strip_prefix('@') {
            Some(rest) => {
                let parts: Vec<&str> = rest.split('/').collect();
                if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
                    return Err(invalid("scoped names must look like @scope/name"));
                }
                parts[1]
            }
            None => {
                if s.contains('/') {
                    return Err(invalid("unscoped names cannot contain '/'"));
                }
                s
            }
        };

        if bare.starts_with('.') || bare.starts_with('_') {
            return Err(invalid("name cannot start with '.' or '_'"));
        }

        Ok(PackageName(s.to_string()))
    }
}
