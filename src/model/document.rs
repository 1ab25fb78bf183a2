use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::package::{Maintainer, Package};

/// Upstream removal details, presented as `time.unpublished`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UnpublishInfo {
    /// Name of the user who removed the package.
    pub name: String,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Terminal state of a package removed upstream. Carries no versions or tags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UnpublishRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
    pub unpublished: UnpublishInfo,
}

/// What the document store holds for one package name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PackageDocument {
    Normal(Package),
    Unpublished(UnpublishRecord),
}

impl PackageDocument {
    pub fn name(&self) -> &str {
        match self {
            PackageDocument::Normal(pkg) => &pkg.name,
            PackageDocument::Unpublished(record) => &record.name,
        }
    }

    /// The value the response validator is derived from.
    pub fn modified(&self) -> DateTime<Utc> {
        match self {
            PackageDocument::Normal(pkg) => pkg.time.modified,
            PackageDocument::Unpublished(record) => record.modified,
        }
    }

    pub fn as_package(&self) -> Option<&Package> {
        match self {
            PackageDocument::Normal(pkg) => Some(pkg),
            PackageDocument::Unpublished(_) => None,
        }
    }

    pub fn is_unpublished(&self) -> bool {
        matches!(self, PackageDocument::Unpublished(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, PackageDocument::Normal(pkg) if pkg.is_local)
    }
}

impl From<Package> for PackageDocument {
    fn from(pkg: Package) -> Self {
        PackageDocument::Normal(pkg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::package::tests::{local_package, ts};

    fn unpublished() -> PackageDocument {
        PackageDocument::Unpublished(UnpublishRecord {
            name: "tfs".into(),
            created: Some(ts(0)),
            modified: ts(100),
            unpublished: UnpublishInfo {
                name: "fengmk2".into(),
                time: ts(100),
                description: Some("tfs".into()),
                maintainers: vec![],
                versions: vec!["0.0.1".into()],
                tags: BTreeMap::new(),
            },
        })
    }

    #[test]
    fn test_document_accessors() {
        let doc = PackageDocument::from(local_package("foo", &[("1.0.0", 3)]));
        assert_eq!(doc.name(), "foo");
        assert_eq!(doc.modified(), ts(3));
        assert!(doc.as_package().is_some());
        assert!(doc.is_local());
        assert!(!doc.is_unpublished());

        let doc = unpublished();
        assert_eq!(doc.name(), "tfs");
        assert_eq!(doc.modified(), ts(100));
        assert!(doc.is_unpublished());
        assert!(!doc.is_local());
        assert!(doc.as_package().is_none());
    }

    #[test]
    fn test_document_serde_is_tagged() {
        let json = serde_json::to_value(unpublished()).unwrap();
        assert_eq!(json["state"], "unpublished");
        assert_eq!(json["unpublished"]["name"], "fengmk2");

        let back: PackageDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, unpublished());

        let json = serde_json::to_value(PackageDocument::from(local_package("foo", &[]))).unwrap();
        assert_eq!(json["state"], "normal");
    }
}
