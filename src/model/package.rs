use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Tarball location and integrity descriptor of a version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Dist {
    pub tarball: String,
    #[serde(default)]
    pub shasum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// One published version of a package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VersionManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    pub dist: Dist,
    pub modified_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageTime {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Aggregate root of a non-unpublished package.
///
/// `time.modified` follows the provenance of the most recent mutation: a
/// publish sets it to the new version's timestamp, a tag write to the tagged
/// version's timestamp, and a sync to upstream's own modification time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionManifest>,
    #[serde(default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    #[serde(default)]
    pub star_users: BTreeSet<String>,
    /// Maintainers added through this registry rather than mirrored.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub local_maintainers: BTreeSet<String>,
    pub time: PackageTime,
    #[serde(default)]
    pub is_local: bool,
}

impl Package {
    /// An empty, locally published package created at `now`.
    pub fn new_local(name: &str, maintainers: Vec<Maintainer>, now: DateTime<Utc>) -> Self {
        Package {
            name: name.to_string(),
            description: None,
            versions: BTreeMap::new(),
            dist_tags: BTreeMap::new(),
            maintainers,
            star_users: BTreeSet::new(),
            local_maintainers: BTreeSet::new(),
            time: PackageTime {
                created: now,
                modified: now,
            },
            is_local: true,
        }
    }

    pub fn version(&self, version: &str) -> Option<&VersionManifest> {
        self.versions.get(version)
    }

    /// Versions in descending modification recency.
    ///
    /// Ties fall back to descending semantic version, then descending string.
    pub fn versions_by_recency(&self) -> Vec<&VersionManifest> {
        let mut versions: Vec<&VersionManifest> = self.versions.values().collect();
        versions.sort_by(|a, b| {
            b.modified_at
                .cmp(&a.modified_at)
                .then_with(|| compare_versions(&b.version, &a.version))
        });
        versions
    }

    /// Adds a version and moves `time.modified` to its timestamp.
    pub fn add_version(&mut self, manifest: VersionManifest) -> Result<(), RegistryError> {
        if self.versions.contains_key(&manifest.version) {
            return Err(RegistryError::VersionExists {
                name: self.name.clone(),
                version: manifest.version,
            });
        }
        if manifest.description.is_some() {
            self.description = manifest.description.clone();
        }
        self.time.modified = manifest.modified_at;
        self.versions.insert(manifest.version.clone(), manifest);
        Ok(())
    }

    /// Points `tag` at `version` and returns the new `time.modified`, which is
    /// the tagged version's own timestamp rather than the current instant.
    pub fn set_tag(&mut self, tag: &str, version: &str) -> Result<DateTime<Utc>, RegistryError> {
        let modified_at = self
            .versions
            .get(version)
            .map(|v| v.modified_at)
            .ok_or_else(|| RegistryError::TagTargetMissing {
                name: self.name.clone(),
                tag: tag.to_string(),
                version: version.to_string(),
            })?;

        self.dist_tags.insert(tag.to_string(), version.to_string());
        self.time.modified = modified_at;
        Ok(modified_at)
    }

    /// Returns true if the user was not already starring the package.
    pub fn star(&mut self, user: &str) -> bool {
        self.star_users.insert(user.to_string())
    }

    /// Returns true if the user was starring the package.
    pub fn unstar(&mut self, user: &str) -> bool {
        self.star_users.remove(user)
    }

    /// Adds a maintainer owned by this registry. Returns false if a
    /// maintainer with that name is already listed.
    pub fn add_maintainer(&mut self, maintainer: Maintainer) -> bool {
        if self.maintainers.iter().any(|m| m.name == maintainer.name) {
            return false;
        }
        self.local_maintainers.insert(maintainer.name.clone());
        self.maintainers.push(maintainer);
        true
    }

    /// Every dependency name declared by any version, deduplicated.
    pub fn dependency_names(&self) -> BTreeSet<String> {
        self.versions
            .values()
            .flat_map(|v| v.dependencies.keys().cloned())
            .collect()
    }

    /// Tags whose target is not a key of `versions`.
    pub fn dangling_tags(&self) -> Vec<&str> {
        self.dist_tags
            .iter()
            .filter(|(_, version)| !self.versions.contains_key(*version))
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    /// Timestamp for a version published at `now`: millisecond precision and
    /// strictly later than the current `time.modified`.
    pub fn next_publish_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(3);
        let floor = self.time.modified + Duration::milliseconds(1);
        if now < floor { floor } else { now }
    }
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    pub(crate) fn manifest(name: &str, version: &str, at: DateTime<Utc>) -> VersionManifest {
        VersionManifest {
            name: name.to_string(),
            version: version.to_string(),
            description: None,
            dependencies: BTreeMap::new(),
            dist: Dist {
                tarball: format!("https://registry.example/{name}/-/{name}-{version}.tgz"),
                shasum: "deadbeef".into(),
                integrity: None,
            },
            modified_at: at,
        }
    }

    pub(crate) fn local_package(name: &str, versions: &[(&str, i64)]) -> Package {
        let mut pkg = Package::new_local(name, vec![], ts(0));
        for (version, at) in versions {
            pkg.add_version(manifest(name, version, ts(*at))).unwrap();
            pkg.set_tag("latest", version).unwrap();
        }
        pkg
    }

    #[test]
    fn test_versions_by_recency_not_semver() {
        let pkg = local_package("testmodule-list-1", &[("0.0.1", 1), ("1.0.0", 2)]);
        let order: Vec<&str> = pkg
            .versions_by_recency()
            .iter()
            .map(|v| v.version.as_str())
            .collect();
        assert_eq!(order, vec!["1.0.0", "0.0.1"]);

        let pkg = local_package("reversed", &[("2.0.0", 1), ("1.0.0", 2)]);
        let order: Vec<&str> = pkg
            .versions_by_recency()
            .iter()
            .map(|v| v.version.as_str())
            .collect();
        assert_eq!(order, vec!["1.0.0", "2.0.0"]);
    }

    #[test]
    fn test_versions_by_recency_tie_uses_semver() {
        let mut pkg = Package::new_local("tie", vec![], ts(0));
        pkg.add_version(manifest("tie", "1.2.0", ts(5))).unwrap();
        pkg.add_version(manifest("tie", "1.10.0", ts(5))).unwrap();
        let order: Vec<&str> = pkg
            .versions_by_recency()
            .iter()
            .map(|v| v.version.as_str())
            .collect();
        assert_eq!(order, vec!["1.10.0", "1.2.0"]);
    }

    #[test]
    fn test_add_version_rejects_duplicate() {
        let mut pkg = local_package("dup", &[("1.0.0", 1)]);
        let err = pkg.add_version(manifest("dup", "1.0.0", ts(9))).unwrap_err();
        assert!(matches!(err, RegistryError::VersionExists { .. }));
        assert_eq!(pkg.time.modified, ts(1));
    }

    #[test]
    fn test_set_tag_uses_version_timestamp() {
        let mut pkg = local_package("tagged", &[("0.0.1", 1), ("1.0.0", 2)]);
        assert_eq!(pkg.time.modified, ts(2));

        let modified = pkg.set_tag("test-tag", "0.0.1").unwrap();
        assert_eq!(modified, ts(1));
        assert_eq!(pkg.time.modified, ts(1));
        assert_eq!(pkg.dist_tags.get("test-tag").map(String::as_str), Some("0.0.1"));
    }

    #[test]
    fn test_set_tag_missing_version() {
        let mut pkg = local_package("tagged", &[("1.0.0", 2)]);
        let err = pkg.set_tag("beta", "2.0.0").unwrap_err();
        assert!(matches!(err, RegistryError::TagTargetMissing { .. }));
        assert!(!pkg.dist_tags.contains_key("beta"));
        assert_eq!(pkg.time.modified, ts(2));
    }

    #[test]
    fn test_star_and_unstar() {
        let mut pkg = local_package("starred", &[("1.0.0", 1)]);
        assert!(pkg.star("fengmk2"));
        assert!(!pkg.star("fengmk2"));
        assert!(pkg.star("foouser"));
        assert_eq!(pkg.star_users.len(), 2);
        assert!(pkg.unstar("foouser"));
        assert!(!pkg.unstar("foouser"));
        assert_eq!(pkg.time.modified, ts(1));
    }

    #[test]
    fn test_add_maintainer_records_local_owner() {
        let mut pkg = local_package("owned", &[("1.0.0", 1)]);
        let modified = pkg.time.modified;
        let admin = Maintainer {
            name: "local-admin".into(),
            email: "admin@example.com".into(),
        };

        assert!(pkg.add_maintainer(admin.clone()));
        assert!(!pkg.add_maintainer(admin));
        assert_eq!(pkg.maintainers.len(), 1);
        assert!(pkg.local_maintainers.contains("local-admin"));
        assert_eq!(pkg.time.modified, modified);
    }

    #[test]
    fn test_dependency_names_unique_across_versions() {
        let mut pkg = Package::new_local("deps", vec![], ts(0));
        let mut v1 = manifest("deps", "0.0.1", ts(1));
        v1.dependencies.insert("bytetest".into(), "~0.0.1".into());
        v1.dependencies.insert("mocha".into(), "~1.0.0".into());
        let mut v2 = manifest("deps", "1.0.0", ts(2));
        v2.dependencies.insert("mocha".into(), "~1.0.0".into());
        v2.dependencies.insert("should".into(), "*".into());
        pkg.add_version(v1).unwrap();
        pkg.add_version(v2).unwrap();

        let names: Vec<String> = pkg.dependency_names().into_iter().collect();
        assert_eq!(names, vec!["bytetest", "mocha", "should"]);
    }

    #[test]
    fn test_dangling_tags() {
        let mut pkg = local_package("dangling", &[("1.0.0", 1)]);
        pkg.dist_tags.insert("next".into(), "2.0.0".into());
        assert_eq!(pkg.dangling_tags(), vec!["next"]);
    }

    #[test]
    fn test_next_publish_time_is_strictly_later() {
        let pkg = local_package("clock", &[("1.0.0", 10)]);
        assert_eq!(
            pkg.next_publish_time(ts(5)),
            ts(10) + Duration::milliseconds(1)
        );
        assert_eq!(pkg.next_publish_time(ts(20)), ts(20));
    }
}
