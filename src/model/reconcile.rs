//! Merging an upstream manifest into the locally stored document.
//!
//! Upstream is authoritative for versions, dist-tags and dependency data.
//! Star users and maintainers added through this registry survive the merge.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::warn;

use super::document::{PackageDocument, UnpublishInfo, UnpublishRecord};
use super::package::{Maintainer, Package, PackageTime, VersionManifest};
use crate::upstream::{UpstreamManifest, UpstreamUnpublished, parse_timestamp};

/// Builds the document to persist from `upstream`, preserving local-only
/// state from `existing`. `now` is only used when upstream omits timestamps.
pub fn reconcile(
    existing: Option<&PackageDocument>,
    upstream: UpstreamManifest,
    now: DateTime<Utc>,
) -> PackageDocument {
    let existing_created = existing.and_then(|doc| match doc {
        PackageDocument::Normal(pkg) => Some(pkg.time.created),
        PackageDocument::Unpublished(record) => record.created,
    });

    if let Some(unpublished) = upstream.time.unpublished.clone() {
        return PackageDocument::Unpublished(unpublish_record(
            &upstream,
            unpublished,
            existing_created,
            now,
        ));
    }

    let existing = existing.and_then(PackageDocument::as_package);
    let upstream_modified = upstream.time.modified_at();

    let mut versions = BTreeMap::new();
    for (key, version) in &upstream.versions {
        let modified_at = upstream
            .time
            .version_at(key)
            .or(upstream_modified)
            .unwrap_or(now);
        versions.insert(
            key.clone(),
            VersionManifest {
                name: upstream.name.clone(),
                version: key.clone(),
                description: version.description.clone(),
                dependencies: version.dependencies.clone(),
                dist: version.dist.clone(),
                modified_at,
            },
        );
    }

    let mut dist_tags = BTreeMap::new();
    for (tag, version) in &upstream.dist_tags {
        if versions.contains_key(version) {
            dist_tags.insert(tag.clone(), version.clone());
        } else {
            warn!(
                "{}: dropping dist-tag {} -> {} (version not present upstream)",
                upstream.name, tag, version
            );
        }
    }

    let (maintainers, local_maintainers) = match existing {
        Some(pkg) => merge_maintainers(&upstream.maintainers, pkg),
        None => (upstream.maintainers.clone(), BTreeSet::new()),
    };

    let mut star_users: BTreeSet<String> = existing
        .map(|p| p.star_users.clone())
        .unwrap_or_default();
    star_users.extend(
        upstream
            .users
            .iter()
            .filter(|(_, starred)| **starred)
            .map(|(user, _)| user.clone()),
    );

    let newest_version = versions.values().map(|v| v.modified_at).max();
    let oldest_version = versions.values().map(|v| v.modified_at).min();
    let created = upstream
        .time
        .created_at()
        .or(existing_created)
        .or(oldest_version)
        .unwrap_or(now);
    let modified = upstream_modified.or(newest_version).unwrap_or(created);

    PackageDocument::Normal(Package {
        name: upstream.name,
        description: upstream.description,
        versions,
        dist_tags,
        maintainers,
        star_users,
        local_maintainers,
        time: PackageTime { created, modified },
        is_local: false,
    })
}

fn unpublish_record(
    upstream: &UpstreamManifest,
    unpublished: UpstreamUnpublished,
    existing_created: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> UnpublishRecord {
    let removed_at = unpublished
        .time
        .as_deref()
        .and_then(parse_timestamp)
        .or(upstream.time.modified_at())
        .unwrap_or(now);

    UnpublishRecord {
        name: upstream.name.clone(),
        created: upstream.time.created_at().or(existing_created),
        modified: upstream.time.modified_at().unwrap_or(removed_at),
        unpublished: UnpublishInfo {
            name: unpublished.name,
            time: removed_at,
            description: unpublished.description,
            maintainers: unpublished.maintainers,
            versions: unpublished.versions,
            tags: unpublished.tags,
        },
    }
}

/// Upstream maintainers first, followed by the locally added ones upstream
/// lacks. Any other maintainer upstream no longer lists is dropped. A local
/// maintainer that upstream now lists becomes an upstream one.
fn merge_maintainers(
    upstream: &[Maintainer],
    existing: &Package,
) -> (Vec<Maintainer>, BTreeSet<String>) {
    let mut merged = upstream.to_vec();
    let mut local = BTreeSet::new();
    for maintainer in &existing.maintainers {
        if existing.local_maintainers.contains(&maintainer.name)
            && !merged.iter().any(|m| m.name == maintainer.name)
        {
            local.insert(maintainer.name.clone());
            merged.push(maintainer.clone());
        }
    }
    (merged, local)
}
