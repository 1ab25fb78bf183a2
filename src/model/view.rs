//! JSON rendering of stored documents for the read path.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use super::document::{PackageDocument, UnpublishRecord};
use super::package::{Package, VersionManifest};

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl PackageDocument {
    /// Renders the document the way the registry presents it to clients.
    pub fn to_view(&self) -> Value {
        match self {
            PackageDocument::Normal(pkg) => package_view(pkg),
            PackageDocument::Unpublished(record) => unpublished_view(record),
        }
    }
}

fn package_view(pkg: &Package) -> Value {
    let ordered = pkg.versions_by_recency();

    let mut versions = Map::new();
    for manifest in &ordered {
        versions.insert(manifest.version.clone(), version_view(manifest));
    }

    let mut time = Map::new();
    time.insert("created".into(), json!(format_timestamp(&pkg.time.created)));
    time.insert("modified".into(), json!(format_timestamp(&pkg.time.modified)));
    for manifest in &ordered {
        time.insert(
            manifest.version.clone(),
            json!(format_timestamp(&manifest.modified_at)),
        );
    }

    let users: Map<String, Value> = pkg
        .star_users
        .iter()
        .map(|user| (user.clone(), Value::Bool(true)))
        .collect();

    json!({
        "_id": pkg.name,
        "name": pkg.name,
        "description": pkg.description.clone().unwrap_or_default(),
        "dist-tags": pkg.dist_tags,
        "versions": versions,
        "maintainers": pkg.maintainers,
        "users": users,
        "time": time,
    })
}

fn version_view(manifest: &VersionManifest) -> Value {
    let mut view = json!({
        "name": manifest.name,
        "version": manifest.version,
        "dependencies": manifest.dependencies,
        "dist": manifest.dist,
    });
    if let (Some(description), Some(obj)) = (&manifest.description, view.as_object_mut()) {
        obj.insert("description".into(), json!(description));
    }
    view
}

fn unpublished_view(record: &UnpublishRecord) -> Value {
    let info = &record.unpublished;

    let mut time = Map::new();
    if let Some(created) = &record.created {
        time.insert("created".into(), json!(format_timestamp(created)));
    }
    time.insert("modified".into(), json!(format_timestamp(&record.modified)));
    time.insert(
        "unpublished".into(),
        json!({
            "name": info.name,
            "time": format_timestamp(&info.time),
            "description": info.description.clone().unwrap_or_default(),
            "maintainers": info.maintainers,
            "versions": info.versions,
            "tags": info.tags,
        }),
    );

    json!({
        "_id": record.name,
        "name": record.name,
        "time": time,
    })
}
