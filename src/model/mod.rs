//! Registry document model.
//!
//! Packages, versions, dist-tags, maintainers and star users, plus the
//! unpublished terminal state and the rules for merging upstream data.

mod document;
mod name;
mod package;
mod reconcile;
mod view;

pub use document::{PackageDocument, UnpublishInfo, UnpublishRecord};
pub use name::{PackageName, is_scoped};
pub use package::{Dist, Maintainer, Package, PackageTime, VersionManifest};
pub use reconcile::reconcile;
pub use view::format_timestamp;

#[cfg(test)]
pub(crate) use package::tests as fixtures;
