mod manifest;
mod package;

pub use manifest::{DistTags, License, Manifest, ManifestTime, ManifestVersion};
pub use package::{
    AuditInfoRecord, DependencyRecord, KeywordRecord, PackageListQuery, PackageRecord,
    PackageSummary, ReadmeRecord, VersionRecord,
};
