//! Deploy kind decision table

use crate::models::deploy::{DeployKind, DeployOptions};

/// A predicate paired with the kind it assigns
struct KindRule {
    matches: fn(&DeployOptions) -> bool,
    kind: DeployKind,
}

/// Evaluated top to bottom, first match wins.
const KIND_RULES: [KindRule; 6] = [
    KindRule {
        matches: is_rollback,
        kind: DeployKind::Rollback,
    },
    KindRule {
        matches: is_rebuild,
        kind: DeployKind::Rebuild,
    },
    KindRule {
        matches: has_image,
        kind: DeployKind::Image,
    },
    KindRule {
        matches: has_dockerfile,
        kind: DeployKind::Dockerfile,
    },
    KindRule {
        matches: has_archive_url,
        kind: DeployKind::ArchiveUrl,
    },
    KindRule {
        matches: has_file,
        kind: DeployKind::Upload,
    },
];

/// Kind assigned when no rule matches
pub const FALLBACK_KIND: DeployKind = DeployKind::Build;

/// Derive the deploy kind from the request fields alone
pub fn classify(opts: &DeployOptions) -> DeployKind {
    KIND_RULES
        .iter()
        .find(|rule| (rule.matches)(opts))
        .map(|rule| rule.kind)
        .unwrap_or(FALLBACK_KIND)
}

fn is_rollback(opts: &DeployOptions) -> bool {
    opts.rollback
}

fn is_rebuild(opts: &DeployOptions) -> bool {
    opts.is_rebuild()
}

fn has_image(opts: &DeployOptions) -> bool {
    !opts.image.is_empty()
}

fn has_dockerfile(opts: &DeployOptions) -> bool {
    !opts.dockerfile.is_empty()
}

fn has_archive_url(opts: &DeployOptions) -> bool {
    !opts.archive_url.is_empty()
}

fn has_file(opts: &DeployOptions) -> bool {
    opts.file.is_some()
}
