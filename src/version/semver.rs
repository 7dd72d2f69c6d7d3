//! Semantic delta classification between version strings

use semver::Version;

use crate::version::extract::clean_version;

/// Kind of change between two version strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Major,
    Minor,
    Patch,
    NoChange,
    Unknown,
}

impl DeltaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaKind::Major => "major",
            DeltaKind::Minor => "minor",
            DeltaKind::Patch => "patch",
            DeltaKind::NoChange => "no_change",
            DeltaKind::Unknown => "unknown",
        }
    }
}

/// Classified difference between an old and a new version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDelta {
    pub kind: DeltaKind,
    /// True exactly when the major component differs and the new version is
    /// strictly greater than the old one.
    pub is_major: bool,
}

impl VersionDelta {
    const UNKNOWN: VersionDelta = VersionDelta {
        kind: DeltaKind::Unknown,
        is_major: false,
    };
}

/// Parse a version string into a semver::Version, padding missing components
/// with zero.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_padded(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Classify the delta between two version strings.
///
/// Both inputs are normalized (`v` prefix and pre-release suffixes stripped,
/// missing components zero-padded) before comparison. A new version that is
/// not strictly greater than the old one classifies as `NoChange`;
/// unparseable input classifies as `Unknown`. Never fails: comparison
/// problems must not abort the pipeline.
pub fn classify_delta(old_version: &str, new_version: &str) -> VersionDelta {
    let Some(old) = parse_padded(&clean_version(old_version)) else {
        return VersionDelta::UNKNOWN;
    };
    let Some(new) = parse_padded(&clean_version(new_version)) else {
        return VersionDelta::UNKNOWN;
    };

    if new <= old {
        return VersionDelta {
            kind: DeltaKind::NoChange,
            is_major: false,
        };
    }

    if new.major != old.major {
        VersionDelta {
            kind: DeltaKind::Major,
            is_major: true,
        }
    } else if new.minor != old.minor {
        VersionDelta {
            kind: DeltaKind::Minor,
            is_major: false,
        }
    } else {
        VersionDelta {
            kind: DeltaKind::Patch,
            is_major: false,
        }
    }
}
