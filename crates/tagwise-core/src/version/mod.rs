//! Version arithmetic and classification.
//!
//! Everything here is pure: no git, no filesystem. [`conventional`] picks a
//! release type from commits, [`increment`] applies it to a version, and the
//! predicates in this module classify versions for tag filtering.

pub mod conventional;
pub mod increment;

use std::fmt;
use std::str::FromStr;

use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use conventional::determine_release_type;
pub use increment::{NewVersionRequest, increment, package_new_version};

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// The computed version would not move forward.
    #[error("refusing to change version from {current} to {next}: new version must be greater")]
    NotGreater {
        /// Version before the bump.
        current: Version,
        /// Version the bump produced.
        next: Version,
    },

    /// A numeric part of the version can't be incremented any further.
    #[error("cannot increment {0}: counter is at its maximum")]
    Overflow(String),

    /// `release` is an auto-detect marker and cannot be applied directly.
    #[error("release type 'release' must be resolved from commits before computing a version")]
    UnresolvedReleaseType,

    /// A release type string that isn't one of the known types.
    #[error("unknown release type '{0}'")]
    UnknownReleaseType(String),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver bump level a commit type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// A release type, as configured or as resolved for one package.
///
/// `Release` means "work it out from the commits"; every other variant is
/// a concrete increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Auto-detect from conventional commits.
    #[default]
    Release,
    /// X.0.0
    Major,
    /// x.Y.0
    Minor,
    /// x.y.Z
    Patch,
    /// (X+1).0.0-preid.0
    Premajor,
    /// x.(Y+1).0-preid.0
    Preminor,
    /// x.y.(Z+1)-preid.0
    Prepatch,
    /// Next prerelease of the current line.
    Prerelease,
}

impl ReleaseType {
    /// All variants, in the order they're documented.
    pub const ALL: [Self; 8] = [
        Self::Release,
        Self::Major,
        Self::Minor,
        Self::Patch,
        Self::Premajor,
        Self::Preminor,
        Self::Prepatch,
        Self::Prerelease,
    ];

    /// Lowercase name used in configuration and output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Premajor => "premajor",
            Self::Preminor => "preminor",
            Self::Prepatch => "prepatch",
            Self::Prerelease => "prerelease",
        }
    }
}

impl From<BumpLevel> for ReleaseType {
    fn from(level: BumpLevel) -> Self {
        match level {
            BumpLevel::Patch => Self::Patch,
            BumpLevel::Minor => Self::Minor,
            BumpLevel::Major => Self::Major,
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| VersionError::UnknownReleaseType(s.to_string()))
    }
}

/// Parse a version string, stripping an optional `v` prefix.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);
    Ok(Version::parse(s)?)
}

/// Whether the version carries a prerelease component.
pub fn is_prerelease(version: &Version) -> bool {
    !version.pre.is_empty()
}

/// Whether the release type leaves prerelease territory (`major`, `minor`,
/// `patch`).
pub const fn is_stable_release_type(release_type: ReleaseType) -> bool {
    matches!(
        release_type,
        ReleaseType::Major | ReleaseType::Minor | ReleaseType::Patch
    )
}

/// Whether bumping `current` with `release_type` turns a prerelease into a
/// stable release.
pub fn is_graduating(current: &Version, release_type: ReleaseType) -> bool {
    is_prerelease(current) && is_stable_release_type(release_type)
}

/// Whether going from `current` to `new` turns a prerelease into a stable
/// release.
pub fn is_graduating_to_stable_between_versions(current: &Version, new: &Version) -> bool {
    is_prerelease(current) && !is_prerelease(new)
}

/// The leading prerelease identifier (`beta` in `1.0.0-beta.3`).
pub fn preid_of(version: &Version) -> Option<&str> {
    if version.pre.is_empty() {
        return None;
    }
    version.pre.as_str().split('.').next()
}

/// Whether `current` is a prerelease on a different track than `preid`.
pub fn is_changed_preid(current: &Version, preid: Option<&str>) -> bool {
    match (preid_of(current), preid) {
        (Some(current_preid), Some(requested)) => current_preid != requested,
        _ => false,
    }
}

/// Extract the version from a tag like `v1.2.3` or `pkg-a@1.2.3`.
///
/// Returns `None` when the tag doesn't carry the package prefix or the
/// remainder isn't valid semver.
pub fn extract_version_from_tag(tag: &str, package_name: Option<&str>) -> Option<Version> {
    let rest = match package_name {
        Some(name) => tag.strip_prefix(name)?.strip_prefix('@')?,
        None => tag,
    };
    parse_version(rest).ok()
}

/// A tag from a later major line than `current` is not a candidate base.
pub const fn is_tag_version_compatible_with_current(tag: &Version, current: &Version) -> bool {
    tag.major <= current.major
}

/// Whether prerelease tags must be left out of "last tag" lookups.
pub fn should_filter_prerelease_tags(current: &Version, graduating: bool) -> bool {
    !is_prerelease(current) || graduating
}

/// Build a prerelease from dot-separated identifiers.
pub(crate) fn prerelease_from(identifiers: &[String]) -> VersionResult<Prerelease> {
    Ok(Prerelease::new(&identifiers.join("."))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parse_with_prefix() {
        assert_eq!(parse_version("v1.2.3").unwrap(), v("1.2.3"));
        assert_eq!(parse_version(" 1.2.3-rc.1 ").unwrap(), v("1.2.3-rc.1"));
        assert!(parse_version("not-a-version").is_err());
    }

    #[test]
    fn release_type_round_trips_through_str() {
        for t in ReleaseType::ALL {
            assert_eq!(t.as_str().parse::<ReleaseType>().unwrap(), t);
        }
        assert!(matches!(
            "huge".parse::<ReleaseType>(),
            Err(VersionError::UnknownReleaseType(_))
        ));
    }

    #[test]
    fn stable_release_types() {
        assert!(is_stable_release_type(ReleaseType::Major));
        assert!(is_stable_release_type(ReleaseType::Minor));
        assert!(is_stable_release_type(ReleaseType::Patch));
        assert!(!is_stable_release_type(ReleaseType::Prerelease));
        assert!(!is_stable_release_type(ReleaseType::Premajor));
        assert!(!is_stable_release_type(ReleaseType::Release));
    }

    #[test]
    fn graduation() {
        assert!(is_graduating(&v("1.0.0-beta.0"), ReleaseType::Minor));
        assert!(!is_graduating(&v("1.0.0"), ReleaseType::Minor));
        assert!(!is_graduating(&v("1.0.0-beta.0"), ReleaseType::Prerelease));
        assert!(is_graduating_to_stable_between_versions(
            &v("1.0.0-beta.1"),
            &v("1.0.0")
        ));
        assert!(!is_graduating_to_stable_between_versions(
            &v("1.0.0"),
            &v("1.0.1")
        ));
    }

    #[test]
    fn changed_preid() {
        assert!(is_changed_preid(&v("1.0.0-alpha.2"), Some("beta")));
        assert!(!is_changed_preid(&v("1.0.0-beta.2"), Some("beta")));
        assert!(!is_changed_preid(&v("1.0.0"), Some("beta")));
        assert!(!is_changed_preid(&v("1.0.0-beta.2"), None));
    }

    #[test]
    fn extract_from_tags() {
        assert_eq!(extract_version_from_tag("v1.2.3", None), Some(v("1.2.3")));
        assert_eq!(extract_version_from_tag("1.2.3", None), Some(v("1.2.3")));
        assert_eq!(
            extract_version_from_tag("pkg-a@1.0.0-beta.1", Some("pkg-a")),
            Some(v("1.0.0-beta.1"))
        );
        assert_eq!(
            extract_version_from_tag("@scope/pkg@2.0.0", Some("@scope/pkg")),
            Some(v("2.0.0"))
        );
        assert_eq!(extract_version_from_tag("pkg-b@1.0.0", Some("pkg-a")), None);
        assert_eq!(extract_version_from_tag("release-candidate", None), None);
    }

    #[test]
    fn major_compatibility() {
        assert!(!is_tag_version_compatible_with_current(
            &v("2.0.0-beta.0"),
            &v("1.0.0")
        ));
        assert!(is_tag_version_compatible_with_current(
            &v("0.9.0"),
            &v("1.0.0")
        ));
        assert!(is_tag_version_compatible_with_current(
            &v("1.4.0"),
            &v("1.0.0")
        ));
    }

    #[test]
    fn prerelease_filtering() {
        assert!(should_filter_prerelease_tags(&v("1.0.0"), false));
        assert!(should_filter_prerelease_tags(&v("1.0.0-beta.1"), true));
        assert!(!should_filter_prerelease_tags(&v("1.0.0-beta.1"), false));
    }

    #[test]
    fn bump_level_ordering() {
        assert!(BumpLevel::Major > BumpLevel::Minor);
        assert!(BumpLevel::Minor > BumpLevel::Patch);
        assert_eq!(ReleaseType::from(BumpLevel::Minor), ReleaseType::Minor);
    }
}
