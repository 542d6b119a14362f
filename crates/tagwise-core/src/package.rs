//! Package records built up over a run.

use std::fmt;

use camino::Utf8PathBuf;
use semver::Version;
use serde::Serialize;

use crate::commits::GitCommit;
use crate::version::ReleaseType;

/// Why a package ended up in the bump set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpReason {
    /// It has qualifying commits of its own.
    Commits,
    /// One of its in-workspace dependencies is bumped.
    Dependency,
    /// It leaves a prerelease line or switches prerelease identifier.
    Graduation,
}

impl fmt::Display for BumpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commits => write!(f, "commits"),
            Self::Dependency => write!(f, "dependency"),
            Self::Graduation => write!(f, "graduation"),
        }
    }
}

/// A workspace package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageBase {
    /// Package name from the manifest.
    pub name: String,
    /// Absolute directory.
    pub path: Utf8PathBuf,
    /// Directory relative to the repository root (empty for the root).
    pub relative_path: Utf8PathBuf,
    /// Current version.
    pub version: Version,
    /// Version after the bump, once determined.
    pub new_version: Option<Version>,
    /// Commits in the resolved range.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<GitCommit>,
    /// In-workspace packages this one depends on.
    pub dependencies: Vec<String>,
    /// Lower bound of the commit range.
    pub from_tag: Option<String>,
    /// Why it's being bumped.
    pub reason: Option<BumpReason>,
    /// Packages that caused a `dependency` bump, innermost cause first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_chain: Vec<String>,
    /// `private: true` in the manifest. Discovery skips private packages,
    /// so this is only ever set on records built by hand.
    pub private: bool,
    /// Release type applied to reach `new_version`.
    pub release_type: Option<ReleaseType>,
}

impl PackageBase {
    /// A freshly discovered package with nothing resolved yet.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
        relative_path: impl Into<Utf8PathBuf>,
        version: Version,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            relative_path: relative_path.into(),
            version,
            new_version: None,
            commits: Vec::new(),
            dependencies: Vec::new(),
            from_tag: None,
            reason: None,
            dependency_chain: Vec::new(),
            private: false,
            release_type: None,
        }
    }

    /// Whether this is the package at the repository root.
    pub fn is_root(&self) -> bool {
        matches!(self.relative_path.as_str(), "" | ".")
    }
}

/// The repository-level package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootPackage {
    /// Package name from the root manifest.
    pub name: String,
    /// Repository root.
    pub path: Utf8PathBuf,
    /// Current version.
    pub version: Version,
    /// Version after the bump, if one is warranted.
    pub new_version: Option<Version>,
    /// Commits in the resolved range.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<GitCommit>,
    /// Lower bound of the commit range.
    pub from_tag: Option<String>,
    /// `private: true` in the manifest.
    pub private: bool,
    /// Release type applied to reach `new_version`.
    pub release_type: Option<ReleaseType>,
}
