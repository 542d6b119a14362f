//! `package.json` reading and version writing.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

/// Manifest file name inside every package directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Errors from manifest operations.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Reading or writing the file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file isn't valid JSON or lacks a required field.
    #[error("invalid manifest {path}: {source}")]
    Parse {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The `version` field isn't valid semver.
    #[error("invalid version '{version}' in {path}: {source}")]
    InvalidVersion {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Raw version string.
        version: String,
        /// Underlying error.
        source: semver::Error,
    },

    /// Writing a version to a manifest that has no object at the top level.
    #[error("{0} is not a JSON object")]
    NotAnObject(Utf8PathBuf),
}

/// Result alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Dependency fields of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyType {
    /// `dependencies`
    Dependencies,
    /// `devDependencies`
    DevDependencies,
    /// `peerDependencies`
    PeerDependencies,
}

impl DependencyType {
    /// Key of this field in `package.json`.
    pub const fn manifest_key(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::PeerDependencies => "peerDependencies",
        }
    }
}

/// The parts of `package.json` the release flow cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name.
    pub name: String,
    /// Raw version string, if present.
    #[serde(default)]
    pub version: Option<String>,
    /// Private packages are never released.
    #[serde(default)]
    pub private: bool,
    /// Runtime dependencies.
    #[serde(default)]
    pub dependencies: Map<String, Value>,
    /// Development dependencies.
    #[serde(default)]
    pub dev_dependencies: Map<String, Value>,
    /// Peer dependencies.
    #[serde(default)]
    pub peer_dependencies: Map<String, Value>,
}

impl PackageManifest {
    /// Dependency map for one field.
    pub const fn dependencies_of(&self, kind: DependencyType) -> &Map<String, Value> {
        match kind {
            DependencyType::Dependencies => &self.dependencies,
            DependencyType::DevDependencies => &self.dev_dependencies,
            DependencyType::PeerDependencies => &self.peer_dependencies,
        }
    }

    /// Parsed `version`, or `None` when the field is absent.
    pub fn parsed_version(&self, path: &Utf8Path) -> ManifestResult<Option<Version>> {
        self.version
            .as_deref()
            .map(|raw| {
                Version::parse(raw.trim()).map_err(|source| ManifestError::InvalidVersion {
                    path: path.to_path_buf(),
                    version: raw.to_string(),
                    source,
                })
            })
            .transpose()
    }
}

/// Path of the manifest inside `dir`.
pub fn manifest_path(dir: &Utf8Path) -> Utf8PathBuf {
    dir.join(MANIFEST_FILE)
}

/// Read the manifest in `dir`. A missing file is `Ok(None)`.
#[instrument(fields(%dir))]
pub fn read_manifest(dir: &Utf8Path) -> ManifestResult<Option<PackageManifest>> {
    let path = manifest_path(dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no manifest");
            return Ok(None);
        }
        Err(source) => return Err(ManifestError::Io { path, source }),
    };
    let manifest: PackageManifest =
        serde_json::from_str(&contents).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
    debug!(name = %manifest.name, version = ?manifest.version, "read manifest");
    Ok(Some(manifest))
}

/// Write `version` into the manifest in `dir`, keeping every other field and
/// the key order intact.
#[instrument(fields(%dir, %version))]
pub fn write_version(dir: &Utf8Path, version: &Version) -> ManifestResult<()> {
    let path = manifest_path(dir);
    let contents = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    let mut document: Value =
        serde_json::from_str(&contents).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
    let object = document
        .as_object_mut()
        .ok_or_else(|| ManifestError::NotAnObject(path.clone()))?;
    object.insert("version".to_string(), Value::String(version.to_string()));

    let mut rendered =
        serde_json::to_string_pretty(&document).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
    rendered.push('\n');
    std::fs::write(&path, rendered).map_err(|source| ManifestError::Io { path, source })?;
    debug!("wrote version");
    Ok(())
}
