//! Configuration loading and discovery.
//!
//! Configuration is resolved once, up front, into a [`Config`] that every
//! other module borrows. Nothing below this layer reads the environment.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `~/.config/tagwise/config.<ext>` (user config)
//! 3. `.tagwise.<ext>` or `tagwise.<ext>` in the working directory or any
//!    parent, stopping at the repository boundary (`.git`)
//! 4. Files passed explicitly (`--config`), later files winning
//!
//! Where `<ext>` is one of `toml`, `yaml`, `yml`, `json`.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use tagwise_core::config::ConfigLoader;
//!
//! let cwd = Utf8PathBuf::try_from(std::env::current_dir().unwrap()).unwrap();
//! let config = ConfigLoader::new().with_project_search(&cwd).load().unwrap();
//! println!("{}", config.monorepo.version_mode);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::manifest::DependencyType;
use crate::version::{BumpLevel, ReleaseType};

/// Resolved configuration for one run.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<Utf8PathBuf>,
    /// Workspace layout and versioning strategy.
    pub monorepo: MonorepoConfig,
    /// Bump behavior.
    pub bump: BumpConfig,
    /// Conventional commit types and the bump each one triggers.
    pub types: CommitTypes,
    /// Naming templates.
    pub templates: TemplatesConfig,
    /// Lower bound override for every commit range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Upper bound override for every commit range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Shell commands keyed by hook name (`before:bump`, `success:bump`,
    /// `error:bump`).
    pub hooks: BTreeMap<String, String>,
}

/// How versions are shared across workspace packages.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VersionMode {
    /// Every package shares the root version and one repo-wide tag.
    Unified,
    /// Each package has its own version line and `name@version` tags.
    Independent,
    /// Repo-wide tags, but only changed packages and their dependents bump.
    Selective,
    /// A single package at the repository root.
    #[default]
    Standalone,
}

impl VersionMode {
    /// Lowercase name as used in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unified => "unified",
            Self::Independent => "independent",
            Self::Selective => "selective",
            Self::Standalone => "standalone",
        }
    }
}

impl fmt::Display for VersionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[monorepo]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonorepoConfig {
    /// Versioning strategy.
    pub version_mode: VersionMode,
    /// Glob patterns for package directories, relative to the repository
    /// root. `.` is the root itself.
    pub packages: Vec<String>,
    /// Package names never considered for a bump.
    pub ignore_package_names: Vec<String>,
}

impl Default for MonorepoConfig {
    fn default() -> Self {
        Self {
            version_mode: VersionMode::default(),
            packages: vec![".".to_string()],
            ignore_package_names: Vec::new(),
        }
    }
}

/// `[bump]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BumpConfig {
    /// Release type to apply; `release` detects it from commits.
    pub release_type: ReleaseType,
    /// Prerelease identifier (e.g. `beta`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preid: Option<String>,
    /// Manifest fields that count as in-workspace dependency edges.
    pub dependency_types: Vec<DependencyType>,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            release_type: ReleaseType::Release,
            preid: None,
            dependency_types: vec![DependencyType::Dependencies],
        }
    }
}

/// `[templates]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Repo-wide tag name; `{{newVersion}}` is replaced by the version.
    pub tag_body: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            tag_body: "v{{newVersion}}".to_string(),
        }
    }
}

impl TemplatesConfig {
    /// Placeholder substituted with a version in templates.
    pub const NEW_VERSION: &'static str = "{{newVersion}}";

    /// Render the tag for `version`.
    pub fn tag_for(&self, version: &str) -> String {
        self.tag_body.replace(Self::NEW_VERSION, version)
    }
}

/// Changelog title and bump level for one commit type.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommitTypeRule {
    /// Section title in changelogs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Bump this type triggers, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semver: Option<BumpLevel>,
}

/// Commit type rules keyed by conventional commit type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CommitTypes(pub BTreeMap<String, CommitTypeRule>);

impl CommitTypes {
    /// Bump level a commit type triggers.
    pub fn semver_for(&self, commit_type: &str) -> Option<BumpLevel> {
        self.0.get(commit_type).and_then(|rule| rule.semver)
    }

    /// Whether the type has any rule at all (title or bump).
    pub fn is_known(&self, commit_type: &str) -> bool {
        self.0
            .get(commit_type)
            .is_some_and(|rule| rule.title.is_some() || rule.semver.is_some())
    }
}

impl Default for CommitTypes {
    fn default() -> Self {
        let rule = |title: &str, semver: Option<BumpLevel>| CommitTypeRule {
            title: Some(title.to_string()),
            semver,
        };
        let types = [
            ("feat", rule("🚀 Enhancements", Some(BumpLevel::Minor))),
            ("perf", rule("🔥 Performance", Some(BumpLevel::Patch))),
            ("fix", rule("🩹 Fixes", Some(BumpLevel::Patch))),
            ("refactor", rule("💅 Refactors", Some(BumpLevel::Patch))),
            ("docs", rule("📖 Documentation", Some(BumpLevel::Patch))),
            ("build", rule("📦 Build", Some(BumpLevel::Patch))),
            ("types", rule("🌊 Types", Some(BumpLevel::Patch))),
            ("chore", rule("🏡 Chore", None)),
            ("examples", rule("🏀 Examples", None)),
            ("test", rule("✅ Tests", None)),
            ("style", rule("🎨 Styles", None)),
            ("ci", rule("🤖 CI", None)),
        ];
        Self(
            types
                .into_iter()
                .map(|(name, rule)| (name.to_string(), rule))
                .collect(),
        )
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "tagwise";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Loader with user config enabled and a `.git` search boundary.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Walk up from `path` looking for a project config file.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Include (or skip) `~/.config/tagwise/config.<ext>`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Stop the upward search at the first parent containing `marker`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Search all the way to the filesystem root.
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add a config file to load after discovered ones.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Every file that will be merged, lowest precedence first.
    pub fn sources(&self) -> Vec<Utf8PathBuf> {
        let mut sources = Vec::new();
        if self.include_user_config
            && let Some(user) = find_user_config()
        {
            sources.push(user);
        }
        if let Some(project) = self
            .project_search_root
            .as_deref()
            .and_then(|root| self.search_upward(root))
        {
            sources.push(project);
        }
        sources.extend(self.explicit_files.iter().cloned());
        sources
    }

    /// Merge defaults with every source into a [`Config`].
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        let sources = self.sources();
        tracing::debug!(?sources, "loading configuration");

        let figment = sources.iter().fold(
            Figment::new().merge(Serialized::defaults(Config::default())),
            |figment, path| merge_file(figment, path),
        );

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::debug!(
            log_level = config.log_level.as_str(),
            version_mode = %config.monorepo.version_mode,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Like [`load`](Self::load), but fails when no file was found.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        if self.sources().is_empty() {
            return Err(ConfigError::NotFound);
        }
        self.load()
    }

    fn search_upward(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in start.ancestors() {
            if let Some(found) = config_file_in(dir) {
                return Some(found);
            }
            // The boundary directory itself is searched; its parents are not.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }
        }
        None
    }
}

/// `.tagwise.<ext>` or `tagwise.<ext>` directly inside `dir`.
fn config_file_in(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    CONFIG_EXTENSIONS.iter().find_map(|ext| {
        [format!(".{APP_NAME}.{ext}"), format!("{APP_NAME}.{ext}")]
            .into_iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

fn find_user_config() -> Option<Utf8PathBuf> {
    let dir = user_config_dir()?;
    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("config.{ext}")))
        .find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
    match path.extension() {
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
        Some("json") => figment.merge(Json::file_exact(path.as_str())),
        _ => figment.merge(Toml::file_exact(path.as_str())),
    }
}

/// Locate the project config file for `start` without loading it.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new().search_upward(start.as_ref())
}

/// `~/.config/tagwise/` on Linux, the platform equivalent elsewhere.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf()).ok()
}
