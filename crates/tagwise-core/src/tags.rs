//! Tag resolution.
//!
//! Every pipeline stage works on a commit range `from..to`. This module
//! works out both ends for a stage, a version mode, and optionally one
//! package:
//!
//! - `from` is the most recent compatible release tag, falling back to the
//!   first commit when nothing qualifies.
//! - `to` is the current branch for untagged stages (`bump`, `changelog`),
//!   or the tag the release will carry for tagged ones (`publish`,
//!   `provider-release`).
//!
//! "Compatible" is a greedy nearest-match: the newest tag whose version
//! parses, isn't a prerelease when only stable tags count, and isn't from a
//! later major line than the version being released.

use std::fmt;

use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{Config, TemplatesConfig, VersionMode};
use crate::git::{GitError, GitRepository};
use crate::version::{
    extract_version_from_tag, is_changed_preid, is_graduating, is_prerelease,
    is_tag_version_compatible_with_current, parse_version, should_filter_prerelease_tags,
};

/// How many recent tags are considered when looking for a base.
pub const TAG_LOOKUP_LIMIT: usize = 50;

/// Errors from tag resolution.
#[derive(Error, Debug)]
pub enum TagsError {
    /// A git query failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A tagged stage in independent mode was resolved without a package.
    #[error("resolving '{stage}' tags in independent mode requires a package")]
    MissingPackage {
        /// Stage being resolved.
        stage: TagStage,
    },

    /// A tagged stage in independent mode was resolved without a version.
    #[error("resolving '{stage}' tags for {package} requires its new version")]
    MissingNewVersion {
        /// Stage being resolved.
        stage: TagStage,
        /// Package being resolved.
        package: String,
    },
}

/// Result alias for tag resolution.
pub type TagsResult<T> = Result<T, TagsError>;

/// Pipeline stage a range is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagStage {
    /// Computing version bumps.
    Bump,
    /// Rendering changelogs.
    Changelog,
    /// Publishing to a registry, after tagging.
    Publish,
    /// Creating a hosted release, after tagging.
    ProviderRelease,
}

impl TagStage {
    /// Stages that run after the release tag exists.
    pub const fn is_tagged(self) -> bool {
        matches!(self, Self::Publish | Self::ProviderRelease)
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bump => "bump",
            Self::Changelog => "changelog",
            Self::Publish => "publish",
            Self::ProviderRelease => "provider-release",
        }
    }
}

impl fmt::Display for TagStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bound of a commit range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "ref", rename_all = "kebab-case")]
pub enum FromRef {
    /// A release tag.
    Tag(String),
    /// The repository's first commit (no compatible tag).
    Commit(String),
    /// Set explicitly in configuration.
    Explicit(String),
    /// The package has never been released. Commit collection replaces this
    /// with the parent of the first commit that touched the package.
    NewPackage {
        /// The repository's first commit.
        first_commit: String,
    },
}

impl FromRef {
    /// The git reference.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tag(r) | Self::Commit(r) | Self::Explicit(r) => r,
            Self::NewPackage { first_commit } => first_commit,
        }
    }
}

impl fmt::Display for FromRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved `from..to` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTags {
    /// Lower bound (exclusive).
    pub from: FromRef,
    /// Upper bound (inclusive).
    pub to: String,
}

/// The package a range is resolved for.
#[derive(Debug, Clone, Copy)]
pub struct PackageRef<'a> {
    /// Package name.
    pub name: &'a str,
    /// Current version.
    pub version: &'a Version,
}

/// What to resolve.
#[derive(Debug, Clone, Copy)]
pub struct TagQuery<'a> {
    /// Stage the range is for.
    pub stage: TagStage,
    /// Package, for package-scoped resolution.
    pub package: Option<PackageRef<'a>>,
    /// Current root version; the compatibility reference for repo-wide tags.
    pub root_version: &'a Version,
    /// Version being released; names the tag of tagged stages.
    pub new_version: Option<&'a Version>,
}

impl<'a> TagQuery<'a> {
    /// Repo-wide query.
    pub const fn root(stage: TagStage, root_version: &'a Version) -> Self {
        Self {
            stage,
            package: None,
            root_version,
            new_version: None,
        }
    }

    /// Query for one package.
    pub const fn package(
        stage: TagStage,
        name: &'a str,
        version: &'a Version,
        root_version: &'a Version,
    ) -> Self {
        Self {
            stage,
            package: Some(PackageRef { name, version }),
            root_version,
            new_version: None,
        }
    }

    /// Set the version being released.
    pub const fn with_new_version(mut self, new_version: Option<&'a Version>) -> Self {
        self.new_version = new_version;
        self
    }
}

/// Resolve the commit range for one stage.
///
/// `from` and `to` set in configuration are used verbatim. Otherwise `from`
/// is resolved first, then `to`.
#[instrument(
    skip(git, config, query),
    fields(
        stage = %query.stage,
        mode = %config.monorepo.version_mode,
        package = query.package.map(|p| p.name),
    )
)]
pub fn resolve_tags(
    git: &dyn GitRepository,
    config: &Config,
    query: &TagQuery<'_>,
) -> TagsResult<ResolvedTags> {
    let from = resolve_from(git, config, query)?;
    let to = resolve_to(git, config, query)?;
    debug!(%from, %to, "resolved range");
    Ok(ResolvedTags { from, to })
}

fn package_scoped<'a>(config: &Config, query: &TagQuery<'a>) -> Option<PackageRef<'a>> {
    if config.monorepo.version_mode == VersionMode::Independent {
        query.package
    } else {
        None
    }
}

/// Name of the tag this release will carry, when the query says enough to
/// know it.
fn release_tag(config: &Config, query: &TagQuery<'_>) -> Option<String> {
    let new_version = query.new_version?;
    match package_scoped(config, query) {
        Some(package) => Some(format!("{}@{new_version}", package.name)),
        None if config.monorepo.version_mode == VersionMode::Independent => None,
        None => Some(config.templates.tag_for(&new_version.to_string())),
    }
}

fn resolve_from(
    git: &dyn GitRepository,
    config: &Config,
    query: &TagQuery<'_>,
) -> TagsResult<FromRef> {
    if let Some(from) = &config.from {
        debug!(%from, "using configured from");
        return Ok(FromRef::Explicit(from.clone()));
    }

    let scoped = package_scoped(config, query);
    let current = scoped.map_or(query.root_version, |p| p.version);
    let preid = config.bump.preid.as_deref();
    let graduating =
        is_graduating(current, config.bump.release_type) || is_changed_preid(current, preid);
    let only_stable = should_filter_prerelease_tags(current, graduating);

    // After tagging, the release's own tag is the newest one; the base is
    // the release before it.
    let exclude = query
        .stage
        .is_tagged()
        .then(|| release_tag(config, query))
        .flatten();

    let pattern = match scoped {
        Some(package) => format!("{}@*", package.name),
        None => config.templates.tag_body.replace(TemplatesConfig::NEW_VERSION, "*"),
    };
    let candidates: Vec<String> = git
        .recent_tags(&pattern, TAG_LOOKUP_LIMIT)?
        .into_iter()
        .filter(|tag| exclude.as_deref() != Some(tag.as_str()))
        .collect();
    debug!(
        %pattern,
        candidates = candidates.len(),
        %current,
        only_stable,
        "looking up last tag"
    );

    let compatible = match scoped {
        Some(package) => filter_compatible_tags(&candidates, current, only_stable, Some(package.name)),
        None => filter_tags_with(&candidates, current, only_stable, |tag| {
            version_from_template(&config.templates, tag)
        }),
    };

    if let Some(tag) = compatible.into_iter().next() {
        debug!(%tag, "found last tag");
        return Ok(FromRef::Tag(tag));
    }

    let first_commit = git.first_commit()?;
    if scoped.is_some() {
        debug!(%first_commit, "no compatible tag, treating as new package");
        Ok(FromRef::NewPackage { first_commit })
    } else {
        debug!(%first_commit, "no compatible tag, using first commit");
        Ok(FromRef::Commit(first_commit))
    }
}

fn resolve_to(git: &dyn GitRepository, config: &Config, query: &TagQuery<'_>) -> TagsResult<String> {
    if let Some(to) = &config.to {
        debug!(%to, "using configured to");
        return Ok(to.clone());
    }

    if !query.stage.is_tagged() {
        let current = git.current_ref()?;
        debug!(%current, "untagged stage, using current ref");
        return Ok(current);
    }

    if config.monorepo.version_mode == VersionMode::Independent {
        let package = query
            .package
            .ok_or(TagsError::MissingPackage { stage: query.stage })?;
        let new_version = query
            .new_version
            .ok_or_else(|| TagsError::MissingNewVersion {
                stage: query.stage,
                package: package.name.to_string(),
            })?;
        let tag = format!("{}@{new_version}", package.name);
        debug!(%tag, "independent release tag");
        return Ok(tag);
    }

    match query.new_version {
        Some(new_version) => {
            let tag = config.templates.tag_for(&new_version.to_string());
            debug!(%tag, "release tag from template");
            Ok(tag)
        }
        None => {
            let current = git.current_ref()?;
            debug!(%current, "no new version, using current ref");
            Ok(current)
        }
    }
}

/// Keep tags that can serve as the base for releasing from `current`, in
/// their original (newest first) order.
///
/// Tags are read as `v1.2.3`/`1.2.3`, or `name@1.2.3` when `package_name` is
/// given. Unparsable tags are dropped, as are prereleases when
/// `only_stable`, and tags from a later major line.
pub fn filter_compatible_tags(
    tags: &[String],
    current: &Version,
    only_stable: bool,
    package_name: Option<&str>,
) -> Vec<String> {
    filter_tags_with(tags, current, only_stable, |tag| {
        extract_version_from_tag(tag, package_name)
    })
}

fn filter_tags_with(
    tags: &[String],
    current: &Version,
    only_stable: bool,
    extract: impl Fn(&str) -> Option<Version>,
) -> Vec<String> {
    tags.iter()
        .filter(|tag| {
            extract(tag.as_str()).is_some_and(|version| {
                !(only_stable && is_prerelease(&version))
                    && is_tag_version_compatible_with_current(&version, current)
            })
        })
        .cloned()
        .collect()
}

/// Version from a tag rendered with the tag template.
fn version_from_template(templates: &TemplatesConfig, tag: &str) -> Option<Version> {
    let (prefix, suffix) = templates
        .tag_body
        .split_once(TemplatesConfig::NEW_VERSION)
        .unwrap_or(("", ""));
    let rest = tag.strip_prefix(prefix)?.strip_suffix(suffix)?;
    parse_version(rest).ok()
}
