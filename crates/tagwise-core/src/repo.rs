//! Package discovery and bump orchestration.
//!
//! [`Workspace::get_packages`] is the entry point for a release: it finds
//! the workspace packages, collects each one's commits since its last
//! release, decides which packages move and by how much, and returns them
//! dependencies-first.
//!
//! Unified mode decides once, for the root package, and applies the result
//! to every package. The other modes decide per package:
//!
//! 1. discover packages from the configured globs
//! 2. resolve each package's range and collect its qualifying commits
//! 3. seed the bump set with packages whose commits warrant a release
//! 4. add every transitive dependent of a seed
//! 5. pick a release type and new version for each package
//! 6. keep packages with a reason (or all of them, when forced)

use std::collections::{HashMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::commits::{GitCommit, fetch_commits, is_allowed_commit, is_scoped_to_any, touches_path};
use crate::config::{Config, VersionMode};
use crate::dependencies::{
    expand_packages_to_bump_with_dependents, package_dependencies, topological_sort,
};
use crate::git::{GitError, GitRepository};
use crate::manifest::{ManifestError, read_manifest};
use crate::package::{BumpReason, PackageBase, RootPackage};
use crate::tags::{FromRef, TagQuery, TagStage, TagsError, resolve_tags};
use crate::version::{
    NewVersionRequest, ReleaseType, VersionError, determine_release_type, is_changed_preid,
    is_graduating_to_stable_between_versions, is_prerelease, is_stable_release_type,
    package_new_version,
};

/// Errors from discovery and orchestration.
#[derive(Error, Debug)]
pub enum RepoError {
    /// Reading a manifest failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A git query failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Resolving a commit range failed.
    #[error(transparent)]
    Tags(#[from] TagsError),

    /// Computing a version failed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// A package glob isn't a valid pattern.
    #[error("invalid package pattern '{pattern}': {source}")]
    Pattern {
        /// The configured pattern.
        pattern: String,
        /// Underlying error.
        source: glob::PatternError,
    },

    /// Reading a directory matched by a package glob failed.
    #[error("failed to read package directory: {0}")]
    Glob(#[from] glob::GlobError),

    /// A package directory isn't valid UTF-8.
    #[error("package path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The repository root has no `package.json`.
    #[error("no package.json at repository root {0}")]
    MissingRootManifest(Utf8PathBuf),

    /// The root `package.json` has no `version`.
    #[error("root package.json in {0} has no version")]
    MissingRootVersion(Utf8PathBuf),
}

/// Result alias for discovery and orchestration.
pub type RepoResult<T> = Result<T, RepoError>;

/// Options for [`Workspace::get_packages`].
#[derive(Debug, Clone, Default)]
pub struct BumpOptions {
    /// Replaces the trailing prerelease identifier of new versions.
    pub suffix: Option<String>,
    /// Bump every package, with or without qualifying commits.
    pub force: bool,
}

/// Options for [`Workspace::get_root_package`].
#[derive(Debug, Clone)]
pub struct RootPackageOptions {
    /// Bump even without qualifying commits.
    pub force: bool,
    /// Lower bound override.
    pub from: Option<String>,
    /// Upper bound override.
    pub to: Option<String>,
    /// Replaces the trailing prerelease identifier of the new version.
    pub suffix: Option<String>,
    /// Stage the range is resolved for.
    pub stage: TagStage,
}

impl Default for RootPackageOptions {
    fn default() -> Self {
        Self {
            force: false,
            from: None,
            to: None,
            suffix: None,
            stage: TagStage::Bump,
        }
    }
}

/// A package's commits and the range base they were collected from.
#[derive(Debug, Clone)]
pub struct PackageCommits {
    /// Resolved lower bound.
    pub from: FromRef,
    /// Qualifying commits, newest first.
    pub commits: Vec<GitCommit>,
}

/// A repository checkout plus the configuration for this run.
pub struct Workspace<'a> {
    root: Utf8PathBuf,
    config: &'a Config,
    git: &'a dyn GitRepository,
}

impl<'a> Workspace<'a> {
    /// Workspace rooted at `root`.
    pub fn new(root: impl Into<Utf8PathBuf>, config: &'a Config, git: &'a dyn GitRepository) -> Self {
        Self {
            root: root.into(),
            config,
            git,
        }
    }

    /// Repository root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The run's configuration.
    pub const fn config(&self) -> &Config {
        self.config
    }

    // ──────────────────────────────────────────────
    // Discovery
    // ──────────────────────────────────────────────

    /// Find every releasable package.
    ///
    /// Directories without a manifest, private packages, and ignored names
    /// are skipped silently; manifests without a version are skipped with
    /// a warning. Each package's in-workspace dependencies are filled in.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn discover_packages(&self) -> RepoResult<Vec<PackageBase>> {
        let ignored: HashSet<&str> = self
            .config
            .monorepo
            .ignore_package_names
            .iter()
            .map(String::as_str)
            .collect();

        let mut packages: Vec<PackageBase> = Vec::new();
        for dir in self.package_dirs()? {
            let Some(manifest) = read_manifest(&dir)? else {
                debug!(%dir, "no manifest, skipping");
                continue;
            };
            if manifest.private {
                debug!(name = %manifest.name, "private package, skipping");
                continue;
            }
            if ignored.contains(manifest.name.as_str()) {
                debug!(name = %manifest.name, "ignored package, skipping");
                continue;
            }
            if packages.iter().any(|p| p.name == manifest.name) {
                warn!(name = %manifest.name, %dir, "duplicate package name, skipping");
                continue;
            }
            let Some(version) = manifest.parsed_version(&dir)? else {
                warn!(name = %manifest.name, %dir, "package has no version, skipping");
                continue;
            };

            let relative = dir
                .strip_prefix(&self.root)
                .map_or_else(|_| dir.clone(), Utf8Path::to_path_buf);
            packages.push(PackageBase::new(manifest.name, dir, relative, version));
        }

        let names: HashSet<String> = packages.iter().map(|p| p.name.clone()).collect();
        for package in &mut packages {
            package.dependencies =
                package_dependencies(&package.path, &names, &self.config.bump.dependency_types)?;
        }

        debug!(count = packages.len(), "discovered packages");
        Ok(packages)
    }

    /// Directories matched by the package globs, sorted, without duplicates.
    fn package_dirs(&self) -> RepoResult<Vec<Utf8PathBuf>> {
        let mut dirs: Vec<Utf8PathBuf> = Vec::new();
        let escaped_root = glob::Pattern::escape(self.root.as_str());

        for pattern in &self.config.monorepo.packages {
            let trimmed = pattern.trim().trim_start_matches("./").trim_end_matches('/');
            if trimmed.is_empty() || trimmed == "." {
                dirs.push(self.root.clone());
                continue;
            }

            let full = format!("{escaped_root}/{trimmed}");
            let paths = glob::glob(&full).map_err(|source| RepoError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            for path in paths {
                let path = path?;
                if !path.is_dir() {
                    continue;
                }
                dirs.push(Utf8PathBuf::from_path_buf(path).map_err(RepoError::NonUtf8Path)?);
            }
        }

        dirs.sort();
        dirs.dedup();
        Ok(dirs)
    }

    /// Version in the root manifest.
    pub fn root_version(&self) -> RepoResult<Version> {
        let manifest = read_manifest(&self.root)?
            .ok_or_else(|| RepoError::MissingRootManifest(self.root.clone()))?;
        manifest
            .parsed_version(&self.root)?
            .ok_or_else(|| RepoError::MissingRootVersion(self.root.clone()))
    }

    // ──────────────────────────────────────────────
    // Commits
    // ──────────────────────────────────────────────

    /// Qualifying commits for `package` since its last release.
    ///
    /// `workspace` is every discovered package; a root package ignores
    /// commits scoped to one of the others. A package that has never been
    /// released is read from just before the first commit that touched it.
    #[instrument(skip(self, package, workspace, root_version), fields(package = %package.name))]
    pub fn package_commits(
        &self,
        package: &PackageBase,
        workspace: &[PackageBase],
        root_version: &Version,
    ) -> RepoResult<PackageCommits> {
        let query = TagQuery::package(TagStage::Bump, &package.name, &package.version, root_version);
        let resolved = resolve_tags(self.git, self.config, &query)?;
        let path = (!package.is_root()).then_some(package.relative_path.as_path());

        let from = if matches!(resolved.from, FromRef::NewPackage { .. }) {
            let touching = self
                .git
                .first_commit_touching(path.unwrap_or_else(|| Utf8Path::new("")))?;
            let Some(first) = touching else {
                debug!("package has no commits yet");
                return Ok(PackageCommits {
                    from: resolved.from,
                    commits: Vec::new(),
                });
            };
            let parent = self.git.parent_of(&first)?;
            debug!(%first, ?parent, "new package, reading from its first commit");
            parent
        } else {
            Some(resolved.from.as_str().to_string())
        };

        let others: Vec<&str> = workspace
            .iter()
            .filter(|p| p.name != package.name)
            .map(|p| p.name.as_str())
            .collect();

        let commits: Vec<GitCommit> = fetch_commits(self.git, from.as_deref(), &resolved.to, path)?
            .into_iter()
            .filter(|commit| is_allowed_commit(commit, &self.config.types))
            .filter(|commit| match path {
                Some(relative) => touches_path(commit, relative),
                None => !is_scoped_to_any(commit, &others),
            })
            .collect();
        debug!(from = %resolved.from, count = commits.len(), "qualifying commits");

        Ok(PackageCommits {
            from: resolved.from,
            commits,
        })
    }

    // ──────────────────────────────────────────────
    // Orchestration
    // ──────────────────────────────────────────────

    /// The packages to bump in this run, dependencies first, each with its
    /// new version and the reason it was selected.
    ///
    /// An empty list means there is nothing to release.
    #[instrument(skip(self, options), fields(mode = %self.config.monorepo.version_mode, force = options.force))]
    pub fn get_packages(&self, options: &BumpOptions) -> RepoResult<Vec<PackageBase>> {
        let packages = self.discover_packages()?;
        let selected = if self.config.monorepo.version_mode == VersionMode::Unified {
            self.unified_packages(packages, options)?
        } else {
            self.per_package(packages, options)?
        };

        let sorted = topological_sort(&selected);
        info!(count = sorted.len(), "packages to bump");
        Ok(sorted)
    }

    fn unified_packages(
        &self,
        packages: Vec<PackageBase>,
        options: &BumpOptions,
    ) -> RepoResult<Vec<PackageBase>> {
        let root = self.get_root_package(&RootPackageOptions {
            force: options.force,
            suffix: options.suffix.clone(),
            ..RootPackageOptions::default()
        })?;
        let Some(new_version) = root.new_version else {
            debug!("root package has nothing to release");
            return Ok(Vec::new());
        };
        let preid = self.config.bump.preid.as_deref();

        let mut selected = Vec::with_capacity(packages.len());
        for mut package in packages {
            if new_version <= package.version {
                warn!(
                    package = %package.name,
                    current = %package.version,
                    %new_version,
                    "unified version is not greater than package version, skipping"
                );
                continue;
            }
            package.reason = if !root.commits.is_empty() {
                Some(BumpReason::Commits)
            } else if is_graduating_to_stable_between_versions(&package.version, &new_version)
                || is_changed_preid(&package.version, preid)
            {
                Some(BumpReason::Graduation)
            } else {
                None
            };
            package.new_version = Some(new_version.clone());
            package.release_type = root.release_type;
            package.from_tag.clone_from(&root.from_tag);

            if options.force || package.reason.is_some() {
                selected.push(package);
            }
        }
        Ok(selected)
    }

    fn per_package(
        &self,
        mut packages: Vec<PackageBase>,
        options: &BumpOptions,
    ) -> RepoResult<Vec<PackageBase>> {
        let bump = &self.config.bump;
        let preid = bump.preid.as_deref();
        let root_version = match self.config.monorepo.version_mode {
            VersionMode::Independent => None,
            _ => Some(self.root_version()?),
        };

        let workspace = packages.clone();
        for package in &mut packages {
            let reference = root_version.as_ref().unwrap_or(&package.version).clone();
            let collected = self.package_commits(package, &workspace, &reference)?;
            package.from_tag = Some(collected.from.to_string());
            package.commits = collected.commits;
        }

        let seeds: Vec<PackageBase> = packages
            .iter()
            .filter(|p| {
                !p.commits.is_empty()
                    && determine_release_type(
                        &p.version,
                        &p.commits,
                        bump.release_type,
                        preid,
                        &self.config.types,
                        false,
                    )
                    .is_some()
            })
            .cloned()
            .collect();
        debug!(seeds = seeds.len(), "packages with qualifying commits");

        let expanded: HashMap<String, PackageBase> =
            expand_packages_to_bump_with_dependents(&packages, &seeds)
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect();
        for package in &mut packages {
            if let Some(annotated) = expanded.get(&package.name) {
                package.clone_from(annotated);
            }
        }

        let mut selected = Vec::new();
        for mut package in packages {
            let release_type = if options.force {
                self.detect(&package, true)
            } else if package.reason == Some(BumpReason::Dependency) {
                Some(dependency_release_type(
                    bump.release_type,
                    preid,
                    &package.version,
                ))
            } else {
                self.detect(&package, false)
            };

            if let Some(release_type) = release_type {
                let new_version = package_new_version(&NewVersionRequest {
                    name: &package.name,
                    current: &package.version,
                    release_type,
                    preid,
                    suffix: options.suffix.as_deref(),
                })?;
                if package.reason.is_none()
                    && (is_graduating_to_stable_between_versions(&package.version, &new_version)
                        || is_changed_preid(&package.version, preid))
                {
                    package.reason = Some(BumpReason::Graduation);
                }
                package.release_type = Some(release_type);
                package.new_version = Some(new_version);
            }

            if options.force || package.reason.is_some() {
                debug!(
                    package = %package.name,
                    reason = ?package.reason,
                    new_version = ?package.new_version.as_ref().map(ToString::to_string),
                    "selected for bump"
                );
                selected.push(package);
            }
        }
        Ok(selected)
    }

    fn detect(&self, package: &PackageBase, force: bool) -> Option<ReleaseType> {
        determine_release_type(
            &package.version,
            &package.commits,
            self.config.bump.release_type,
            self.config.bump.preid.as_deref(),
            &self.config.types,
            force,
        )
    }

    /// The repository-level package with its commits and next version.
    #[instrument(skip(self, options), fields(stage = %options.stage, force = options.force))]
    pub fn get_root_package(&self, options: &RootPackageOptions) -> RepoResult<RootPackage> {
        let manifest = read_manifest(&self.root)?
            .ok_or_else(|| RepoError::MissingRootManifest(self.root.clone()))?;
        let version = manifest
            .parsed_version(&self.root)?
            .ok_or_else(|| RepoError::MissingRootVersion(self.root.clone()))?;

        let (from, to) = match (&options.from, &options.to) {
            (Some(from), Some(to)) => (from.clone(), to.clone()),
            (from, to) => {
                let resolved = resolve_tags(
                    self.git,
                    self.config,
                    &TagQuery::root(options.stage, &version),
                )?;
                (
                    from.clone().unwrap_or_else(|| resolved.from.to_string()),
                    to.clone().unwrap_or(resolved.to),
                )
            }
        };

        let commits: Vec<GitCommit> = fetch_commits(self.git, Some(&from), &to, None)?
            .into_iter()
            .filter(|commit| is_allowed_commit(commit, &self.config.types))
            .collect();

        let bump = &self.config.bump;
        let release_type = determine_release_type(
            &version,
            &commits,
            bump.release_type,
            bump.preid.as_deref(),
            &self.config.types,
            options.force,
        );
        let new_version = release_type
            .map(|release_type| {
                package_new_version(&NewVersionRequest {
                    name: &manifest.name,
                    current: &version,
                    release_type,
                    preid: bump.preid.as_deref(),
                    suffix: options.suffix.as_deref(),
                })
            })
            .transpose()?;
        debug!(%from, %to, commits = commits.len(), ?release_type, "root package");

        Ok(RootPackage {
            name: manifest.name,
            path: self.root.clone(),
            version,
            new_version,
            commits,
            from_tag: Some(from),
            private: manifest.private,
            release_type,
        })
    }
}

/// Release type for a package bumped only because a dependency moved.
///
/// Never more than the smallest step: a patch on stable release lines, the
/// next prerelease on a prerelease, otherwise a prepatch.
pub fn dependency_release_type(
    configured: ReleaseType,
    preid: Option<&str>,
    current: &Version,
) -> ReleaseType {
    let stable_family = match configured {
        ReleaseType::Release => preid.is_none_or(str::is_empty),
        other => is_stable_release_type(other),
    };
    if stable_family {
        ReleaseType::Patch
    } else if is_prerelease(current) {
        ReleaseType::Prerelease
    } else {
        ReleaseType::Prepatch
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::git::testing::MemoryGit;

    struct Fixture {
        _tmp: TempDir,
        root: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
            Self { _tmp: tmp, root }
        }

        fn manifest(&self, dir: &str, json: &str) -> &Self {
            let path = if dir.is_empty() {
                self.root.clone()
            } else {
                self.root.join(dir)
            };
            std::fs::create_dir_all(&path).unwrap();
            std::fs::write(path.join("package.json"), json).unwrap();
            self
        }
    }

    fn monorepo_config(mode: VersionMode) -> Config {
        let mut config = Config::default();
        config.monorepo.version_mode = mode;
        config.monorepo.packages = vec!["packages/*".to_string()];
        config
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn two_package_fixture() -> Fixture {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0", "private": true}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0"}"#)
            .manifest(
                "packages/b",
                r#"{"name": "pkg-b", "version": "2.0.0", "dependencies": {"pkg-a": "workspace:*"}}"#,
            );
        fx
    }

    #[test]
    fn discovery_applies_filters() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "0.0.0"}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0"}"#)
            .manifest("packages/private", r#"{"name": "secret", "version": "1.0.0", "private": true}"#)
            .manifest("packages/ignored", r#"{"name": "docs", "version": "1.0.0"}"#)
            .manifest("packages/unversioned", r#"{"name": "draft"}"#);
        std::fs::create_dir_all(fx.root.join("packages/empty")).unwrap();
        std::fs::write(fx.root.join("packages/file.txt"), "not a dir").unwrap();

        let mut config = monorepo_config(VersionMode::Independent);
        config.monorepo.ignore_package_names = vec!["docs".to_string()];
        let git = MemoryGit::new();
        let packages = Workspace::new(&fx.root, &config, &git).discover_packages().unwrap();

        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pkg-a"]);
        assert!(packages.iter().all(|p| !p.private));
        assert_eq!(packages[0].relative_path, "packages/a");
        assert_eq!(packages[0].version, v("1.0.0"));
    }

    #[test]
    fn discovery_of_root_and_dependencies() {
        let fx = two_package_fixture();
        let mut config = monorepo_config(VersionMode::Selective);
        config.monorepo.packages = vec![".".to_string(), "packages/*".to_string()];
        let git = MemoryGit::new();
        let packages = Workspace::new(&fx.root, &config, &git).discover_packages().unwrap();

        // The private root is skipped.
        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pkg-a", "pkg-b"]);
        assert_eq!(packages[1].dependencies, vec!["pkg-a"]);
    }

    #[test]
    fn empty_match_is_empty_list() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0"}"#);
        let config = monorepo_config(VersionMode::Independent);
        let git = MemoryGit::new();
        let workspace = Workspace::new(&fx.root, &config, &git);
        assert!(workspace.discover_packages().unwrap().is_empty());
        assert!(workspace.get_packages(&BumpOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let fx = Fixture::new();
        let mut config = monorepo_config(VersionMode::Independent);
        config.monorepo.packages = vec!["packages/[".to_string()];
        let git = MemoryGit::new();
        let err = Workspace::new(&fx.root, &config, &git)
            .discover_packages()
            .unwrap_err();
        assert!(matches!(err, RepoError::Pattern { .. }));
    }

    #[test]
    fn independent_bump_with_dependent() {
        let fx = two_package_fixture();
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json", "packages/a/package.json", "packages/b/package.json"]);
        git.tag("pkg-a@1.0.0");
        git.tag("pkg-b@2.0.0");
        git.commit("feat(pkg-a): add widget", &["packages/a/src/widget.ts"]);
        git.commit("docs: root readme", &["README.md"]);

        let config = monorepo_config(VersionMode::Independent);
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions::default())
            .unwrap();

        assert_eq!(packages.len(), 2);
        let a = &packages[0];
        assert_eq!(a.name, "pkg-a");
        assert_eq!(a.new_version, Some(v("1.1.0")));
        assert_eq!(a.reason, Some(BumpReason::Commits));
        assert_eq!(a.from_tag.as_deref(), Some("pkg-a@1.0.0"));
        assert_eq!(a.commits.len(), 1);

        let b = &packages[1];
        assert_eq!(b.name, "pkg-b");
        assert_eq!(b.new_version, Some(v("2.0.1")));
        assert_eq!(b.reason, Some(BumpReason::Dependency));
        assert_eq!(b.dependency_chain, vec!["pkg-a"]);
        assert!(b.commits.is_empty());
    }

    #[test]
    fn nothing_to_release() {
        let fx = two_package_fixture();
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["packages/a/package.json", "packages/b/package.json"]);
        git.tag("pkg-a@1.0.0");
        git.tag("pkg-b@2.0.0");
        git.commit("chore(deps): bump lodash", &["packages/a/package.json"]);
        git.commit("ci: cache", &["packages/b/.github"]);

        let config = monorepo_config(VersionMode::Independent);
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions::default())
            .unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn force_bumps_everything() {
        let fx = two_package_fixture();
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["packages/a/package.json", "packages/b/package.json"]);
        git.tag("pkg-a@1.0.0");
        git.tag("pkg-b@2.0.0");

        let config = monorepo_config(VersionMode::Independent);
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions {
                force: true,
                suffix: None,
            })
            .unwrap();
        let versions: Vec<String> = packages
            .iter()
            .map(|p| format!("{}@{}", p.name, p.new_version.as_ref().unwrap()))
            .collect();
        assert_eq!(versions, vec!["pkg-a@1.0.1", "pkg-b@2.0.1"]);
        assert!(packages.iter().all(|p| p.reason.is_none()));
    }

    #[test]
    fn new_package_reads_from_its_first_commit() {
        let fx = two_package_fixture();
        fx.manifest("packages/c", r#"{"name": "pkg-c", "version": "0.1.0"}"#);
        let mut git = MemoryGit::new();
        git.commit("feat: ancient history", &["legacy/x.ts"]);
        git.commit("chore: init", &["packages/a/package.json", "packages/b/package.json"]);
        git.tag("pkg-a@1.0.0");
        git.tag("pkg-b@2.0.0");
        git.commit("feat(pkg-c): scaffold", &["packages/c/package.json"]);
        git.commit("fix(pkg-c): typo", &["packages/c/index.ts"]);

        let config = monorepo_config(VersionMode::Independent);
        let workspace = Workspace::new(&fx.root, &config, &git);
        let discovered = workspace.discover_packages().unwrap();
        let c = discovered.iter().find(|p| p.name == "pkg-c").unwrap();
        let collected = workspace.package_commits(c, &discovered, &v("1.0.0")).unwrap();

        assert!(matches!(collected.from, FromRef::NewPackage { .. }));
        assert_eq!(collected.commits.len(), 2);

        let packages = workspace.get_packages(&BumpOptions::default()).unwrap();
        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["pkg-c"]);
        assert_eq!(packages[0].new_version, Some(v("0.2.0")));
    }

    #[test]
    fn new_package_without_commits() {
        let fx = two_package_fixture();
        fx.manifest("packages/c", r#"{"name": "pkg-c", "version": "0.1.0"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["packages/a/package.json"]);

        let config = monorepo_config(VersionMode::Independent);
        let workspace = Workspace::new(&fx.root, &config, &git);
        let discovered = workspace.discover_packages().unwrap();
        let c = discovered.iter().find(|p| p.name == "pkg-c").unwrap();
        let collected = workspace.package_commits(c, &discovered, &v("1.0.0")).unwrap();
        assert!(collected.commits.is_empty());
    }

    #[test]
    fn unified_mode_shares_root_version() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0", "private": true}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0"}"#)
            .manifest("packages/b", r#"{"name": "pkg-b", "version": "1.0.0"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json"]);
        git.tag("v1.0.0");
        git.commit("feat: something", &["packages/b/x.ts"]);

        let config = monorepo_config(VersionMode::Unified);
        let workspace = Workspace::new(&fx.root, &config, &git);

        let root = workspace.get_root_package(&RootPackageOptions::default()).unwrap();
        assert_eq!(root.new_version, Some(v("1.1.0")));
        assert_eq!(root.from_tag.as_deref(), Some("v1.0.0"));

        let packages = workspace.get_packages(&BumpOptions::default()).unwrap();
        assert_eq!(packages.len(), 2);
        assert!(packages.iter().all(|p| p.new_version == Some(v("1.1.0"))));
        assert!(packages.iter().all(|p| p.reason == Some(BumpReason::Commits)));
    }

    #[test]
    fn unified_mode_without_commits() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0"}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json"]);
        git.tag("v1.0.0");

        let config = monorepo_config(VersionMode::Unified);
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions::default())
            .unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn standalone_root_package() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "solo", "version": "1.0.0"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json"]);
        git.tag("v1.0.0");
        git.commit("feat: new thing", &["src/thing.ts"]);

        let config = Config::default();
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions::default())
            .unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "solo");
        assert!(packages[0].is_root());
        assert_eq!(packages[0].new_version, Some(v("1.1.0")));
        assert_eq!(packages[0].from_tag.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn selective_mode_uses_repo_tags_per_package() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0", "private": true}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0"}"#)
            .manifest("packages/b", r#"{"name": "pkg-b", "version": "1.0.0"}"#)
            .manifest(
                "packages/c",
                r#"{"name": "pkg-c", "version": "1.0.0", "dependencies": {"pkg-b": "^1"}}"#,
            );
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json"]);
        git.tag("v1.0.0");
        git.commit("fix: b bug", &["packages/b/index.ts"]);

        let config = monorepo_config(VersionMode::Selective);
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions::default())
            .unwrap();
        let summary: Vec<(String, String, Option<BumpReason>)> = packages
            .iter()
            .map(|p| (p.name.clone(), p.new_version.as_ref().unwrap().to_string(), p.reason))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("pkg-b".to_string(), "1.0.1".to_string(), Some(BumpReason::Commits)),
                ("pkg-c".to_string(), "1.0.1".to_string(), Some(BumpReason::Dependency)),
            ]
        );
        assert!(packages.iter().all(|p| p.from_tag.as_deref() == Some("v1.0.0")));
    }

    #[test]
    fn graduation_reason_for_prerelease_packages() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0-beta.2", "private": true}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0-beta.2"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json"]);
        git.tag("pkg-a@1.0.0-beta.2");

        let mut config = monorepo_config(VersionMode::Independent);
        config.bump.release_type = ReleaseType::Major;
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions::default())
            .unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].reason, Some(BumpReason::Graduation));
        assert_eq!(packages[0].new_version, Some(v("1.0.0")));
    }

    #[test]
    fn forced_preid_change_is_a_graduation() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0", "private": true}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0-alpha.1"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json", "packages/a/package.json"]);
        git.tag("pkg-a@1.0.0-alpha.1");

        let mut config = monorepo_config(VersionMode::Independent);
        config.bump.preid = Some("beta".to_string());
        let workspace = Workspace::new(&fx.root, &config, &git);

        assert!(workspace.get_packages(&BumpOptions::default()).unwrap().is_empty());

        let forced = BumpOptions {
            force: true,
            ..BumpOptions::default()
        };
        let packages = workspace.get_packages(&forced).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].reason, Some(BumpReason::Graduation));
        assert_eq!(packages[0].release_type, Some(ReleaseType::Prerelease));
        assert_eq!(packages[0].new_version, Some(v("1.0.0-beta.0")));
    }

    #[test]
    fn preid_change_keeps_commit_and_dependency_reasons() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0", "private": true}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0-alpha.1"}"#)
            .manifest(
                "packages/b",
                r#"{"name": "pkg-b", "version": "1.0.0-alpha.1", "dependencies": {"pkg-a": "workspace:*"}}"#,
            );
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json"]);
        git.tag("pkg-a@1.0.0-alpha.1");
        git.tag("pkg-b@1.0.0-alpha.1");
        git.commit("fix: a bug", &["packages/a/index.ts"]);

        let mut config = monorepo_config(VersionMode::Independent);
        config.bump.preid = Some("beta".to_string());
        let packages = Workspace::new(&fx.root, &config, &git)
            .get_packages(&BumpOptions::default())
            .unwrap();

        let summary: Vec<(&str, Option<BumpReason>, String)> = packages
            .iter()
            .map(|p| (p.name.as_str(), p.reason, p.new_version.as_ref().unwrap().to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("pkg-a", Some(BumpReason::Commits), "1.0.0-beta.0".to_string()),
                ("pkg-b", Some(BumpReason::Dependency), "1.0.0-beta.0".to_string()),
            ]
        );
    }

    #[test]
    fn unified_preid_change_reasons() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "root", "version": "1.0.0-alpha.1", "private": true}"#)
            .manifest("packages/a", r#"{"name": "pkg-a", "version": "1.0.0-alpha.1"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore(release): v1.0.0-alpha.1", &["package.json"]);
        git.tag("v1.0.0-alpha.1");

        let mut config = monorepo_config(VersionMode::Unified);
        config.bump.preid = Some("beta".to_string());
        let forced = BumpOptions {
            force: true,
            ..BumpOptions::default()
        };

        let packages = Workspace::new(&fx.root, &config, &git).get_packages(&forced).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].reason, Some(BumpReason::Graduation));
        assert_eq!(packages[0].new_version, Some(v("1.0.0-beta.0")));

        git.commit("feat: more", &["packages/a/index.ts"]);
        let packages = Workspace::new(&fx.root, &config, &git).get_packages(&forced).unwrap();
        assert_eq!(packages[0].reason, Some(BumpReason::Commits));
        assert_eq!(packages[0].new_version, Some(v("1.0.0-beta.0")));
    }

    #[test]
    fn root_package_range_overrides() {
        let fx = Fixture::new();
        fx.manifest("", r#"{"name": "solo", "version": "1.1.0"}"#);
        let mut git = MemoryGit::new();
        git.commit("chore: init", &["package.json"]);
        git.tag("v1.0.0");
        let middle = git.commit("fix: one", &["a.ts"]);
        git.tag("v1.1.0");
        git.commit("feat: two", &["b.ts"]);

        let config = Config::default();
        let workspace = Workspace::new(&fx.root, &config, &git);
        let root = workspace
            .get_root_package(&RootPackageOptions {
                from: Some("v1.0.0".to_string()),
                to: Some(middle),
                ..RootPackageOptions::default()
            })
            .unwrap();
        assert_eq!(root.commits.len(), 1);
        assert_eq!(root.release_type, Some(ReleaseType::Patch));
        assert_eq!(root.new_version, Some(v("1.1.1")));
    }

    #[test]
    fn root_package_requires_manifest() {
        let fx = Fixture::new();
        let config = Config::default();
        let git = MemoryGit::new();
        let err = Workspace::new(&fx.root, &config, &git)
            .get_root_package(&RootPackageOptions::default())
            .unwrap_err();
        assert!(matches!(err, RepoError::MissingRootManifest(_)));
    }

    #[test]
    fn dependency_bumps_are_minimal() {
        assert_eq!(
            dependency_release_type(ReleaseType::Release, None, &v("1.0.0")),
            ReleaseType::Patch
        );
        assert_eq!(
            dependency_release_type(ReleaseType::Major, None, &v("1.0.0")),
            ReleaseType::Patch
        );
        assert_eq!(
            dependency_release_type(ReleaseType::Prerelease, Some("beta"), &v("1.0.0-beta.1")),
            ReleaseType::Prerelease
        );
        assert_eq!(
            dependency_release_type(ReleaseType::Release, Some("beta"), &v("1.0.0")),
            ReleaseType::Prepatch
        );
    }
}
