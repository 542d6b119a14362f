//! Git queries for release scoping.
//!
//! The core never talks to git directly. Everything it needs (the current
//! ref, recent tags, commit ranges) goes through the [`GitRepository`] trait,
//! so tag resolution and bump orchestration can run against an in-memory
//! history in tests.
//!
//! [`SystemGit`] is the real implementation. It shells out to `git` inside
//! the repository root, which means we inherit the user's configuration
//! (safe directories, replace refs, alternates) for free.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "log").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,

    /// The repository has no commits yet.
    #[error("repository has no commits")]
    NoCommits,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// A commit as read from `git log`, before conventional-commit parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCommit {
    /// Full commit hash.
    pub hash: String,
    /// Abbreviated commit hash.
    pub short_hash: String,
    /// Author name.
    pub author_name: String,
    /// Author email.
    pub author_email: String,
    /// Full commit message (subject, blank line, body).
    pub message: String,
    /// Paths touched by the commit, relative to the repository root.
    pub files: Vec<String>,
}

/// Read-only view of a git repository, as needed by version resolution.
///
/// All paths are relative to the repository root. An empty path means the
/// whole repository.
pub trait GitRepository {
    /// Current branch name, or `HEAD` when detached.
    fn current_ref(&self) -> GitResult<String>;

    /// Tags matching a `git tag --list` pattern, newest first by creation
    /// date, at most `limit` of them.
    fn recent_tags(&self, pattern: &str, limit: usize) -> GitResult<Vec<String>>;

    /// Hash of the repository's first (root) commit.
    fn first_commit(&self) -> GitResult<String>;

    /// Hash of the oldest commit that touched `path`, if any.
    fn first_commit_touching(&self, path: &Utf8Path) -> GitResult<Option<String>>;

    /// Parent of `commit`, or `None` for a root commit.
    fn parent_of(&self, commit: &str) -> GitResult<Option<String>>;

    /// Commits reachable from `to` but not from `from` (all history when
    /// `from` is `None`), optionally limited to `path`. Newest first.
    fn log(&self, from: Option<&str>, to: &str, path: Option<&Utf8Path>)
    -> GitResult<Vec<RawCommit>>;
}

/// [`GitRepository`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct SystemGit {
    root: Utf8PathBuf,
}

impl SystemGit {
    /// Open the repository rooted at `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the top-level directory of the repository containing `dir`.
    #[instrument(fields(%dir))]
    pub fn discover(dir: &Utf8Path) -> GitResult<Self> {
        let output = run_git(dir, &["rev-parse", "--show-toplevel"])?;
        let root = Utf8PathBuf::from(output.trim());
        debug!(%root, "repository root");
        Ok(Self::new(root))
    }

    /// The repository root directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> GitResult<String> {
        run_git(&self.root, args)
    }
}

impl GitRepository for SystemGit {
    #[instrument(skip(self))]
    fn current_ref(&self) -> GitResult<String> {
        let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = output.trim();
        let reference = if branch.is_empty() { "HEAD" } else { branch };
        debug!(%reference, "current ref");
        Ok(reference.to_string())
    }

    #[instrument(skip(self))]
    fn recent_tags(&self, pattern: &str, limit: usize) -> GitResult<Vec<String>> {
        let mut args = vec!["tag", "--list", "--sort=-creatordate"];
        if !pattern.is_empty() {
            args.push(pattern);
        }
        let output = self.git(&args)?;
        let tags: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(limit)
            .map(ToString::to_string)
            .collect();
        debug!(count = tags.len(), "listed tags");
        Ok(tags)
    }

    #[instrument(skip(self))]
    fn first_commit(&self) -> GitResult<String> {
        let output = self.git(&["rev-list", "--max-parents=0", "HEAD"])?;
        // Multiple roots are possible after merging unrelated histories;
        // rev-list prints the oldest last.
        let first = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .ok_or(GitError::NoCommits)?;
        debug!(%first, "first commit");
        Ok(first.to_string())
    }

    #[instrument(skip(self), fields(%path))]
    fn first_commit_touching(&self, path: &Utf8Path) -> GitResult<Option<String>> {
        let mut args = vec!["rev-list", "--reverse", "HEAD"];
        if !path.as_str().is_empty() {
            args.extend(["--", path.as_str()]);
        }
        let output = self.git(&args)?;
        let first = output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(ToString::to_string);
        debug!(?first, "first commit touching path");
        Ok(first)
    }

    #[instrument(skip(self))]
    fn parent_of(&self, commit: &str) -> GitResult<Option<String>> {
        let rev = format!("{commit}^");
        match self.git(&["rev-parse", "--verify", "--quiet", &rev]) {
            Ok(output) => Ok(Some(output.trim().to_string())),
            Err(GitError::Command { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(path = ?path))]
    fn log(
        &self,
        from: Option<&str>,
        to: &str,
        path: Option<&Utf8Path>,
    ) -> GitResult<Vec<RawCommit>> {
        let range = from.map_or_else(|| to.to_string(), |from| format!("{from}..{to}"));
        let mut args = vec!["log", LOG_FORMAT, "--name-only", range.as_str()];
        if let Some(path) = path.filter(|p| !p.as_str().is_empty()) {
            args.extend(["--", path.as_str()]);
        }
        let output = self.git(&args)?;
        let commits = parse_log_output(&output);
        debug!(%range, count = commits.len(), "read commits");
        Ok(commits)
    }
}

/// Record separator (0x1e) before each commit, unit separator (0x1f)
/// between fields. `--name-only` appends the file list after the last field.
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%h%x1f%an%x1f%ae%x1f%B%x1f";

/// Parse the output of `git log` run with [`LOG_FORMAT`] and `--name-only`.
fn parse_log_output(output: &str) -> Vec<RawCommit> {
    output
        .split('\x1e')
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut fields = record.splitn(6, '\x1f');
            let hash = fields.next()?.trim().to_string();
            let short_hash = fields.next()?.trim().to_string();
            let author_name = fields.next()?.to_string();
            let author_email = fields.next()?.to_string();
            let message = fields.next()?.trim_end().to_string();
            let files = fields
                .next()
                .unwrap_or_default()
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect();
            Some(RawCommit {
                hash,
                short_hash,
                author_name,
                author_email,
                message,
                files,
            })
        })
        .collect()
}

/// Run a git command in `dir` and return its stdout.
fn run_git(dir: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir.as_std_path())
        .output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScratchRepo;
    use super::*;

    #[test]
    fn parse_log_output_reads_fields_and_files() {
        let output = "\x1eabc123\x1fabc\x1fAda\x1fada@example.com\x1ffeat: add thing\n\nbody line\n\x1f\n\npackages/a/index.js\npackages/a/package.json\n\
                      \x1edef456\x1fdef\x1fBob\x1fbob@example.com\x1ffix: other\n\x1f\n\nREADME.md\n";
        let commits = parse_log_output(output);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "abc123");
        assert_eq!(commits[0].short_hash, "abc");
        assert_eq!(commits[0].author_name, "Ada");
        assert_eq!(commits[0].message, "feat: add thing\n\nbody line");
        assert_eq!(
            commits[0].files,
            vec!["packages/a/index.js", "packages/a/package.json"]
        );
        assert_eq!(commits[1].files, vec!["README.md"]);
    }

    #[test]
    fn parse_log_output_empty() {
        assert!(parse_log_output("").is_empty());
        assert!(parse_log_output("\n").is_empty());
    }

    #[test]
    fn git_error_on_bad_command() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        assert!(run_git(dir, &["not-a-real-subcommand"]).is_err());
    }

    #[test]
    fn system_git_reads_history() {
        let Some(mut repo) = ScratchRepo::init() else {
            return;
        };
        repo.write("package.json", r#"{"name":"root","version":"1.0.0"}"#);
        let first = repo.commit("chore: init");
        repo.tag("v1.0.0");
        repo.write("packages/a/index.js", "export {}\n");
        repo.commit("feat(a): add a");
        repo.tag("v1.1.0");

        let git = SystemGit::new(repo.path());
        assert_eq!(git.current_ref().unwrap(), "main");
        assert_eq!(git.first_commit().unwrap(), first);
        assert_eq!(git.recent_tags("v*", 50).unwrap(), vec!["v1.1.0", "v1.0.0"]);
        assert_eq!(git.recent_tags("v*", 1).unwrap(), vec!["v1.1.0"]);

        let commits = git.log(Some("v1.0.0"), "HEAD", None).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "feat(a): add a");
        assert_eq!(commits[0].files, vec!["packages/a/index.js"]);

        let all = git.log(None, "HEAD", None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn system_git_path_queries() {
        let Some(mut repo) = ScratchRepo::init() else {
            return;
        };
        repo.write("README.md", "hi\n");
        let root_commit = repo.commit("docs: readme");
        repo.write("packages/b/index.js", "1\n");
        let touching = repo.commit("feat(b): first b");

        let git = SystemGit::new(repo.path());
        let path = Utf8Path::new("packages/b");
        assert_eq!(git.first_commit_touching(path).unwrap(), Some(touching));
        assert_eq!(
            git.first_commit_touching(Utf8Path::new("packages/none"))
                .unwrap(),
            None
        );
        assert_eq!(
            git.parent_of(&root_commit).unwrap(),
            None,
            "root commit has no parent"
        );
        let head = repo.run(&["rev-parse", "HEAD"]).unwrap();
        assert_eq!(git.parent_of(head.trim()).unwrap(), Some(root_commit));

        let scoped = git.log(None, "HEAD", Some(path)).unwrap();
        assert_eq!(scoped.len(), 1);
    }
}
