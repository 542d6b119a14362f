//! Conventional commit parsing and filtering.
//!
//! Raw records from [`GitRepository::log`] become [`GitCommit`]s here. The
//! subject line follows `type(scope)!: description`; a `BREAKING CHANGE:`
//! footer also marks a commit as breaking. Commits that don't follow the
//! convention keep an empty type and never qualify for a release.

use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::CommitTypes;
use crate::git::{GitRepository, GitResult, RawCommit};

static SUBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[\w-]+)(?:\((?P<scope>[^)]*)\))?(?P<breaking>!)?: (?P<description>.+)$")
        .expect("subject pattern is valid")
});

static BREAKING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^BREAKING[ -]CHANGE:")
        .expect("breaking pattern is valid")
});

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#(?P<id>\d+)").expect("reference pattern is valid")
});

/// Commit author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// A parsed commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitCommit {
    /// Full hash.
    pub hash: String,
    /// Abbreviated hash.
    pub short_hash: String,
    /// Full message.
    pub message: String,
    /// Subject text after the `type(scope):` prefix, or the whole subject.
    pub description: String,
    /// Conventional type (`feat`, `fix`, ...); empty when not conventional.
    #[serde(rename = "type")]
    pub r#type: String,
    /// Conventional scope.
    pub scope: Option<String>,
    /// `!` marker or `BREAKING CHANGE:` footer present.
    pub is_breaking: bool,
    /// Message body (everything after the subject).
    pub body: String,
    /// Paths touched, relative to the repository root.
    pub files: Vec<String>,
    /// Issue or PR numbers mentioned as `#123`.
    pub references: Vec<String>,
    /// Who wrote it.
    pub author: Author,
}

/// Parse one raw record.
pub fn parse_commit(raw: RawCommit) -> GitCommit {
    let (subject, body) = raw
        .message
        .split_once('\n')
        .map_or((raw.message.as_str(), ""), |(subject, body)| {
            (subject, body.trim())
        });
    let subject = subject.trim();

    let (r#type, scope, bang, description) = match SUBJECT_RE.captures(subject) {
        Some(caps) => (
            caps["type"].to_string(),
            caps.name("scope")
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty()),
            caps.name("breaking").is_some(),
            caps["description"].trim().to_string(),
        ),
        None => (String::new(), None, false, subject.to_string()),
    };

    let mut references: Vec<String> = Vec::new();
    for caps in REFERENCE_RE.captures_iter(&raw.message) {
        let id = caps["id"].to_string();
        if !references.contains(&id) {
            references.push(id);
        }
    }

    GitCommit {
        is_breaking: bang || BREAKING_RE.is_match(body),
        body: body.to_string(),
        description,
        r#type,
        scope,
        references,
        author: Author {
            name: raw.author_name,
            email: raw.author_email,
        },
        hash: raw.hash,
        short_hash: raw.short_hash,
        files: raw.files,
        message: raw.message,
    }
}

/// Read and parse commits in `from..to`, optionally limited to `path`.
///
/// `from = None` reads the full history up to `to`.
#[instrument(skip(git), fields(path = ?path))]
pub fn fetch_commits(
    git: &dyn GitRepository,
    from: Option<&str>,
    to: &str,
    path: Option<&Utf8Path>,
) -> GitResult<Vec<GitCommit>> {
    let commits: Vec<GitCommit> = git
        .log(from, to, path)?
        .into_iter()
        .map(parse_commit)
        .collect();
    debug!(count = commits.len(), "parsed commits");
    Ok(commits)
}

/// Whether a commit counts toward a release at all.
///
/// Non-breaking `chore(deps)` and `chore(release)` commits are routine
/// noise. Beyond that, the type needs a configured rule.
pub fn is_allowed_commit(commit: &GitCommit, types: &CommitTypes) -> bool {
    if commit.r#type == "chore"
        && matches!(commit.scope.as_deref(), Some("deps" | "release"))
        && !commit.is_breaking
    {
        return false;
    }
    types.is_known(&commit.r#type)
}

/// Whether the commit touches anything under `relative_path`.
pub fn touches_path(commit: &GitCommit, relative_path: &Utf8Path) -> bool {
    let prefix = relative_path.as_str().trim_end_matches('/');
    if prefix.is_empty() || prefix == "." {
        return true;
    }
    commit.files.iter().any(|file| {
        file == prefix
            || file
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Whether a commit scope names one of `package_names`, either in full
/// (`@acme/ui`) or without its npm scope (`ui`).
pub fn is_scoped_to_any(commit: &GitCommit, package_names: &[&str]) -> bool {
    let Some(scope) = commit.scope.as_deref() else {
        return false;
    };
    package_names.iter().any(|name| {
        *name == scope || name.rsplit_once('/').is_some_and(|(_, short)| short == scope)
    })
}
