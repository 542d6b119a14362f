//! Release type from conventional commits.

use semver::Version;
use tracing::{debug, instrument};

use super::{BumpLevel, ReleaseType, is_prerelease};
use crate::commits::GitCommit;
use crate::config::CommitTypes;

/// Determine the release type a set of commits calls for.
///
/// An explicit `release_type` (anything but [`ReleaseType::Release`]) wins
/// outright. Otherwise a breaking commit means major, and the highest
/// configured `type -> semver` mapping decides the rest. When nothing maps
/// to a bump the result is `None`, unless `force` is set, in which case a
/// patch is assumed.
///
/// With a `preid`, the detected level turns into its prerelease variant:
/// `prerelease` if `current` is already a prerelease, `pre<level>` if not.
#[instrument(skip(commits, types), fields(%current, %release_type, commits = commits.len()))]
pub fn determine_release_type(
    current: &Version,
    commits: &[GitCommit],
    release_type: ReleaseType,
    preid: Option<&str>,
    types: &CommitTypes,
    force: bool,
) -> Option<ReleaseType> {
    if release_type != ReleaseType::Release {
        debug!("explicit release type");
        return Some(release_type);
    }

    let level = commits
        .iter()
        .filter_map(|commit| {
            if commit.is_breaking {
                Some(BumpLevel::Major)
            } else {
                types.semver_for(&commit.r#type)
            }
        })
        .max();

    let level = match level {
        Some(level) => level,
        None if force => BumpLevel::Patch,
        None => {
            debug!("no commit warrants a release");
            return None;
        }
    };

    let resolved = match preid.filter(|p| !p.is_empty()) {
        None => ReleaseType::from(level),
        Some(_) if is_prerelease(current) => ReleaseType::Prerelease,
        Some(_) => match level {
            BumpLevel::Major => ReleaseType::Premajor,
            BumpLevel::Minor => ReleaseType::Preminor,
            BumpLevel::Patch => ReleaseType::Prepatch,
        },
    };
    debug!(%level, %resolved, "detected release type");
    Some(resolved)
}
