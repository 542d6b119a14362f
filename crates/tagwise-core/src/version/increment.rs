//! Applying a release type to a version.

use semver::{BuildMetadata, Prerelease, Version};
use tracing::{debug, instrument};

use super::{ReleaseType, VersionError, VersionResult, prerelease_from};

/// Inputs for [`package_new_version`].
#[derive(Debug, Clone)]
pub struct NewVersionRequest<'a> {
    /// Package name, for diagnostics.
    pub name: &'a str,
    /// Version before the bump.
    pub current: &'a Version,
    /// Resolved release type (never [`ReleaseType::Release`]).
    pub release_type: ReleaseType,
    /// Prerelease identifier, e.g. `beta`.
    pub preid: Option<&'a str>,
    /// Replaces the trailing prerelease identifier, e.g. `rc` turns
    /// `1.0.0-beta.0` into `1.0.0-beta.rc`.
    pub suffix: Option<&'a str>,
}

/// Compute a package's next version.
///
/// Fails with [`VersionError::NotGreater`] rather than hand back a version
/// that isn't strictly greater than the current one.
#[instrument(skip(request), fields(name = request.name, current = %request.current, release_type = %request.release_type))]
pub fn package_new_version(request: &NewVersionRequest<'_>) -> VersionResult<Version> {
    let mut next = increment(request.current, request.release_type, request.preid)?;

    if let Some(suffix) = request.suffix.filter(|s| !s.is_empty()) {
        next.pre = apply_suffix(&next.pre, suffix)?;
    }

    if next <= *request.current {
        return Err(VersionError::NotGreater {
            current: request.current.clone(),
            next,
        });
    }

    debug!(%next, "computed new version");
    Ok(next)
}

/// Apply a concrete release type to `current`.
///
/// Follows the usual npm semantics: a prerelease graduates to its own stable
/// version when the bump level allows it (`1.0.0-beta.1` + major = `1.0.0`),
/// and `prerelease` keeps counting on the current track.
pub fn increment(
    current: &Version,
    release_type: ReleaseType,
    preid: Option<&str>,
) -> VersionResult<Version> {
    let mut next = current.clone();
    next.build = BuildMetadata::EMPTY;
    let has_pre = !current.pre.is_empty();

    match release_type {
        ReleaseType::Release => return Err(VersionError::UnresolvedReleaseType),
        ReleaseType::Major => {
            if current.minor != 0 || current.patch != 0 || !has_pre {
                next.major = bump(current.major, current)?;
            }
            next.minor = 0;
            next.patch = 0;
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Minor => {
            if current.patch != 0 || !has_pre {
                next.minor = bump(current.minor, current)?;
            }
            next.patch = 0;
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Patch => {
            if !has_pre {
                next.patch = bump(current.patch, current)?;
            }
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Premajor => {
            next.major = bump(current.major, current)?;
            next.minor = 0;
            next.patch = 0;
            next.pre = first_prerelease(preid)?;
        }
        ReleaseType::Preminor => {
            next.minor = bump(current.minor, current)?;
            next.patch = 0;
            next.pre = first_prerelease(preid)?;
        }
        ReleaseType::Prepatch => {
            next.patch = bump(current.patch, current)?;
            next.pre = first_prerelease(preid)?;
        }
        ReleaseType::Prerelease => {
            if has_pre {
                next.pre = next_prerelease(&current.pre, preid)?;
            } else {
                next.patch = bump(current.patch, current)?;
                next.pre = first_prerelease(preid)?;
            }
        }
    }

    Ok(next)
}

/// `n + 1` for a version component, refusing to wrap.
fn bump(n: u64, current: &Version) -> VersionResult<u64> {
    n.checked_add(1)
        .ok_or_else(|| VersionError::Overflow(current.to_string()))
}

/// `preid.0`, or plain `0` without an identifier.
fn first_prerelease(preid: Option<&str>) -> VersionResult<Prerelease> {
    let identifiers: Vec<String> = match preid.filter(|p| !p.is_empty()) {
        Some(preid) => vec![preid.to_string(), "0".to_string()],
        None => vec!["0".to_string()],
    };
    prerelease_from(&identifiers)
}

/// Next prerelease on an existing prerelease version.
fn next_prerelease(pre: &Prerelease, preid: Option<&str>) -> VersionResult<Prerelease> {
    let mut identifiers: Vec<String> = pre.as_str().split('.').map(ToString::to_string).collect();

    if let Some(preid) = preid.filter(|p| !p.is_empty())
        && identifiers.first().map(String::as_str) != Some(preid)
    {
        return first_prerelease(Some(preid));
    }

    match identifiers
        .iter()
        .rposition(|id| id.parse::<u64>().is_ok())
    {
        Some(idx) => {
            let n: u64 = identifiers[idx].parse().unwrap_or_default();
            let next = n
                .checked_add(1)
                .ok_or_else(|| VersionError::Overflow(pre.to_string()))?;
            identifiers[idx] = next.to_string();
        }
        None => identifiers.push("0".to_string()),
    }

    prerelease_from(&identifiers)
}

/// Replace the trailing identifier (`beta.0` -> `beta.rc`), or append when
/// there is only one.
fn apply_suffix(pre: &Prerelease, suffix: &str) -> VersionResult<Prerelease> {
    if pre.is_empty() {
        return Ok(pre.clone());
    }
    let mut identifiers: Vec<String> = pre.as_str().split('.').map(ToString::to_string).collect();
    if identifiers.len() >= 2 {
        if let Some(last) = identifiers.last_mut() {
            *last = suffix.to_string();
        }
    } else {
        identifiers.push(suffix.to_string());
    }
    prerelease_from(&identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn inc(current: &str, release_type: ReleaseType, preid: Option<&str>) -> String {
        increment(&v(current), release_type, preid)
            .unwrap()
            .to_string()
    }

    #[test]
    fn stable_bumps() {
        assert_eq!(inc("1.2.3", ReleaseType::Patch, None), "1.2.4");
        assert_eq!(inc("1.2.3", ReleaseType::Minor, None), "1.3.0");
        assert_eq!(inc("1.2.3", ReleaseType::Major, None), "2.0.0");
    }

    #[test]
    fn stable_bumps_graduate_prereleases() {
        assert_eq!(inc("1.0.0-beta.1", ReleaseType::Major, None), "1.0.0");
        assert_eq!(inc("1.1.0-beta.1", ReleaseType::Major, None), "2.0.0");
        assert_eq!(inc("1.2.0-beta.1", ReleaseType::Minor, None), "1.2.0");
        assert_eq!(inc("1.2.1-beta.1", ReleaseType::Minor, None), "1.3.0");
        assert_eq!(inc("1.2.3-beta.1", ReleaseType::Patch, None), "1.2.3");
    }

    #[test]
    fn pre_bumps() {
        assert_eq!(inc("1.2.3", ReleaseType::Premajor, Some("beta")), "2.0.0-beta.0");
        assert_eq!(inc("1.2.3", ReleaseType::Preminor, Some("beta")), "1.3.0-beta.0");
        assert_eq!(inc("1.2.3", ReleaseType::Prepatch, Some("alpha")), "1.2.4-alpha.0");
        assert_eq!(inc("1.2.3", ReleaseType::Prepatch, None), "1.2.4-0");
    }

    #[test]
    fn prerelease_counts_on_track() {
        assert_eq!(inc("1.0.0-beta.0", ReleaseType::Prerelease, Some("beta")), "1.0.0-beta.1");
        assert_eq!(inc("1.0.0-beta.0", ReleaseType::Prerelease, None), "1.0.0-beta.1");
        assert_eq!(inc("1.0.0-beta", ReleaseType::Prerelease, None), "1.0.0-beta.0");
        assert_eq!(inc("1.0.0", ReleaseType::Prerelease, Some("rc")), "1.0.1-rc.0");
    }

    #[test]
    fn prerelease_switches_track() {
        assert_eq!(inc("1.0.0-alpha.3", ReleaseType::Prerelease, Some("beta")), "1.0.0-beta.0");
    }

    #[test]
    fn counters_at_the_limit_are_an_error() {
        let max = u64::MAX;
        for (current, release_type) in [
            (format!("1.0.0-beta.{max}"), ReleaseType::Prerelease),
            (format!("1.0.{max}"), ReleaseType::Patch),
            (format!("1.{max}.0"), ReleaseType::Preminor),
            (format!("{max}.0.0"), ReleaseType::Major),
        ] {
            let result = increment(&v(&current), release_type, Some("beta"));
            assert!(
                matches!(result, Err(VersionError::Overflow(_))),
                "{current} {release_type}: {result:?}"
            );
        }
    }

    #[test]
    fn release_is_not_applicable() {
        assert!(matches!(
            increment(&v("1.0.0"), ReleaseType::Release, None),
            Err(VersionError::UnresolvedReleaseType)
        ));
    }

    #[test]
    fn build_metadata_is_dropped() {
        assert_eq!(inc("1.0.0+abc", ReleaseType::Patch, None), "1.0.1");
    }

    #[test]
    fn suffix_replaces_trailing_identifier() {
        let current = v("0.9.0");
        let next = package_new_version(&NewVersionRequest {
            name: "pkg",
            current: &current,
            release_type: ReleaseType::Premajor,
            preid: Some("beta"),
            suffix: Some("rc"),
        })
        .unwrap();
        assert_eq!(next.to_string(), "1.0.0-beta.rc");
    }

    #[test]
    fn suffix_ignored_for_stable_result() {
        let current = v("1.0.0");
        let next = package_new_version(&NewVersionRequest {
            name: "pkg",
            current: &current,
            release_type: ReleaseType::Minor,
            preid: None,
            suffix: Some("rc"),
        })
        .unwrap();
        assert_eq!(next.to_string(), "1.1.0");
    }

    #[test]
    fn downgrade_is_refused() {
        // Switching from the rc track back to beta lands below the current version.
        let current = v("1.0.0-rc.1");
        let err = package_new_version(&NewVersionRequest {
            name: "pkg",
            current: &current,
            release_type: ReleaseType::Prerelease,
            preid: Some("beta"),
            suffix: None,
        })
        .unwrap_err();
        assert!(matches!(err, VersionError::NotGreater { .. }));
    }
}
