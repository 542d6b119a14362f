//! In-workspace dependency graph.
//!
//! The graph is never stored. Each [`PackageBase`] carries the names of the
//! workspace packages it depends on, and the functions here walk those
//! lists: expanding a changed set to everything that depends on it, and
//! ordering packages so dependencies come before dependents.
//!
//! Cycles are tolerated. They are reported with a warning and the offending
//! edge is skipped, so callers always get a usable order back.

use std::collections::{HashMap, HashSet, VecDeque};

use camino::Utf8Path;
use tracing::{debug, instrument, warn};

use crate::manifest::{DependencyType, ManifestResult, read_manifest};
use crate::package::{BumpReason, PackageBase};

/// Workspace dependencies declared in the manifest under `dir`.
///
/// Only names in `workspace_names` are kept, in manifest order, without
/// duplicates. A directory without a manifest has no dependencies.
#[instrument(skip(workspace_names), fields(%dir, ?dependency_types))]
pub fn package_dependencies(
    dir: &Utf8Path,
    workspace_names: &HashSet<String>,
    dependency_types: &[DependencyType],
) -> ManifestResult<Vec<String>> {
    let Some(manifest) = read_manifest(dir)? else {
        return Ok(Vec::new());
    };

    let mut seen = HashSet::new();
    let dependencies: Vec<String> = dependency_types
        .iter()
        .flat_map(|kind| manifest.dependencies_of(*kind).keys())
        .filter(|name| workspace_names.contains(name.as_str()))
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect();
    debug!(?dependencies, "workspace dependencies");
    Ok(dependencies)
}

/// Packages that list `package_name` as a dependency.
pub fn dependents_of<'a>(packages: &'a [PackageBase], package_name: &str) -> Vec<&'a PackageBase> {
    packages
        .iter()
        .filter(|pkg| pkg.dependencies.iter().any(|dep| dep == package_name))
        .collect()
}

/// Grow a changed set to include every transitive dependent.
///
/// Seeds come back with reason `commits`. Each package reached through the
/// graph gets reason `dependency` and a chain naming the packages that led
/// to it, innermost cause first. A package is added once; the first path
/// that reaches it wins. Seeds come first, then dependents in breadth-first
/// order.
#[instrument(skip_all, fields(seeds = packages_with_commits.len(), total = all_packages.len()))]
pub fn expand_packages_to_bump_with_dependents(
    all_packages: &[PackageBase],
    packages_with_commits: &[PackageBase],
) -> Vec<PackageBase> {
    let mut result: Vec<PackageBase> = Vec::with_capacity(all_packages.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for seed in packages_with_commits {
        if index.contains_key(&seed.name) {
            continue;
        }
        let mut seed = seed.clone();
        seed.reason = Some(BumpReason::Commits);
        index.insert(seed.name.clone(), result.len());
        queue.push_back(seed.name.clone());
        result.push(seed);
    }

    while let Some(name) = queue.pop_front() {
        let Some(&cause_idx) = index.get(&name) else {
            continue;
        };
        let mut chain = result[cause_idx].dependency_chain.clone();
        chain.push(name.clone());

        for dependent in dependents_of(all_packages, &name) {
            if index.contains_key(&dependent.name) {
                continue;
            }
            let mut dependent = dependent.clone();
            dependent.reason = Some(BumpReason::Dependency);
            dependent.dependency_chain = chain.clone();
            debug!(package = %dependent.name, ?chain, "bumped as dependent");

            index.insert(dependent.name.clone(), result.len());
            queue.push_back(dependent.name.clone());
            result.push(dependent);
        }
    }

    result
}

/// Order packages so every dependency precedes its dependents.
///
/// Depth-first, iterative, visiting packages in input order. Dependencies
/// outside `packages` are ignored. An edge that closes a cycle (including a
/// package depending on itself) is logged and skipped.
#[instrument(skip_all, fields(count = packages.len()))]
pub fn topological_sort(packages: &[PackageBase]) -> Vec<PackageBase> {
    let by_name: HashMap<&str, &PackageBase> =
        packages.iter().map(|pkg| (pkg.name.as_str(), pkg)).collect();

    let mut sorted: Vec<PackageBase> = Vec::with_capacity(packages.len());
    let mut visited: HashSet<&str> = HashSet::new();
    let mut visiting: HashSet<&str> = HashSet::new();
    // Each frame is a package and the index of the next dependency to look at.
    let mut stack: Vec<(&PackageBase, usize)> = Vec::new();

    for root in packages {
        if visited.contains(root.name.as_str()) {
            continue;
        }
        visiting.insert(root.name.as_str());
        stack.push((root, 0));

        while let Some((pkg, next)) = stack.last_mut() {
            let pkg: &PackageBase = pkg;
            let Some(dep_name) = pkg.dependencies.get(*next) else {
                visiting.remove(pkg.name.as_str());
                visited.insert(pkg.name.as_str());
                sorted.push(pkg.clone());
                stack.pop();
                continue;
            };
            *next += 1;

            let Some(&dep) = by_name.get(dep_name.as_str()) else {
                continue;
            };
            if visited.contains(dep.name.as_str()) {
                continue;
            }
            if visiting.contains(dep.name.as_str()) {
                let mut cycle: Vec<&str> = stack
                    .iter()
                    .map(|(p, _)| p.name.as_str())
                    .skip_while(|name| *name != dep.name)
                    .collect();
                cycle.push(dep.name.as_str());
                warn!(
                    cycle = %cycle.join(" -> "),
                    "Circular dependency detected: {}",
                    cycle.join(" -> ")
                );
                continue;
            }
            visiting.insert(dep.name.as_str());
            stack.push((dep, 0));
        }
    }

    sorted
}
