//! Bump command: plan the release, then write new versions to manifests.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use tagwise_core::config::{Config, VersionMode};
use tagwise_core::hooks::{HookContext, HookOutput, HookResult, run_hook};
use tagwise_core::manifest::{self, MANIFEST_FILE};
use tagwise_core::package::{BumpReason, PackageBase};
use tagwise_core::repo::{BumpOptions, Workspace};
use tagwise_core::semver::Version;
use tagwise_core::version::ReleaseType;

use super::Output;

/// Arguments for the `bump` subcommand.
#[derive(Args, Debug, Default)]
pub struct BumpArgs {
    /// Release type (release, major, minor, patch, premajor, preminor,
    /// prepatch, prerelease); `release` detects it from commits
    #[arg(long, short = 't', value_name = "TYPE")]
    pub release_type: Option<ReleaseType>,

    /// Prerelease identifier (e.g. "beta")
    #[arg(long, value_name = "ID")]
    pub preid: Option<String>,

    /// Replace the trailing prerelease identifier of new versions
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Bump every package, even without qualifying commits
    #[arg(long)]
    pub force: bool,

    /// Show the plan without writing anything or running hooks
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BumpReport<'a> {
    dry_run: bool,
    version_mode: VersionMode,
    packages: Vec<PlannedPackage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    written: Vec<Utf8PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlannedPackage<'a> {
    name: &'a str,
    path: &'a Utf8Path,
    version: String,
    new_version: Option<String>,
    release_type: Option<ReleaseType>,
    reason: Option<BumpReason>,
    from: Option<&'a str>,
    commits: usize,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    dependency_chain: &'a [String],
}

impl<'a> PlannedPackage<'a> {
    fn from_package(package: &'a PackageBase) -> Self {
        Self {
            name: &package.name,
            path: &package.relative_path,
            version: package.version.to_string(),
            new_version: package.new_version.as_ref().map(ToString::to_string),
            release_type: package.release_type,
            reason: package.reason,
            from: package.from_tag.as_deref(),
            commits: package.commits.len(),
            dependency_chain: &package.dependency_chain,
        }
    }
}

/// Execute the bump command.
#[instrument(name = "cmd_bump", skip_all, fields(dry_run = args.dry_run, force = args.force))]
pub fn cmd_bump(
    args: BumpArgs,
    output: Output,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(release_type) = args.release_type {
        config.bump.release_type = release_type;
    }
    if let Some(preid) = args.preid {
        config.bump.preid = Some(preid);
    }

    let git = super::open_repository(cwd)?;
    let workspace = Workspace::new(git.root(), &config, &git);
    let options = BumpOptions {
        suffix: args.suffix,
        force: args.force,
    };

    let spinner = output.spinner("Resolving packages...");
    let planned = workspace.get_packages(&options);
    spinner.finish_and_clear();

    let mut context = HookContext::default();
    let packages = match planned {
        Ok(packages) => packages,
        Err(err) => {
            if !args.dry_run {
                run_error_hook(&config, &context, workspace.root());
            }
            return Err(err).context("bump planning failed");
        }
    };
    context.new_version = shared_version(&packages).map(ToString::to_string);
    context.packages = packages.iter().map(|p| p.name.clone()).collect();

    let mut report = BumpReport {
        dry_run: args.dry_run,
        version_mode: config.monorepo.version_mode,
        packages: packages.iter().map(PlannedPackage::from_package).collect(),
        written: Vec::new(),
    };

    if packages.is_empty() || args.dry_run {
        return print_report(&report, output);
    }

    report_hook(run_hook("before:bump", &config, &context, workspace.root()))
        .context("before:bump hook failed")?;

    match write_versions(&workspace, &packages) {
        Ok(written) => report.written = written,
        Err(err) => {
            run_error_hook(&config, &context, workspace.root());
            return Err(err);
        }
    }

    report_hook(run_hook("success:bump", &config, &context, workspace.root()))
        .context("success:bump hook failed")?;

    info!(count = report.written.len(), "manifests updated");
    print_report(&report, output)
}

/// The version every bumped package moves to, when there is just one.
fn shared_version(packages: &[PackageBase]) -> Option<&Version> {
    let mut versions = packages.iter().filter_map(|p| p.new_version.as_ref());
    let first = versions.next()?;
    versions.all(|v| v == first).then_some(first)
}

/// Write each new version; unified releases also move the root manifest.
fn write_versions(workspace: &Workspace<'_>, packages: &[PackageBase]) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut written = Vec::new();
    for package in packages {
        let Some(new_version) = &package.new_version else {
            continue;
        };
        manifest::write_version(&package.path, new_version)
            .with_context(|| format!("failed to update {}", package.name))?;
        written.push(package.relative_path.join(MANIFEST_FILE));
    }

    let unified = workspace.config().monorepo.version_mode == VersionMode::Unified;
    if unified
        && !packages.iter().any(PackageBase::is_root)
        && let Some(new_version) = shared_version(packages)
        && manifest::read_manifest(workspace.root())?.is_some()
    {
        manifest::write_version(workspace.root(), new_version)
            .context("failed to update root package.json")?;
        written.push(Utf8PathBuf::from(MANIFEST_FILE));
    }

    Ok(written)
}

fn report_hook(result: HookResult<Option<HookOutput>>) -> anyhow::Result<()> {
    if let Some(output) = result? {
        debug!(
            command = %output.command,
            duration_ms = output.duration.as_millis() as u64,
            stdout = %output.stdout.trim(),
            "hook finished"
        );
    }
    Ok(())
}

fn run_error_hook(config: &Config, context: &HookContext, root: &Utf8Path) {
    if let Err(err) = run_hook("error:bump", config, context, root) {
        warn!(error = %err, "error:bump hook failed");
    }
}

fn print_report(report: &BumpReport<'_>, output: Output) -> anyhow::Result<()> {
    if output.json {
        return output.print_json(report);
    }

    if report.packages.is_empty() {
        println!("{}", "Nothing to release.".yellow());
        return Ok(());
    }

    println!(
        "{}: {}",
        "Version mode".dimmed(),
        report.version_mode.to_string().cyan()
    );
    let width = report.packages.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for package in &report.packages {
        let next = package.new_version.as_deref().unwrap_or("-");
        let why = match (package.reason, package.dependency_chain.first()) {
            (Some(BumpReason::Dependency), Some(cause)) => format!("dependency of {cause}"),
            (Some(BumpReason::Commits), _) => format!("{} commits", package.commits),
            (Some(reason), _) => reason.to_string(),
            (None, _) => "forced".to_string(),
        };
        println!(
            "  {:width$}  {} → {}  {}",
            package.name.bold(),
            package.version.dimmed(),
            next.green().bold(),
            format!("({why})").dimmed(),
        );
    }

    if report.dry_run {
        println!();
        println!("{}", "Dry run, nothing written.".yellow());
    }
    for path in &report.written {
        println!("  {} {}", "✓".green(), path.as_str().cyan());
    }
    Ok(())
}
