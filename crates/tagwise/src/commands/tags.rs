//! Tags command: show the `from..to` range a stage would use.

use anyhow::{Context, bail};
use camino::Utf8Path;
use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use tagwise_core::config::{Config, VersionMode};
use tagwise_core::repo::Workspace;
use tagwise_core::tags::{FromRef, TagQuery, TagStage, resolve_tags};
use tagwise_core::version::parse_version;

use super::Output;

/// Stage names accepted on the command line.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum StageArg {
    /// Computing version bumps.
    #[default]
    Bump,
    /// Rendering changelogs.
    Changelog,
    /// Publishing, after tagging.
    Publish,
    /// Creating a hosted release, after tagging.
    ProviderRelease,
}

impl From<StageArg> for TagStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Bump => Self::Bump,
            StageArg::Changelog => Self::Changelog,
            StageArg::Publish => Self::Publish,
            StageArg::ProviderRelease => Self::ProviderRelease,
        }
    }
}

/// Arguments for the `tags` subcommand.
#[derive(Args, Debug, Default)]
pub struct TagsArgs {
    /// Stage to resolve the range for
    #[arg(long, value_enum, default_value_t)]
    pub stage: StageArg,

    /// Resolve for this workspace package (independent mode)
    #[arg(long, short = 'p', value_name = "NAME")]
    pub package: Option<String>,

    /// Version being released; names the tag of publish stages
    #[arg(long, value_name = "VERSION")]
    pub new_version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagsReport<'a> {
    stage: TagStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    package: Option<&'a str>,
    from: &'a FromRef,
    to: &'a str,
}

/// Execute the tags command.
#[instrument(name = "cmd_tags", skip_all, fields(stage = ?args.stage, package = ?args.package))]
pub fn cmd_tags(
    args: TagsArgs,
    output: Output,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    let git = super::open_repository(cwd)?;
    let workspace = Workspace::new(git.root(), config, &git);
    let stage = TagStage::from(args.stage);

    let new_version = args
        .new_version
        .as_deref()
        .map(parse_version)
        .transpose()
        .context("invalid --new-version")?;

    let packages = match args.package {
        Some(_) => workspace.discover_packages()?,
        None => Vec::new(),
    };
    let package = match args.package.as_deref() {
        Some(name) => match packages.iter().find(|p| p.name == name) {
            Some(package) => Some(package),
            None => bail!("no workspace package named '{name}'"),
        },
        None => None,
    };

    // Independent packages are checked against their own version, so the
    // root manifest may be versionless.
    let root_version = match (config.monorepo.version_mode, package) {
        (VersionMode::Independent, Some(package)) => package.version.clone(),
        _ => workspace
            .root_version()
            .context("failed to read the root version")?,
    };

    let query = match package {
        Some(package) => TagQuery::package(stage, &package.name, &package.version, &root_version),
        None => TagQuery::root(stage, &root_version),
    }
    .with_new_version(new_version.as_ref());
    let resolved = resolve_tags(&git, config, &query).context("failed to resolve tags")?;
    debug!(from = %resolved.from, to = %resolved.to, "resolved");

    let report = TagsReport {
        stage,
        package: package.map(|p| p.name.as_str()),
        from: &resolved.from,
        to: &resolved.to,
    };
    if output.json {
        return output.print_json(&report);
    }

    println!(
        "{}: {} {}",
        "from".dimmed(),
        report.from.as_str().green(),
        format!("({})", kind(report.from)).dimmed()
    );
    println!("{}: {}", "to".dimmed(), report.to.green());
    Ok(())
}

const fn kind(from: &FromRef) -> &'static str {
    match from {
        FromRef::Tag(_) => "tag",
        FromRef::Commit(_) => "first commit",
        FromRef::Explicit(_) => "configured",
        FromRef::NewPackage { .. } => "new package",
    }
}
