//! Info command: show tool and configuration information.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use tagwise_core::config::{self, Config, VersionMode};
use tagwise_core::version::ReleaseType;

use super::Output;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_config_dir: Option<String>,
    log_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    version_mode: VersionMode,
    packages: &'a [String],
    release_type: ReleaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    preid: Option<&'a str>,
    tag_template: &'a str,
    hooks: Vec<&'a str>,
}

impl<'a> ConfigInfo<'a> {
    fn from_config(config: &'a Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            user_config_dir: config::user_config_dir().map(|p| p.to_string()),
            log_level: config.log_level.as_str(),
            log_dir: config.log_dir.as_ref().map(ToString::to_string),
            version_mode: config.monorepo.version_mode,
            packages: &config.monorepo.packages,
            release_type: config.bump.release_type,
            preid: config.bump.preid.as_deref(),
            tag_template: &config.templates.tag_body,
            hooks: config.hooks.keys().map(String::as_str).collect(),
        }
    }
}

#[derive(Serialize)]
struct FullInfo<'a> {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo<'a>,
}

/// Print tool and configuration information.
#[instrument(name = "cmd_info", skip_all, fields(json_output = output.json))]
pub fn cmd_info(
    _args: InfoArgs,
    output: Output,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!("executing info command");

    let info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
    };

    if output.json {
        return output.print_json(&info);
    }

    println!(
        "{} {}",
        info.package.name.bold(),
        info.package.version.green()
    );
    if !info.package.description.is_empty() {
        println!("{}", info.package.description);
    }
    if !info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), info.package.license);
    }

    let cfg = &info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    match cfg.config_file {
        Some(ref path) => println!("{}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("{}: {}", "Config file".dimmed(), "none found".yellow()),
    }
    if let Some(ref dir) = cfg.user_config_dir {
        println!("{}: {}", "User config dir".dimmed(), dir);
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(ref dir) = cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }

    println!();
    println!("{}", "Versioning".bold().underline());
    println!(
        "{}: {}",
        "Version mode".dimmed(),
        cfg.version_mode.to_string().cyan()
    );
    println!("{}: {}", "Packages".dimmed(), cfg.packages.join(", "));
    println!("{}: {}", "Release type".dimmed(), cfg.release_type);
    if let Some(preid) = cfg.preid {
        println!("{}: {}", "Prerelease id".dimmed(), preid);
    }
    println!("{}: {}", "Tag template".dimmed(), cfg.tag_template);
    if !cfg.hooks.is_empty() {
        println!("{}: {}", "Hooks".dimmed(), cfg.hooks.join(", "));
    }

    Ok(())
}
