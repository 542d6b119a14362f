//! Core library for tagwise.
//!
//! Resolves what a JavaScript/TypeScript release should look like: which
//! packages change, what versions they move to, and which git refs bound
//! each package's changes. Nothing here publishes or tags; callers decide
//! what to do with the plan.
//!
//! # Modules
//!
//! - [`version`] - Version arithmetic and release type selection
//! - [`tags`] - `from`/`to` ref resolution per stage and version mode
//! - [`dependencies`] - Workspace dependency graph and ordering
//! - [`repo`] - Package discovery and bump orchestration
//! - [`commits`] - Conventional commit parsing
//! - [`manifest`] - `package.json` reading and version writing
//! - [`git`] - Git queries behind a trait
//! - [`hooks`] - Lifecycle hook actions
//! - [`config`] - Configuration loading and management
//! - [`error`] - Configuration error types
//!
//! # Quick Start
//!
//! ```no_run
//! use tagwise_core::git::SystemGit;
//! use tagwise_core::repo::{BumpOptions, Workspace};
//! use tagwise_core::{Config, ConfigLoader};
//!
//! let config: Config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//! let git = SystemGit::discover(camino::Utf8Path::new(".")).expect("not a git repository");
//! let workspace = Workspace::new(git.root(), &config, &git);
//!
//! for pkg in workspace.get_packages(&BumpOptions::default()).expect("planning failed") {
//!     println!("{} {:?}", pkg.name, pkg.new_version);
//! }
//! ```
#![deny(unsafe_code)]

pub mod commits;

pub mod config;

pub mod dependencies;

pub mod error;

pub mod git;

pub mod hooks;

pub mod manifest;

pub mod package;

pub mod repo;

pub mod tags;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
