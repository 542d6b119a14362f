//! Lifecycle hooks.
//!
//! A hook is an [`Action`] registered under a name such as `before:bump`,
//! `success:bump` or `error:bump`. Configuration can only provide shell
//! commands; callers embedding the library can also register callbacks.
//! Both kinds go through [`run_action`].
//!
//! Shell commands run with `sh -c` in the repository root and support two
//! placeholders: `{{newVersion}}` and `{{packages}}` (space-separated
//! names).

use std::collections::BTreeMap;
use std::fmt;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

/// Errors from hook execution.
#[derive(Error, Debug)]
pub enum HookError {
    /// A hook command exited with a non-zero status.
    #[error("hook '{hook}' failed: {command}")]
    CommandFailed {
        /// Hook name.
        hook: String,
        /// The command that failed.
        command: String,
        /// The exit code, if available.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// A callback reported failure.
    #[error("hook '{hook}' failed: {message}")]
    Callback {
        /// Hook name.
        hook: String,
        /// What went wrong.
        message: String,
    },

    /// Failed to spawn a hook command.
    #[error("failed to execute hook: {0}")]
    Exec(#[from] std::io::Error),
}

/// Result alias for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Callback signature for programmatic hooks.
pub type HookCallback = dyn Fn(&HookContext) -> HookResult<()> + Send + Sync;

/// Something to do when a hook fires.
#[derive(Clone)]
pub enum Action {
    /// Run a command through `sh -c`.
    Shell(String),
    /// Call a function.
    Callback(Arc<HookCallback>),
}

impl Action {
    /// Wrap a closure as an action.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&HookContext) -> HookResult<()> + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(command) => f.debug_tuple("Shell").field(command).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// What a hook knows about the run that fired it.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// Hook name, e.g. `before:bump`.
    pub hook: String,
    /// Version being released, when there is a single one.
    pub new_version: Option<String>,
    /// Names of the packages in the bump set.
    pub packages: Vec<String>,
}

/// Result of running a shell action.
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// The command after interpolation.
    pub command: String,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// How long it took.
    pub duration: Duration,
}

/// Actions keyed by hook name.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    actions: BTreeMap<String, Action>,
}

impl HookRegistry {
    /// Registry holding the shell commands from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            actions: config
                .hooks
                .iter()
                .map(|(name, command)| (name.clone(), Action::Shell(command.clone())))
                .collect(),
        }
    }

    /// Register (or replace) the action for `name`.
    pub fn register(&mut self, name: impl Into<String>, action: Action) {
        self.actions.insert(name.into(), action);
    }

    /// Action registered for `name`.
    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    /// Run the action for `context.hook`, if one is registered.
    pub fn run(&self, context: &HookContext, root: &Utf8Path) -> HookResult<Option<HookOutput>> {
        match self.get(&context.hook) {
            Some(action) => run_action(action, context, root),
            None => {
                debug!(hook = %context.hook, "no action registered");
                Ok(None)
            }
        }
    }
}

/// Run the configured hook `name`, if any.
pub fn run_hook(
    name: &str,
    config: &Config,
    context: &HookContext,
    root: &Utf8Path,
) -> HookResult<Option<HookOutput>> {
    let context = HookContext {
        hook: name.to_string(),
        ..context.clone()
    };
    HookRegistry::from_config(config).run(&context, root)
}

/// Execute one action. Callbacks produce no output.
#[instrument(skip(context, root), fields(hook = %context.hook))]
pub fn run_action(
    action: &Action,
    context: &HookContext,
    root: &Utf8Path,
) -> HookResult<Option<HookOutput>> {
    match action {
        Action::Shell(command) => run_shell(command, context, root).map(Some),
        Action::Callback(callback) => {
            debug!("running callback");
            callback(context)?;
            Ok(None)
        }
    }
}

fn run_shell(command: &str, context: &HookContext, root: &Utf8Path) -> HookResult<HookOutput> {
    let interpolated = interpolate(command, context);
    debug!(%interpolated, "running hook");

    let start = Instant::now();
    let output = Command::new("sh")
        .args(["-c", &interpolated])
        .current_dir(root.as_std_path())
        .env("TAGWISE_HOOK", &context.hook)
        .env(
            "TAGWISE_NEW_VERSION",
            context.new_version.as_deref().unwrap_or_default(),
        )
        .output()?;
    let duration = start.elapsed();

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if !output.status.success() {
        return Err(HookError::CommandFailed {
            hook: context.hook.clone(),
            command: interpolated,
            exit_code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(HookOutput {
        command: interpolated,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr,
        duration,
    })
}

/// Replace `{{newVersion}}` and `{{packages}}` in a command.
pub fn interpolate(command: &str, context: &HookContext) -> String {
    command
        .replace(
            "{{newVersion}}",
            context.new_version.as_deref().unwrap_or_default(),
        )
        .replace("{{packages}}", &context.packages.join(" "))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn context(hook: &str) -> HookContext {
        HookContext {
            hook: hook.to_string(),
            new_version: Some("1.2.3".to_string()),
            packages: vec!["pkg-a".to_string(), "pkg-b".to_string()],
        }
    }

    fn tmp_root() -> (tempfile::TempDir, camino::Utf8PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = camino::Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    #[test]
    fn interpolates_placeholders() {
        assert_eq!(
            interpolate("echo {{newVersion}} for {{packages}}", &context("x")),
            "echo 1.2.3 for pkg-a pkg-b"
        );
        assert_eq!(
            interpolate("echo {{newVersion}}", &HookContext::default()),
            "echo "
        );
    }

    #[test]
    fn shell_action_captures_output() {
        let (_tmp, root) = tmp_root();
        let output = run_action(
            &Action::Shell("echo v{{newVersion}} $TAGWISE_HOOK".to_string()),
            &context("before:bump"),
            &root,
        )
        .unwrap()
        .unwrap();
        assert_eq!(output.stdout.trim(), "v1.2.3 before:bump");
        assert_eq!(output.command, "echo v1.2.3 $TAGWISE_HOOK");
    }

    #[test]
    fn shell_action_failure() {
        let (_tmp, root) = tmp_root();
        let err = run_action(
            &Action::Shell("echo nope >&2; exit 3".to_string()),
            &context("before:bump"),
            &root,
        )
        .unwrap_err();
        match err {
            HookError::CommandFailed {
                hook,
                exit_code,
                stderr,
                ..
            } => {
                assert_eq!(hook, "before:bump");
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn callback_action_sees_context() {
        let (_tmp, root) = tmp_root();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let action = Action::callback(move |ctx| {
            sink.lock().unwrap().push(ctx.packages.join(","));
            Ok(())
        });
        assert!(run_action(&action, &context("success:bump"), &root).unwrap().is_none());
        assert_eq!(*seen.lock().unwrap(), vec!["pkg-a,pkg-b"]);
    }

    #[test]
    fn callback_errors_propagate() {
        let (_tmp, root) = tmp_root();
        let action = Action::callback(|ctx| {
            Err(HookError::Callback {
                hook: ctx.hook.clone(),
                message: "refused".to_string(),
            })
        });
        assert!(matches!(
            run_action(&action, &context("before:bump"), &root),
            Err(HookError::Callback { .. })
        ));
    }

    #[test]
    fn run_hook_uses_config() {
        let (_tmp, root) = tmp_root();
        let mut config = Config::default();
        config
            .hooks
            .insert("success:bump".to_string(), "echo done {{packages}}".to_string());

        let output = run_hook("success:bump", &config, &context("ignored"), &root)
            .unwrap()
            .unwrap();
        assert_eq!(output.stdout.trim(), "done pkg-a pkg-b");
        assert!(run_hook("error:bump", &config, &context("x"), &root).unwrap().is_none());
    }

    #[test]
    fn registry_callbacks_override_config() {
        let (_tmp, root) = tmp_root();
        let mut config = Config::default();
        config.hooks.insert("before:bump".to_string(), "exit 1".to_string());
        let mut registry = HookRegistry::from_config(&config);
        registry.register("before:bump", Action::callback(|_| Ok(())));
        assert!(registry.run(&context("before:bump"), &root).unwrap().is_none());
        assert!(format!("{:?}", registry.get("before:bump").unwrap()).contains("Callback"));
    }
}
