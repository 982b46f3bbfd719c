//! Handlers behind the `run` and `check` subcommands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitStatus;
use tracing::{debug, info};

use crate::config::Config;
use crate::secrets::{
    load_secrets_with, redact_secret, MemoryEnvironment, ProcessEnvironment, SecretSource,
};

/// Load secrets into the process environment, then run `command` with the
/// inherited environment and return its exit code.
///
/// A fatal load returns an error before the command is started.
pub async fn run_command(config: &Config, command: &[String]) -> Result<i32> {
    let (program, args) = command.split_first().context("No command given")?;

    let outcome = load_secrets_with(config, &mut ProcessEnvironment::new())
        .await
        .context("Secrets bootstrap failed")?;
    info!("{outcome}");

    debug!(program = %program, "Starting command");
    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .with_context(|| format!("Failed to run '{program}'"))?;

    Ok(exit_code(status))
}

/// What `check` found, with every value redacted.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub enabled: bool,
    pub source: Option<SecretSource>,
    pub fallback_file: Option<PathBuf>,
    pub summary: String,
    pub secrets: BTreeMap<String, String>,
}

impl CheckReport {
    /// Human-readable form: the summary line, then one `KEY=redacted` per line.
    pub fn to_text(&self) -> String {
        let mut out = self.summary.clone();
        for (key, value) in &self.secrets {
            let _ = write!(out, "\n  {key}={value}");
        }
        out
    }
}

/// Load secrets into a scratch environment and describe the result. The
/// process environment is left alone; the fallback file is refreshed as on
/// any successful load.
pub async fn check_secrets(config: &Config) -> Result<CheckReport> {
    let mut env = MemoryEnvironment::new();
    let outcome = load_secrets_with(config, &mut env)
        .await
        .context("Secrets bootstrap failed")?;

    let secrets = outcome
        .keys()
        .iter()
        .map(|key| {
            let value = env.get(key).map(redact_secret).unwrap_or_default();
            (key.clone(), value)
        })
        .collect();

    Ok(CheckReport {
        enabled: config.is_enabled(),
        source: outcome.source(),
        fallback_file: config.fallback_file_path.clone(),
        summary: outcome.to_string(),
        secrets,
    })
}

/// Map a child's exit status to ours; signals become 128 + signal number.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::LoadOutcome;

    #[cfg(unix)]
    #[test]
    fn exit_code_passes_through_normal_exit() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_maps_signals() {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status of a process killed by SIGKILL / SIGTERM.
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
        assert_eq!(exit_code(ExitStatus::from_raw(15)), 143);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let err = run_command(&Config::default(), &[]).await.unwrap_err();
        assert!(err.to_string().contains("No command"));
    }

    #[tokio::test]
    async fn check_without_token_is_disabled() {
        let report = check_secrets(&Config::default()).await.unwrap();
        assert!(!report.enabled);
        assert!(report.source.is_none());
        assert!(report.secrets.is_empty());
        assert_eq!(report.to_text(), LoadOutcome::Disabled.to_string());
    }

    #[test]
    fn report_text_lists_redacted_values() {
        let report = CheckReport {
            enabled: true,
            source: Some(SecretSource::Remote),
            fallback_file: None,
            summary: "loaded 1 secret(s) from the secrets API".into(),
            secrets: BTreeMap::from([("API_KEY".to_string(), "sk…90".to_string())]),
        };
        assert_eq!(
            report.to_text(),
            "loaded 1 secret(s) from the secrets API\n  API_KEY=sk…90"
        );
    }
}
