//! One-shot collection runner
//!
//! Entry point for `seatkit-collect`: opens a session through a
//! [`SessionManager`], collects its parameters once, and prints them.

use std::future::Future;
use std::io::Write;

use tokio::sync::oneshot;

use crate::cli::Cli;
use crate::session::{OpenSessionRequest, SessionManager};
use crate::telemetry::{self, ResultTraceExt};
use crate::types::{ParameterSet, Result, SeatError};

/// Result of a single collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Helper succeeded; discovered parameters merged with overrides
    Collected(ParameterSet),
    /// Helper exited unsuccessfully
    HelperFailed,
    /// Shutdown was requested before the helper finished
    Cancelled,
}

impl CollectOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Collected(_) => 0,
            Self::HelperFailed => 1,
            Self::Cancelled => 130,
        }
    }
}

/// Open a session, collect its parameters once, and close it again
///
/// If `shutdown` resolves first, the collection is cancelled and the helper
/// reaped before returning.
#[tracing::instrument(name = "collect_once", skip_all, fields(uid = request.uid, pid = request.pid))]
pub async fn collect_once(
    manager: &SessionManager,
    request: OpenSessionRequest,
    shutdown: impl Future<Output = ()>,
) -> Result<CollectOutcome> {
    let leader = manager.open_session(request)?;
    let cookie = leader
        .cookie()
        .ok_or_else(|| SeatError::internal("session leader has no cookie"))?;

    let (tx, rx) = oneshot::channel();
    let started = leader.collect_parameters(
        |leader, parameters, tx: oneshot::Sender<Option<ParameterSet>>| {
            tracing::debug!(
                session_id = ?leader.session_id(),
                collected = parameters.is_some(),
                "Collection finished"
            );
            drop(tx.send(parameters));
        },
        tx,
    );

    if !started {
        manager.close_session(&cookie).await?;
        return Err(SeatError::spawn(
            manager.config().helper.clone(),
            std::io::Error::other("helper could not be started"),
        ));
    }

    let outcome = tokio::select! {
        result = rx => match result {
            Ok(Some(parameters)) => CollectOutcome::Collected(parameters),
            Ok(None) => CollectOutcome::HelperFailed,
            Err(_) => return Err(SeatError::internal("collection callback dropped")),
        },
        () = shutdown => {
            tracing::info!("Shutdown requested, cancelling collection");
            CollectOutcome::Cancelled
        }
    };

    manager.close_session(&cookie).await?;
    Ok(outcome)
}

/// Write the outcome to `out` as `key = value` lines or JSON
pub fn write_outcome(out: &mut impl Write, outcome: &CollectOutcome, json: bool) -> Result<()> {
    let CollectOutcome::Collected(parameters) = outcome else {
        return Ok(());
    };

    if json {
        let text = serde_json::to_string_pretty(parameters).trace_context()?;
        writeln!(out, "{text}")?;
    } else {
        for parameter in parameters {
            writeln!(out, "{parameter}")?;
        }
    }
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Run the collector with CLI arguments
///
/// Initializes logging, collects once, and prints the result to stdout.
pub async fn run_collect_with_cli(cli: &Cli) -> anyhow::Result<CollectOutcome> {
    telemetry::init_logging(cli)?;

    tracing::info!(
        version = %env!("CARGO_PKG_VERSION"),
        helper = %cli.helper,
        "Collecting session parameters"
    );

    let manager = SessionManager::new(cli.collector_config());
    let request = OpenSessionRequest {
        uid: cli.uid,
        pid: cli.pid,
        service_name: cli.service.clone(),
        parameters: cli.overrides.clone(),
    };

    let outcome = collect_once(&manager, request, shutdown_signal()).await?;
    write_outcome(&mut std::io::stdout().lock(), &outcome, cli.json)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::argv;
    use crate::types::{CollectorConfig, Parameter};
    use tempfile::TempDir;

    fn manager_with_helper(dir: &TempDir, body: &str) -> SessionManager {
        let script = dir.path().join("helper.sh");
        std::fs::write(&script, body).unwrap();
        let helper = format!("/bin/sh {}", argv::quote(&script.display().to_string()));
        SessionManager::new(CollectorConfig::new(helper))
    }

    fn request() -> OpenSessionRequest {
        OpenSessionRequest {
            uid: 1000,
            pid: 4242,
            service_name: Some("login".to_string()),
            parameters: vec![Parameter::string("seat", "seat0")],
        }
    }

    #[tokio::test]
    async fn test_collect_once_success() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_helper(&dir, "echo 'unix-user = 1000'\necho 'is-local = true'\n");

        let outcome = collect_once(&manager, request(), std::future::pending())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CollectOutcome::Collected(
                vec![
                    Parameter::int32("unix-user", 1000),
                    Parameter::boolean("is-local", true),
                    Parameter::string("seat", "seat0"),
                ]
                .into()
            )
        );
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_collect_once_helper_failure() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_helper(&dir, "exit 3\n");

        let outcome = collect_once(&manager, request(), std::future::pending())
            .await
            .unwrap();
        assert_eq!(outcome, CollectOutcome::HelperFailed);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_collect_once_shutdown_cancels() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with_helper(&dir, "exec sleep 30\n");

        let shutdown = tokio::time::sleep(std::time::Duration::from_millis(50));
        let outcome = collect_once(&manager, request(), shutdown).await.unwrap();
        assert_eq!(outcome, CollectOutcome::Cancelled);
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_collect_once_spawn_failure() {
        let manager = SessionManager::new(CollectorConfig::new("/nonexistent/seatkit-helper"));
        let result = collect_once(&manager, request(), std::future::pending()).await;
        assert!(matches!(result, Err(SeatError::Spawn { .. })));
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn test_write_outcome_lines() {
        let outcome = CollectOutcome::Collected(
            vec![
                Parameter::string("display-device", "/dev/tty1"),
                Parameter::boolean("is-local", false),
            ]
            .into(),
        );
        let mut out = Vec::new();
        write_outcome(&mut out, &outcome, false).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "display-device = /dev/tty1\nis-local = false\n"
        );
    }

    #[test]
    fn test_write_outcome_json() {
        let outcome = CollectOutcome::Collected(vec![Parameter::int32("unix-user", 7)].into());
        let mut out = Vec::new();
        write_outcome(&mut out, &outcome, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value, serde_json::json!([{"key": "unix-user", "value": 7}]));
    }

    #[test]
    fn test_write_outcome_failure_prints_nothing() {
        let mut out = Vec::new();
        write_outcome(&mut out, &CollectOutcome::HelperFailed, false).unwrap();
        assert!(out.is_empty());
    }
}
