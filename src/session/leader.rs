//! Per-session parameter collection
//!
//! A [`SessionLeader`] holds the identity of one session and runs the helper
//! program to discover the rest of its attributes. Discovered parameters are
//! merged with the caller's overrides and handed to a completion callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;

use super::overrides::OverrideParameters;
use crate::job::{Job, JobCompletion, JobId};
use crate::telemetry::ErrorTraceExt;
use crate::types::{CollectorConfig, Parameter, ParameterSet, parse_helper_output};

/// Identity fields assigned by the session manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaderIdentity {
    pub session_id: Option<String>,
    pub cookie: Option<String>,
    pub service_name: Option<String>,
    pub uid: u32,
    pub pid: u32,
}

/// Point-in-time view of a leader, for state dumps
#[derive(Debug, Clone, Serialize)]
pub struct LeaderSnapshot {
    #[serde(flatten)]
    pub identity: LeaderIdentity,
    pub override_parameters: OverrideParameters,
    pub pending_jobs: usize,
    pub cancelled: bool,
}

/// Orchestrates attribute collection for one session
///
/// Shared as `Arc<SessionLeader>`: the completion of each collection runs on
/// a spawned task that keeps the leader alive until the callback has run.
#[derive(Debug)]
pub struct SessionLeader {
    config: CollectorConfig,
    identity: RwLock<LeaderIdentity>,
    overrides: RwLock<OverrideParameters>,
    pending: Mutex<HashMap<JobId, Job>>,
    cancelled: AtomicBool,
}

impl SessionLeader {
    /// Create a leader that runs the configured helper
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            identity: RwLock::new(LeaderIdentity::default()),
            overrides: RwLock::new(OverrideParameters::new()),
            pending: Mutex::new(HashMap::new()),
            cancelled: AtomicBool::new(false),
        }
    }

    fn identity_mut(&self) -> std::sync::RwLockWriteGuard<'_, LeaderIdentity> {
        self.identity.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_jobs(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_uid(&self, uid: u32) {
        self.identity_mut().uid = uid;
    }

    pub fn set_pid(&self, pid: u32) {
        self.identity_mut().pid = pid;
    }

    pub fn set_session_id(&self, session_id: impl Into<String>) {
        self.identity_mut().session_id = Some(session_id.into());
    }

    pub fn set_cookie(&self, cookie: impl Into<String>) {
        self.identity_mut().cookie = Some(cookie.into());
    }

    pub fn set_service_name(&self, service_name: impl Into<String>) {
        self.identity_mut().service_name = Some(service_name.into());
    }

    /// Copy of the identity fields
    pub fn identity(&self) -> LeaderIdentity {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn uid(&self) -> u32 {
        self.identity().uid
    }

    pub fn pid(&self) -> u32 {
        self.identity().pid
    }

    pub fn session_id(&self) -> Option<String> {
        self.identity().session_id
    }

    pub fn cookie(&self) -> Option<String> {
        self.identity().cookie
    }

    pub fn service_name(&self) -> Option<String> {
        self.identity().service_name
    }

    /// Replace the override parameters
    ///
    /// The previous overrides are discarded entirely. `id` and `cookie`
    /// entries are dropped.
    pub fn set_override_parameters(&self, parameters: &[Parameter]) {
        let overrides = OverrideParameters::from_parameters(parameters.iter().cloned());
        *self.overrides.write().unwrap_or_else(PoisonError::into_inner) = overrides;
    }

    /// Copy of the current override parameters
    pub fn override_parameters(&self) -> OverrideParameters {
        self.overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of collections in flight
    pub fn pending_count(&self) -> usize {
        self.pending_jobs().len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> LeaderSnapshot {
        LeaderSnapshot {
            identity: self.identity(),
            override_parameters: self.override_parameters(),
            pending_jobs: self.pending_count(),
            cancelled: self.is_cancelled(),
        }
    }

    /// Start collecting session parameters
    ///
    /// Runs `<helper> --uid <uid> --pid <pid>` and returns immediately. When
    /// the helper finishes, `done` is called from the runtime with the merged
    /// parameters, or `None` if the helper failed. `context` is passed through
    /// untouched.
    ///
    /// Returns false if the helper could not be started; `done` is then never
    /// called. If [`cancel`](Self::cancel) runs first, `done` is never called
    /// either. Concurrent collections are allowed and complete independently.
    pub fn collect_parameters<C, F>(self: &Arc<Self>, done: F, context: C) -> bool
    where
        C: Send + 'static,
        F: FnOnce(&SessionLeader, Option<ParameterSet>, C) + Send + 'static,
    {
        let identity = self.identity();
        let command = self.config.helper_command(identity.uid, identity.pid);

        let mut job = Job::with_command(command);
        let completion = match job.execute() {
            Ok(completion) => completion,
            Err(e) => {
                e.trace_error();
                tracing::warn!(
                    session_id = ?identity.session_id,
                    "Unable to start session parameter helper"
                );
                return false;
            }
        };

        tracing::debug!(
            session_id = ?identity.session_id,
            job_id = %job.id(),
            pid = ?job.pid(),
            "Collecting session parameters"
        );
        self.pending_jobs().insert(job.id(), job);

        let leader = Arc::clone(self);
        tokio::spawn(async move {
            leader.job_completed(completion, done, context).await;
        });

        true
    }

    async fn job_completed<C, F>(self: Arc<Self>, completion: JobCompletion, done: F, context: C)
    where
        F: FnOnce(&SessionLeader, Option<ParameterSet>, C),
    {
        let job_id = completion.job_id();
        let exit = completion.wait().await;

        // Whoever removes the job first owns its outcome; cancel() drains the
        // map before terminating, so a cancelled job is never reported.
        let Some(job) = self.pending_jobs().remove(&job_id) else {
            tracing::debug!(job_id = %job_id, "Collection cancelled, dropping result");
            return;
        };

        let parameters = match exit {
            Some(exit) if exit.success() => {
                let stderr = job.stderr().await;
                if !stderr.is_empty() {
                    tracing::debug!(job_id = %job_id, stderr = %stderr.trim_end(), "Helper stderr");
                }
                Some(self.merge_parameters(&job.stdout().await))
            }
            Some(exit) => {
                let stderr = job.stderr().await;
                tracing::warn!(
                    job_id = %job_id,
                    %exit,
                    stderr = %stderr.trim_end(),
                    "Session parameter helper failed"
                );
                None
            }
            None => {
                tracing::warn!(job_id = %job_id, "Helper watcher ended without an exit status");
                None
            }
        };
        drop(job);

        done(&*self, parameters, context);
    }

    /// Merge helper output with the current overrides
    ///
    /// Discovered keys that are overridden are skipped; all overrides are then
    /// appended in their own order.
    fn merge_parameters(&self, stdout: &str) -> ParameterSet {
        let overrides = self.override_parameters();
        let mut parameters = parse_helper_output(stdout, |key| overrides.contains(key));
        parameters.extend(overrides.iter().cloned());
        parameters
    }

    /// Cancel every collection in flight
    ///
    /// Each helper is terminated and reaped before this returns, and none of
    /// their callbacks will run.
    pub async fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);

        let jobs: Vec<Job> = self.pending_jobs().drain().map(|(_, job)| job).collect();
        for mut job in jobs {
            let job_id = job.id();
            let terminated = job.cancel().await;
            tracing::debug!(job_id = %job_id, terminated, "Collection cancelled");
        }
    }
}
