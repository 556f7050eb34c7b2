//! Session manager for tracking session leaders
//!
//! Uses DashMap for concurrent access with entry API to avoid deadlocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::types::{CollectorConfig, Parameter, Result, SeatError};

use super::leader::SessionLeader;

/// Request to open a new session
#[derive(Debug, Clone, Default)]
pub struct OpenSessionRequest {
    /// Owner of the session
    pub uid: u32,
    /// Process that opened the session
    pub pid: u32,
    /// PAM service name of the requesting login manager
    pub service_name: Option<String>,
    /// Parameters supplied by the caller
    pub parameters: Vec<Parameter>,
}

/// Registry of session leaders, keyed by cookie
///
/// Provides thread-safe leader storage and lookup using DashMap.
#[derive(Debug)]
pub struct SessionManager {
    config: CollectorConfig,
    /// Active leaders keyed by cookie
    leaders: DashMap<String, Arc<SessionLeader>>,
    next_session: AtomicU64,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            leaders: DashMap::new(),
            next_session: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    fn generate_session_id(&self) -> String {
        format!("Session{}", self.next_session.fetch_add(1, Ordering::Relaxed))
    }

    fn generate_cookie() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Create and register a leader for a new session
    ///
    /// The leader gets a fresh session id and cookie; collection is left to
    /// the caller.
    pub fn open_session(&self, request: OpenSessionRequest) -> Result<Arc<SessionLeader>> {
        let cookie = Self::generate_cookie();

        match self.leaders.entry(cookie.clone()) {
            dashmap::Entry::Occupied(_) => Err(SeatError::LeaderAlreadyExists(cookie)),
            dashmap::Entry::Vacant(vacant) => {
                let session_id = self.generate_session_id();
                let leader = SessionLeader::new(self.config.clone());
                leader.set_session_id(session_id.clone());
                leader.set_cookie(cookie.clone());
                leader.set_uid(request.uid);
                leader.set_pid(request.pid);
                if let Some(service_name) = request.service_name {
                    leader.set_service_name(service_name);
                }
                leader.set_override_parameters(&request.parameters);

                tracing::info!(
                    session_id = %session_id,
                    uid = request.uid,
                    pid = request.pid,
                    "Session leader created"
                );

                let leader = Arc::new(leader);
                vacant.insert(Arc::clone(&leader));
                Ok(leader)
            }
        }
    }

    /// Get an existing leader
    pub fn get_leader(&self, cookie: &str) -> Option<Arc<SessionLeader>> {
        self.leaders.get(cookie).map(|r| Arc::clone(&r))
    }

    /// Get an existing leader or return LeaderNotFound error
    pub fn get_leader_or_error(&self, cookie: &str) -> Result<Arc<SessionLeader>> {
        self.get_leader(cookie)
            .ok_or_else(|| SeatError::leader_not_found(cookie))
    }

    /// Remove a leader and cancel any collection it still has running
    pub async fn close_session(&self, cookie: &str) -> Result<()> {
        let (_, leader) = self
            .leaders
            .remove(cookie)
            .ok_or_else(|| SeatError::leader_not_found(cookie))?;

        leader.cancel().await;
        tracing::info!(session_id = ?leader.session_id(), "Session leader removed");
        Ok(())
    }

    /// Get the number of registered leaders
    pub fn session_count(&self) -> usize {
        self.leaders.len()
    }

    /// Get all cookies
    pub fn cookies(&self) -> Vec<String> {
        self.leaders.iter().map(|r| r.key().clone()).collect()
    }
}
