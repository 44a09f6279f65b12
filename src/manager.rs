// Session manager: creates sessions for clients and tracks them until they are removed
// or evicted for inactivity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::info;

use crate::config::{AgencyConfig, ConfirmPolicy};
use crate::error::{ReservationError, Result};
use crate::registry::CompanyRegistry;
use crate::session::{ManagerSession, ReservationSession, SessionId, SessionInfo};

#[derive(Clone)]
pub enum TrackedSession {
    Reservation(Arc<ReservationSession>),
    Manager(Arc<ManagerSession>),
}

impl TrackedSession {
    pub fn info(&self) -> &SessionInfo {
        match self {
            TrackedSession::Reservation(session) => session.info(),
            TrackedSession::Manager(session) => session.info(),
        }
    }
}

pub struct SessionManager {
    registry: Arc<CompanyRegistry>,
    confirm_policy: ConfirmPolicy,
    idle_timeout: Option<Duration>,
    sessions: DashMap<SessionId, TrackedSession>,
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new(registry: Arc<CompanyRegistry>, config: &AgencyConfig) -> Self {
        Self {
            registry,
            confirm_policy: config.confirm_policy,
            idle_timeout: config.session_idle_timeout(),
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn create_reservation_session(&self, name: &str) -> Arc<ReservationSession> {
        let session = Arc::new(ReservationSession::new(
            self.next_id(),
            name,
            Arc::clone(&self.registry),
            self.confirm_policy,
        ));
        self.sessions
            .insert(session.id(), TrackedSession::Reservation(Arc::clone(&session)));
        info!(session_id = session.id(), name, "Reservation session created");
        session
    }

    pub fn create_manager_session(&self, name: &str) -> Arc<ManagerSession> {
        let session = Arc::new(ManagerSession::new(
            self.next_id(),
            name,
            Arc::clone(&self.registry),
        ));
        self.sessions
            .insert(session.id(), TrackedSession::Manager(Arc::clone(&session)));
        info!(session_id = session.id(), name, "Manager session created");
        session
    }

    pub fn session(&self, id: SessionId) -> Result<TrackedSession> {
        self.sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(ReservationError::NoSuchSession(id))
    }

    pub fn remove_session(&self, id: SessionId) -> Result<()> {
        if self.sessions.remove(&id).is_none() {
            return Err(ReservationError::NoSuchSession(id));
        }
        info!(session_id = id, "Session removed");
        Ok(())
    }

    // Drops sessions idle for longer than the configured timeout; returns how many were removed
    pub fn evict_idle(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.info().idle_for() <= timeout);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!(evicted, "Evicted idle sessions");
        }
        evicted
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
