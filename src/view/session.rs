//! Anonymous sessions, one wizard each

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::view::wizard::{SceneWizard, WizardDeps};

struct SessionEntry {
    wizard: Arc<SceneWizard>,
    last_seen: Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Idle past `ttl` and not waiting on a generate or enhance call
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        let idle = now.saturating_duration_since(*self.last_seen.lock());
        idle >= ttl && !self.wizard.is_generating() && !self.wizard.is_enhancing()
    }
}

/// Concurrent map of live wizards keyed by session id
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionEntry>,
    deps: WizardDeps,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(deps: WizardDeps, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            deps,
            ttl,
        }
    }

    /// Anonymous sign-in: start a fresh wizard
    pub fn create(&self) -> (Uuid, Arc<SceneWizard>) {
        let id = Uuid::new_v4();
        let wizard = Arc::new(SceneWizard::new(self.deps.clone()));
        self.sessions.insert(
            id,
            SessionEntry {
                wizard: wizard.clone(),
                last_seen: Mutex::new(Instant::now()),
            },
        );
        info!(session = %id, "Session created");
        (id, wizard)
    }

    /// Look up a session and mark it as active
    pub fn get(&self, id: &Uuid) -> Result<Arc<SceneWizard>> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        entry.touch();
        Ok(entry.wizard.clone())
    }

    /// Drop a session, cancelling anything it still has in flight
    pub fn remove(&self, id: &Uuid) -> Result<()> {
        let (_, entry) = self
            .sessions
            .remove(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        entry.wizard.cancel();
        info!(session = %id, "Session closed");
        Ok(())
    }

    /// Drop every session idle for longer than the TTL; returns how many went
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(now, self.ttl))
            .map(|entry| *entry.key())
            .collect();

        let mut evicted = 0;
        for id in expired {
            // re-checked under the shard lock in case the session was used meanwhile
            if let Some((_, entry)) = self
                .sessions
                .remove_if(&id, |_, entry| entry.is_expired(now, self.ttl))
            {
                entry.wizard.cancel();
                debug!(session = %id, "Evicted idle session");
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "Swept idle sessions");
        }
        evicted
    }

    /// Start the background task that evicts idle sessions every `interval`
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match store.upgrade() {
                    Some(store) => {
                        store.evict_idle();
                    }
                    None => break,
                }
            }
        });

        info!(interval_secs = interval.as_secs(), ttl_secs = self.ttl.as_secs(), "Started session sweeper");
        handle
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
