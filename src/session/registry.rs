use super::budget::TokenEstimator;
use super::transcript::Session;
use crate::store::{ExpiringStore, Ttl};
use std::sync::{Arc, Mutex};

/// A session shared between the registry and the request handling it.
pub type SharedSession = Arc<Mutex<Session>>;

/// Builds sessions for the registry, so alternate transcript or budget
/// policies can be swapped in without touching registry logic.
pub trait SessionFactory: Send + Sync {
    fn build(&self, id: Option<&str>, system_prompt: &str) -> Session;
}

/// Builds plain [`Session`]s with an optional custom token estimator.
#[derive(Default)]
pub struct DefaultSessionFactory {
    estimator: Option<Arc<dyn TokenEstimator>>,
}

impl DefaultSessionFactory {
    pub fn with_estimator(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            estimator: Some(estimator),
        }
    }
}

impl SessionFactory for DefaultSessionFactory {
    fn build(&self, id: Option<&str>, system_prompt: &str) -> Session {
        let session = Session::new(id.map(str::to_string), system_prompt);
        match &self.estimator {
            Some(estimator) => session.with_estimator(Some(Arc::clone(estimator))),
            None => session,
        }
    }
}

/// Process-wide table of live conversations keyed by conversation id.
///
/// Entries expire after the configured idle period; every lookup through
/// [`get_or_create`](Self::get_or_create) re-arms the expiry.
pub struct SessionRegistry {
    sessions: Arc<ExpiringStore<String, SharedSession>>,
    default_system_prompt: String,
    factory: Arc<dyn SessionFactory>,
}

impl SessionRegistry {
    pub fn new(
        ttl: Ttl,
        default_system_prompt: impl Into<String>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            sessions: Arc::new(ExpiringStore::new(ttl)),
            default_system_prompt: default_system_prompt.into(),
            factory,
        }
    }

    pub fn with_default_factory(ttl: Ttl, default_system_prompt: impl Into<String>) -> Self {
        Self::new(
            ttl,
            default_system_prompt,
            Arc::new(DefaultSessionFactory::default()),
        )
    }

    pub fn default_system_prompt(&self) -> &str {
        &self.default_system_prompt
    }

    /// Underlying store, e.g. for wiring a background sweeper.
    pub fn store(&self) -> &Arc<ExpiringStore<String, SharedSession>> {
        &self.sessions
    }

    /// Resolve the session for `id`, creating it on first reference.
    ///
    /// - `id == None`: a fresh ephemeral session, never stored.
    /// - unseen `id`: built with `system_prompt` (or the default) and stored.
    /// - known `id` with `system_prompt`: the existing session is switched to
    ///   the new prompt, which discards its history.
    /// - known `id` without `system_prompt`: returned as is, expiry refreshed.
    ///
    /// Two concurrent first-touch calls for the same `id` can both miss and
    /// each build a session; the later insert wins and the other session is
    /// silently dropped. Callers must serialize turns per conversation.
    pub fn get_or_create(&self, id: Option<&str>, system_prompt: Option<&str>) -> SharedSession {
        let prompt = system_prompt.unwrap_or(&self.default_system_prompt);
        let Some(id) = id else {
            return Arc::new(Mutex::new(self.factory.build(None, prompt)));
        };

        if let Some(existing) = self.sessions.get(id) {
            if let Some(prompt) = system_prompt {
                existing
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .set_system_prompt(prompt);
                tracing::info!(conversation = id, "System prompt replaced; history reset");
            }
            return existing;
        }

        let session = Arc::new(Mutex::new(self.factory.build(Some(id), prompt)));
        self.sessions.set(id.to_string(), Arc::clone(&session));
        tracing::debug!(conversation = id, "Created session");
        session
    }

    /// Forget the session for `id`. A no-op if there is none.
    pub fn clear(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            tracing::debug!(conversation = id, "Cleared session");
        }
    }

    pub fn clear_all(&self) {
        self.sessions.clear();
        tracing::info!("Cleared all sessions");
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
