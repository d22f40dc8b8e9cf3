//! Process-wide mapping from session key to conversation handle

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::session::conversation::Conversation;
use crate::session::key::{Mode, SessionKey};
use crate::session::prompt::PromptResolver;

/// Owns every live conversation
///
/// Entries live until reset or until the store is dropped. There is no
/// expiry.
///
/// **Lock Scope Pattern**: every method takes the map lock for a single
/// lookup or insert and releases it before returning. Handle creation is
/// prompt resolution plus an allocation, so it runs inside the critical
/// section and concurrent first turns on one key always see the same handle.
/// The lock is synchronous and therefore can never be held across an await.
pub struct SessionStore {
    resolver: PromptResolver,
    sessions: Mutex<HashMap<SessionKey, Arc<Conversation>>>,
}

impl SessionStore {
    pub fn new(resolver: PromptResolver) -> Self {
        Self {
            resolver,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &PromptResolver {
        &self.resolver
    }

    // A panic while holding the lock cannot leave the map half-updated:
    // every critical section is a single insert, remove or lookup.
    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionKey, Arc<Conversation>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the handle for `(mode, language)`, creating it if needed
    ///
    /// Single-shot modes always get a fresh handle that replaces any stored
    /// one. For other modes an existing handle is returned unchanged and
    /// `context` is ignored.
    pub fn get_or_create(
        &self,
        mode: &Mode,
        language: &str,
        context: Option<&str>,
    ) -> Arc<Conversation> {
        let key = SessionKey::new(mode.clone(), language);
        let mut sessions = self.sessions();

        if !mode.is_single_shot() {
            if let Some(existing) = sessions.get(&key) {
                debug!(
                    session = %key,
                    session_id = %existing.id(),
                    created_at = %existing.created_at(),
                    "Reusing session"
                );
                return Arc::clone(existing);
            }
        }

        let conversation = self.build(key.clone(), context);
        sessions.insert(key, Arc::clone(&conversation));
        conversation
    }

    /// Replaces the session for `(mode, language)` with a fresh one built
    /// from `context`
    ///
    /// Removal and insertion happen under one lock, so a concurrent
    /// `get_or_create` sees either the old handle or the new one and never
    /// creates an ungrounded handle in between.
    pub fn recreate(
        &self,
        mode: &Mode,
        language: &str,
        context: Option<&str>,
    ) -> Arc<Conversation> {
        let key = SessionKey::new(mode.clone(), language);
        let conversation = self.build(key.clone(), context);

        let replaced = self.sessions().insert(key, Arc::clone(&conversation));
        if let Some(old) = replaced {
            debug!(session = %conversation.key(), session_id = %old.id(), "Replaced session");
        }
        conversation
    }

    fn build(&self, key: SessionKey, context: Option<&str>) -> Arc<Conversation> {
        let instruction = self.resolver.resolve(&key.mode, &key.language, context);
        let conversation = Arc::new(Conversation::new(key, instruction));
        info!(
            session = %conversation.key(),
            session_id = %conversation.id(),
            grounded = context.is_some_and(|c| !c.trim().is_empty()),
            "Created session"
        );
        conversation
    }

    /// Removes the session for `(mode, language)`; a missing key is not an error
    ///
    /// Returns whether a session was removed.
    pub fn reset(&self, mode: &Mode, language: &str) -> bool {
        let key = SessionKey::new(mode.clone(), language);
        let removed = self.sessions().remove(&key).is_some();
        if removed {
            info!(session = %key, "Session reset");
        } else {
            debug!(session = %key, "Reset for absent session");
        }
        removed
    }

    /// Returns the stored handle without creating one
    pub fn get(&self, mode: &Mode, language: &str) -> Option<Arc<Conversation>> {
        let key = SessionKey::new(mode.clone(), language);
        self.sessions().get(&key).cloned()
    }

    pub fn contains(&self, mode: &Mode, language: &str) -> bool {
        let key = SessionKey::new(mode.clone(), language);
        self.sessions().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Drops every session
    pub fn clear(&self) {
        let dropped = {
            let mut sessions = self.sessions();
            let count = sessions.len();
            sessions.clear();
            count
        };
        info!(dropped, "Cleared all sessions");
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(PromptResolver::builtin())
    }
}
