//! Local cache of team sessions.

use indexmap::IndexMap;
use thiserror::Error;

use crate::state::session::{SessionId, TeamSession, TeamSessionParticipant};

/// Lookup against the cache missed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("team session `{0}` not found")]
pub struct SessionNotFound(pub SessionId);

/// Local cache of every known team session, keyed by session code.
///
/// Not synchronised on its own: [`AppState`](crate::state::AppState) wraps it
/// in a lock and writers additionally hold the per-session gate.
#[derive(Debug, Default)]
pub struct TeamSessionStore {
    sessions: IndexMap<SessionId, TeamSession>,
}

impl TeamSessionStore {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session, returning the previous copy.
    pub fn upsert(&mut self, session: TeamSession) -> Option<TeamSession> {
        self.sessions.insert(session.id.clone(), session)
    }

    /// Cached copy of `id`.
    pub fn get(&self, id: &SessionId) -> Result<&TeamSession, SessionNotFound> {
        self.sessions
            .get(id)
            .ok_or_else(|| SessionNotFound(id.clone()))
    }

    /// Mutable cached copy of `id`.
    pub fn get_mut(&mut self, id: &SessionId) -> Result<&mut TeamSession, SessionNotFound> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| SessionNotFound(id.clone()))
    }

    /// Whether `id` is cached.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Drop `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: &SessionId) -> Option<TeamSession> {
        self.sessions.shift_remove(id)
    }

    /// Snapshot of every cached session in insertion order.
    pub fn list(&self) -> Vec<TeamSession> {
        self.sessions.values().cloned().collect()
    }

    /// Number of cached sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Idempotent join. Returns `Ok(false)` when the user was already a member.
    pub fn add_participant(
        &mut self,
        id: &SessionId,
        participant: TeamSessionParticipant,
    ) -> Result<bool, SessionNotFound> {
        Ok(self.get_mut(id)?.add_participant(participant))
    }

    /// Remove `user_id` from `id`, returning the entry if it existed.
    pub fn remove_participant(
        &mut self,
        id: &SessionId,
        user_id: &str,
    ) -> Result<Option<TeamSessionParticipant>, SessionNotFound> {
        Ok(self.get_mut(id)?.remove_participant(user_id))
    }

    /// Replace the cache with a fetched list.
    ///
    /// `keep` names a session whose local copy survives when the fetched list
    /// does not contain it yet.
    pub fn replace_all(&mut self, sessions: Vec<TeamSession>, keep: Option<&SessionId>) {
        let kept = keep
            .filter(|id| !sessions.iter().any(|s| &s.id == *id))
            .and_then(|id| self.sessions.shift_remove(id));

        self.sessions = sessions
            .into_iter()
            .map(|session| (session.id.clone(), session))
            .collect();

        if let Some(session) = kept {
            self.sessions.insert(session.id.clone(), session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{session::Profile, timer::ModeDurations};

    fn session(code: &str) -> TeamSession {
        TeamSession::new(
            SessionId::from_code(code),
            format!("session {code}"),
            Profile::new("host", "Host", "cat"),
            &ModeDurations::default(),
            false,
        )
    }

    #[test]
    fn get_unknown_session_reports_not_found() {
        let store = TeamSessionStore::new();
        let id = SessionId::from_code("NOPE22");
        assert_eq!(store.get(&id).unwrap_err(), SessionNotFound(id));
    }

    #[test]
    fn upsert_replaces_and_list_keeps_insertion_order() {
        let mut store = TeamSessionStore::new();
        store.upsert(session("AAAAAA"));
        store.upsert(session("BBBBBB"));

        let mut renamed = session("AAAAAA");
        renamed.name = "renamed".into();
        assert!(store.upsert(renamed).is_some());

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "renamed");
        assert_eq!(listed[1].id, SessionId::from_code("BBBBBB"));
    }

    #[test]
    fn participant_add_is_idempotent() {
        let mut store = TeamSessionStore::new();
        let id = SessionId::from_code("AAAAAA");
        store.upsert(session("AAAAAA"));

        let joiner = TeamSessionParticipant::joining(Profile::new("u1", "Uma", "owl"));
        assert!(store.add_participant(&id, joiner.clone()).unwrap());
        assert!(!store.add_participant(&id, joiner).unwrap());
        assert_eq!(store.get(&id).unwrap().participants.len(), 2);
    }

    #[test]
    fn replace_all_keeps_requested_local_session() {
        let mut store = TeamSessionStore::new();
        store.upsert(session("LOCAL2"));
        store.upsert(session("STALE2"));

        let keep = SessionId::from_code("LOCAL2");
        store.replace_all(vec![session("REMOTE")], Some(&keep));

        assert!(store.contains(&keep));
        assert!(store.contains(&SessionId::from_code("REMOTE")));
        assert!(!store.contains(&SessionId::from_code("STALE2")));
    }

    #[test]
    fn replace_all_prefers_fetched_copy() {
        let mut store = TeamSessionStore::new();
        let mut local = session("SHARED");
        local.is_running = true;
        store.upsert(local);

        let id = SessionId::from_code("SHARED");
        store.replace_all(vec![session("SHARED")], Some(&id));
        assert!(!store.get(&id).unwrap().is_running);
    }
}
