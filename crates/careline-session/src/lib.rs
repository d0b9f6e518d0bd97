//! Per-session state store with mutual exclusion and expiry sweeping for
//! the Careline voice receptionist orchestrator.
//!
//! A turn holds its session's [`SessionHandle`] lock exclusively from
//! classification through the Workflow Engine's merge-back, so two
//! concurrent requests against the same session id serialize while
//! different sessions proceed in parallel (spec §5).

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod session;
pub mod store;
pub mod sweep;

pub use error::{SessionError, SessionResult};
pub use session::Session;
pub use store::{SessionHandle, SessionStore};
pub use sweep::spawn_sweep_task;

#[cfg(test)]
mod tests {
    use super::*;
    use careline_core::Entities;
    use careline_core::Turn;
    use chrono::Utc;

    fn turn(index: u32) -> Turn {
        Turn {
            index,
            timestamp: Utc::now(),
            raw_input: "hello".to_owned(),
            intent: "GREETING".to_owned(),
            entities: Entities::new(),
            response_text: "hi".to_owned(),
            calls: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_round_trips() {
        let store = SessionStore::new(300, 20);
        let id = store.create("+911234567890", "phone");
        let handle = store.handle(&id).await.expect("session should exist");
        let guard = handle.lock().await;
        assert_eq!(guard.caller_id, "+911234567890");
        assert_eq!(guard.channel, "phone");
        assert!(guard.active);
    }

    #[tokio::test]
    async fn unknown_session_returns_none() {
        let store = SessionStore::new(300, 20);
        assert!(store.handle("does-not-exist").await.is_none());
    }

    #[tokio::test]
    async fn turn_limit_deactivates_session() {
        let store = SessionStore::new(300, 2);
        let id = store.create("caller", "phone");
        let handle = store.handle(&id).await.unwrap();
        {
            let mut guard = handle.lock().await;
            guard.append_turn(turn(1), store.max_turns()).unwrap();
            guard.append_turn(turn(2), store.max_turns()).unwrap();
            let result = guard.append_turn(turn(3), store.max_turns());
            assert!(result.is_err());
            assert!(!guard.active);
        }
        // Store treats a deactivated session as gone on next lookup.
        assert!(store.handle(&id).await.is_none());
    }

    #[tokio::test]
    async fn end_removes_session() {
        let store = SessionStore::new(300, 20);
        let id = store.create("caller", "phone");
        store.end(&id);
        assert!(store.handle(&id).await.is_none());
    }

    #[tokio::test]
    async fn sweep_removes_expired_sessions() {
        let store = SessionStore::new(0, 20);
        let id = store.create("caller", "phone");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let swept = store.sweep_expired().await;
        assert_eq!(swept, 1);
        assert!(store.handle(&id).await.is_none());
    }

    #[tokio::test]
    async fn merge_entities_never_deletes_existing_keys() {
        let store = SessionStore::new(300, 20);
        let id = store.create("caller", "phone");
        let handle = store.handle(&id).await.unwrap();
        let mut guard = handle.lock().await;
        let mut first = Entities::new();
        first.insert("phone".to_owned(), serde_json::json!("9876543210"));
        guard.merge_entities(&first);

        let mut second = Entities::new();
        second.insert("phone".to_owned(), serde_json::Value::Null);
        guard.merge_entities(&second);

        assert_eq!(
            guard.entities.get("phone"),
            Some(&serde_json::json!("9876543210"))
        );
    }
}
