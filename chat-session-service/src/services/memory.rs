//! Volatile backend for local development and tests.

use crate::models::{Message, NewSession, Session};
use crate::services::store::{SessionBackend, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    last_id: i64,
    sessions: HashMap<i64, Session>,
}

/// All mutations happen under one write lock, which makes `append` atomic.
#[derive(Default)]
pub struct InMemorySessionBackend {
    inner: RwLock<Inner>,
}

impl InMemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for InMemorySessionBackend {
    async fn insert(&self, session: NewSession) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = inner.last_id;

        inner.sessions.insert(
            id,
            Session {
                id,
                user_id: session.user_id,
                session_name: session.session_name,
                conversation: session.conversation,
                created_at: session.created_at,
            },
        );

        Ok(id)
    }

    async fn fetch(&self, id: i64) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn fetch_by_user(&self, user_id: i64) -> Result<Vec<Session>, StoreError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<Session> = inner
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();

        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(sessions)
    }

    async fn append(&self, id: i64, messages: &[Message]) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.sessions.get_mut(&id) {
            Some(session) => {
                session.conversation.extend_from_slice(messages);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.sessions.remove(&id).is_some())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
