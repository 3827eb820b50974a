//! インメモリの認証情報ストア
//!
//! テスト・ローカル開発用。プロセス終了でデータは失われる。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::{ActivationState, CredentialRecord, NewCredential};

#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    records: Arc<RwLock<HashMap<String, CredentialRecord>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.read().await.get(user_name).cloned())
    }

    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError> {
        // 書き込みロック内で重複確認と挿入を行う
        let mut records = self.records.write().await;
        if records.contains_key(&credential.user_name) {
            return Err(StoreError::DuplicateUserName);
        }

        let now = OffsetDateTime::now_utc();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            user_name: credential.user_name,
            secret: Some(credential.secret),
            activation_state: credential.activation_state,
            legacy_user_code: credential.legacy_user_code,
            legacy_system_code: credential.legacy_system_code,
            created_at: now,
            updated_at: now,
        };
        records.insert(record.user_name.clone(), record.clone());
        Ok(record)
    }

    async fn update_activation_state(
        &self,
        user_name: &str,
        state: ActivationState,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(user_name).map(|record| {
            record.activation_state = state;
            record.updated_at = OffsetDateTime::now_utc();
            record.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn pending(user_name: &str) -> NewCredential {
        NewCredential::pending(user_name, SecretString::from("JBSWY3DPEHPK3PXP"))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryCredentialStore::new();
        let created = store.insert(pending("alice")).await.unwrap();
        assert_eq!(created.activation_state, ActivationState::Pending);

        let found = store.find_by_user_name("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.secret(), Some("JBSWY3DPEHPK3PXP"));
        assert!(store.find_by_user_name("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate() {
        let store = MemoryCredentialStore::new();
        store.insert(pending("alice")).await.unwrap();
        let result = store.insert(pending("alice")).await;
        assert!(matches!(result, Err(StoreError::DuplicateUserName)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_activation_state() {
        let store = MemoryCredentialStore::new();
        store.insert(pending("alice")).await.unwrap();

        let updated = store
            .update_activation_state("alice", ActivationState::Active)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.activation_state, ActivationState::Active);
        assert!(updated.updated_at >= updated.created_at);

        let missing = store
            .update_activation_state("nobody", ActivationState::Active)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
