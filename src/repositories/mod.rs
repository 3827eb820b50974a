pub mod credential;
pub mod memory;

use async_trait::async_trait;

use crate::models::{ActivationState, CredentialRecord, NewCredential};
use crate::services::cipher::CipherError;

pub use credential::PgCredentialStore;
pub use memory::MemoryCredentialStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ユーザー名が重複しています")]
    DuplicateUserName,

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("シークレットの暗号処理に失敗")]
    Cipher(#[from] CipherError),
}

/// 認証情報レコードの永続化
///
/// `insert` は `user_name` の一意性を原子的に保証すること。
/// 競合に負けた側は `StoreError::DuplicateUserName` を受け取る。
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<CredentialRecord>, StoreError>;

    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError>;

    /// 存在しない場合は `None`
    async fn update_activation_state(
        &self,
        user_name: &str,
        state: ActivationState,
    ) -> Result<Option<CredentialRecord>, StoreError>;
}
