use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::{ActivationState, CredentialRecord, NewCredential};
use crate::services::cipher::SecretCipher;

const USER_NAME_UNIQUE: &str = "credentials_user_name_key";

/// DB上の行（シークレットは暗号化済み）
#[derive(FromRow)]
struct CredentialRow {
    id: Uuid,
    user_name: String,
    secret_encrypted: Option<Vec<u8>>,
    activation_state: ActivationState,
    legacy_user_code: Option<String>,
    legacy_system_code: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

/// PostgreSQL 上の認証情報ストア
///
/// シークレットは AES-256-GCM で暗号化して `secret_encrypted` に保存する。
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    cipher: SecretCipher,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, cipher: SecretCipher) -> Self {
        Self { pool, cipher }
    }

    fn record_from_row(&self, row: CredentialRow) -> Result<CredentialRecord, StoreError> {
        let secret = row
            .secret_encrypted
            .as_deref()
            .map(|encrypted| self.cipher.decrypt(encrypted))
            .transpose()
            .inspect_err(|e| {
                tracing::error!(error = ?e, user_name = %row.user_name, "シークレット復号エラー");
            })?;

        Ok(CredentialRecord {
            id: row.id,
            user_name: row.user_name,
            secret,
            activation_state: row.activation_state,
            legacy_user_code: row.legacy_user_code.map(SecretString::from),
            legacy_system_code: row.legacy_system_code.map(SecretString::from),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    /// ユーザー名で認証情報を検索
    async fn find_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, user_name, secret_encrypted, activation_state,
                   legacy_user_code, legacy_system_code, created_at, updated_at
            FROM credentials
            WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.record_from_row(row)).transpose()
    }

    /// 新しい認証情報を作成
    ///
    /// # Errors
    /// - UNIQUE制約違反時: `StoreError::DuplicateUserName`
    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, StoreError> {
        let secret_encrypted = self.cipher.encrypt(&credential.secret)?;

        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            INSERT INTO credentials
                (user_name, secret_encrypted, activation_state, legacy_user_code, legacy_system_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_name, secret_encrypted, activation_state,
                      legacy_user_code, legacy_system_code, created_at, updated_at
            "#,
        )
        .bind(&credential.user_name)
        .bind(&secret_encrypted)
        .bind(credential.activation_state)
        .bind(credential.legacy_user_code.as_ref().map(|c| c.expose_secret()))
        .bind(credential.legacy_system_code.as_ref().map(|c| c.expose_secret()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some(USER_NAME_UNIQUE)
            {
                return StoreError::DuplicateUserName;
            }
            StoreError::Database(e)
        })?;

        self.record_from_row(row)
    }

    /// 有効化状態を更新
    async fn update_activation_state(
        &self,
        user_name: &str,
        state: ActivationState,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            UPDATE credentials
            SET activation_state = $2, updated_at = NOW()
            WHERE user_name = $1
            RETURNING id, user_name, secret_encrypted, activation_state,
                      legacy_user_code, legacy_system_code, created_at, updated_at
            "#,
        )
        .bind(user_name)
        .bind(state)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.record_from_row(row)).transpose()
    }
}
