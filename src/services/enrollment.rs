use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;

use crate::error::AuthError;
use crate::models::{ActivationState, CredentialRecord, NewCredential};
use crate::repositories::CredentialStore;
use crate::services::totp::{DEFAULT_WINDOW, TotpService};

/// 登録開始時に呼び出し元へ一度だけ返す情報
#[derive(Serialize)]
pub struct EnrollmentData {
    pub user_name: String,
    /// Base32シークレット（手入力用）
    pub secret: String,
    /// QRコード描画用URI
    pub provisioning_uri: String,
    pub current_code: String,
    pub remaining_seconds: u64,
}

impl fmt::Debug for EnrollmentData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrollmentData")
            .field("user_name", &self.user_name)
            .field("secret", &"[REDACTED]")
            .field("provisioning_uri", &"[REDACTED]")
            .field("remaining_seconds", &self.remaining_seconds)
            .finish_non_exhaustive()
    }
}

/// TOTP登録フロー
///
/// `NoCredential → Pending → Active`
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn CredentialStore>,
    totp: TotpService,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn CredentialStore>, totp: TotpService) -> Self {
        Self { store, totp }
    }

    /// 登録を開始（シークレット生成、Pending で保存）
    ///
    /// # Errors
    /// - 既存レコードあり（同時実行で競合に負けた場合も）: `AuthError::DuplicateUser`
    pub async fn begin_enrollment(&self, user_name: &str) -> Result<EnrollmentData, AuthError> {
        if self.store.find_by_user_name(user_name).await?.is_some() {
            tracing::info!(user_name = %user_name, "登録開始: 既に登録済み");
            return Err(AuthError::DuplicateUser);
        }

        let secret = TotpService::generate_secret();
        let provisioning_uri = self.totp.provisioning_uri(&secret, user_name);
        let current = TotpService::current_code(&secret)?;

        // 一意制約違反は DuplicateUser に変換される
        self.store
            .insert(NewCredential::pending(
                user_name,
                SecretString::from(secret.clone()),
            ))
            .await?;

        tracing::info!(user_name = %user_name, "登録開始");

        Ok(EnrollmentData {
            user_name: user_name.to_string(),
            secret,
            provisioning_uri,
            current_code: current.code,
            remaining_seconds: current.remaining_seconds,
        })
    }

    /// 登録確認（初回コード検証で有効化）
    ///
    /// 有効化済みの場合はコードを検証した上で何も変更せず成功を返す。
    pub async fn confirm_enrollment(
        &self,
        user_name: &str,
        code: &str,
    ) -> Result<CredentialRecord, AuthError> {
        let record = self
            .store
            .find_by_user_name(user_name)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        if record.activation_state == ActivationState::Disabled {
            return Err(AuthError::UserDisabled);
        }

        let secret = record.secret().ok_or_else(|| {
            tracing::error!(user_name = %user_name, "シークレットのないレコード");
            AuthError::NoCredential
        })?;

        let Some(skew) = TotpService::validate(secret, code, DEFAULT_WINDOW) else {
            tracing::info!(user_name = %user_name, "登録確認: コード不一致");
            return Err(AuthError::InvalidCode);
        };

        if record.is_active() {
            tracing::debug!(user_name = %user_name, "登録確認: 既に有効化済み");
            return Ok(record);
        }

        let activated = self
            .store
            .update_activation_state(user_name, ActivationState::Active)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        tracing::info!(user_name = %user_name, skew, "登録完了（有効化）");

        Ok(activated)
    }
}
