use std::sync::Arc;

use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;

use crate::error::AuthError;
use crate::models::CredentialRecord;
use crate::repositories::CredentialStore;
use crate::services::totp::{DEFAULT_WINDOW, TotpService};

/// TOTPコードによる本人確認
///
/// 読み取りと計算のみ。レコードは変更しない。
/// 同一コードの再利用（リプレイ）は検出しない。
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn CredentialStore>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// ユーザー名とTOTPコードを検証
    ///
    /// # Errors
    /// - レコードなし: `AuthError::UnknownUser`
    /// - Active 以外（Pending / Disabled を区別しない）: `AuthError::UserDisabled`
    /// - シークレットなし: `AuthError::NoCredential`
    /// - コード不一致: `AuthError::InvalidCode`
    pub async fn verify(&self, user_name: &str, code: &str) -> Result<CredentialRecord, AuthError> {
        let record = self.active_record(user_name).await?;

        let secret = record.secret().ok_or_else(|| {
            tracing::error!(user_name = %user_name, "有効なレコードにシークレットがない");
            AuthError::NoCredential
        })?;

        match TotpService::validate(secret, code, DEFAULT_WINDOW) {
            Some(skew) => {
                tracing::info!(user_name = %user_name, skew, "TOTP認証成功");
                Ok(record)
            }
            None => {
                tracing::info!(user_name = %user_name, "TOTP認証失敗: コード不一致");
                Err(AuthError::InvalidCode)
            }
        }
    }

    /// レガシー認証（ユーザーコード + システムコードの平文比較）
    ///
    /// TOTPとは独立した旧方式のフォールバック。TOTPの状態には触れない。
    pub async fn verify_legacy(
        &self,
        user_name: &str,
        user_code: &str,
        system_code: &str,
    ) -> Result<CredentialRecord, AuthError> {
        let record = self.active_record(user_name).await?;

        let (Some(expected_user), Some(expected_system)) =
            (&record.legacy_user_code, &record.legacy_system_code)
        else {
            return Err(AuthError::NoCredential);
        };

        let user_ok = constant_time_str_eq(expected_user.expose_secret(), user_code);
        let system_ok = constant_time_str_eq(expected_system.expose_secret(), system_code);

        if user_ok & system_ok {
            tracing::info!(user_name = %user_name, "レガシー認証成功");
            Ok(record)
        } else {
            tracing::info!(user_name = %user_name, "レガシー認証失敗");
            Err(AuthError::InvalidCode)
        }
    }

    async fn active_record(&self, user_name: &str) -> Result<CredentialRecord, AuthError> {
        let record = self
            .store
            .find_by_user_name(user_name)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        if !record.is_active() {
            return Err(AuthError::UserDisabled);
        }
        Ok(record)
    }
}

fn constant_time_str_eq(expected: &str, candidate: &str) -> bool {
    // 長さの違いは ct_eq が false を返す
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivationState, NewCredential};
    use crate::repositories::MemoryCredentialStore;
    use crate::services::totp::unix_now;
    use secrecy::SecretString;

    const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    async fn seed(store: &MemoryCredentialStore, user_name: &str, state: ActivationState) {
        let mut credential = NewCredential::pending(user_name, SecretString::from(SECRET))
            .with_legacy_codes(SecretString::from("user-code"), SecretString::from("system-code"));
        credential.activation_state = state;
        store.insert(credential).await.unwrap();
    }

    fn create_test_service(store: &MemoryCredentialStore) -> VerificationService {
        VerificationService::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_verify_active_user() {
        let store = MemoryCredentialStore::new();
        seed(&store, "alice", ActivationState::Active).await;
        let service = create_test_service(&store);

        let code = TotpService::generate(SECRET, unix_now()).unwrap();
        let record = service.verify("alice", &code).await.unwrap();
        assert_eq!(record.user_name, "alice");
    }

    #[tokio::test]
    async fn test_verify_unknown_user() {
        let store = MemoryCredentialStore::new();
        let service = create_test_service(&store);
        let result = service.verify("nobody", "123456").await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn test_verify_pending_and_disabled_users() {
        let store = MemoryCredentialStore::new();
        seed(&store, "pending", ActivationState::Pending).await;
        seed(&store, "disabled", ActivationState::Disabled).await;
        let service = create_test_service(&store);

        let code = TotpService::generate(SECRET, unix_now()).unwrap();
        for user in ["pending", "disabled"] {
            let result = service.verify(user, &code).await;
            assert!(matches!(result, Err(AuthError::UserDisabled)), "{user}");
        }
    }

    #[tokio::test]
    async fn test_verify_garbage_code() {
        let store = MemoryCredentialStore::new();
        seed(&store, "alice", ActivationState::Active).await;
        let service = create_test_service(&store);

        for code in ["abcdef", "12345", ""] {
            let result = service.verify("alice", code).await;
            assert!(matches!(result, Err(AuthError::InvalidCode)), "{code:?}");
        }
    }

    #[tokio::test]
    async fn test_verify_does_not_mutate_record() {
        let store = MemoryCredentialStore::new();
        seed(&store, "alice", ActivationState::Active).await;
        let service = create_test_service(&store);
        let before = store.find_by_user_name("alice").await.unwrap().unwrap();

        let code = TotpService::generate(SECRET, unix_now()).unwrap();
        service.verify("alice", &code).await.unwrap();
        let _ = service.verify("alice", "000000").await;

        let after = store.find_by_user_name("alice").await.unwrap().unwrap();
        assert_eq!(before.updated_at, after.updated_at);
        assert_eq!(before.activation_state, after.activation_state);
    }

    #[tokio::test]
    async fn test_verify_legacy() {
        let store = MemoryCredentialStore::new();
        seed(&store, "alice", ActivationState::Active).await;
        seed(&store, "bob", ActivationState::Disabled).await;
        let service = create_test_service(&store);

        assert!(
            service
                .verify_legacy("alice", "user-code", "system-code")
                .await
                .is_ok()
        );
        assert!(matches!(
            service.verify_legacy("alice", "user-code", "wrong").await,
            Err(AuthError::InvalidCode)
        ));
        assert!(matches!(
            service.verify_legacy("alice", "user-cod", "system-code").await,
            Err(AuthError::InvalidCode)
        ));
        assert!(matches!(
            service.verify_legacy("bob", "user-code", "system-code").await,
            Err(AuthError::UserDisabled)
        ));
    }

    #[tokio::test]
    async fn test_verify_legacy_without_codes() {
        let store = MemoryCredentialStore::new();
        let mut credential = NewCredential::pending("carol", SecretString::from(SECRET));
        credential.activation_state = ActivationState::Active;
        store.insert(credential).await.unwrap();
        let service = create_test_service(&store);

        let result = service.verify_legacy("carol", "", "").await;
        assert!(matches!(result, Err(AuthError::NoCredential)));
    }
}
