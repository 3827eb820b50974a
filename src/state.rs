use std::sync::Arc;

use crate::config::StoreBackend;
use crate::repositories::CredentialStore;
use crate::services::{EnrollmentService, TotpService, VerificationService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// 認証情報ストアの種別（ヘルスチェック用）
    pub store_backend: StoreBackend,
    /// 登録フロー
    pub enrollment_service: EnrollmentService,
    /// 本人確認
    pub verification_service: VerificationService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(
        store: Arc<dyn CredentialStore>,
        store_backend: StoreBackend,
        totp_issuer: impl Into<String>,
    ) -> Self {
        let enrollment_service =
            EnrollmentService::new(store.clone(), TotpService::new(totp_issuer));
        let verification_service = VerificationService::new(store);

        Self {
            store_backend,
            enrollment_service,
            verification_service,
        }
    }
}
