use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repositories::StoreError;
use crate::services::totp::TotpError;

/// 登録・検証の結果として呼び出し側が扱う失敗
///
/// `Store` / `Totp` 以外はすべて想定内の失敗（例外ではない）。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("ユーザーは既に登録されています")]
    DuplicateUser,

    #[error("ユーザーが見つかりません")]
    UnknownUser,

    #[error("ユーザーが有効化されていません")]
    UserDisabled,

    #[error("認証コードが無効です")]
    InvalidCode,

    #[error("認証情報が設定されていません")]
    NoCredential,

    #[error("ストレージエラー")]
    Store(StoreError),

    #[error("TOTPエラー")]
    Totp(#[from] TotpError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            // 一意制約の競合に負けた側
            StoreError::DuplicateUserName => Self::DuplicateUser,
            other => Self::Store(other),
        }
    }
}

impl AuthError {
    /// 認証情報に起因する失敗か（外部には区別せず返す）
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownUser | Self::UserDisabled | Self::InvalidCode | Self::NoCredential
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// 未認証の呼び出し元に返す共通メッセージ
pub const INVALID_CREDENTIALS_MESSAGE: &str = "ユーザー名または認証コードが正しくありません";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Auth(AuthError::DuplicateUser) => (
                StatusCode::CONFLICT,
                "このユーザー名は既に登録されています".to_string(),
            ),
            Self::Auth(e) if e.is_credential_failure() => {
                // 理由はログのみ（ユーザー不在・無効化・コード不一致を区別しない）
                tracing::warn!(reason = %e, "認証失敗");
                (
                    StatusCode::UNAUTHORIZED,
                    INVALID_CREDENTIALS_MESSAGE.to_string(),
                )
            }
            Self::Auth(e) => {
                tracing::error!(error = ?e, "認証基盤エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
