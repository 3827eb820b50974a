use axum::{Json, extract::State};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::CredentialRecord;
use crate::state::AppState;

use super::no_label_separator;

#[derive(Deserialize, Validate)]
pub struct VerifyRequest {
    #[garde(ascii, length(min = 1, max = 64), custom(no_label_separator))]
    pub user_name: String,
    #[garde(skip)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    pub record: CredentialRecord,
}

/// POST /api/verify
///
/// ユーザー名 + TOTPコードで本人確認
///
/// # Security
/// - 失敗理由（ユーザー不在・無効化・コード不一致・形式不正）は応答で区別しない
/// - コードはログ出力禁止
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    request.validate()?;

    let record = state
        .verification_service
        .verify(&request.user_name, &request.code)
        .await?;

    Ok(Json(VerifyResponse { ok: true, record }))
}

#[derive(Deserialize, Validate)]
pub struct LegacyVerifyRequest {
    #[garde(ascii, length(min = 1, max = 64), custom(no_label_separator))]
    pub user_name: String,
    #[garde(length(min = 1))]
    pub user_code: String,
    #[garde(length(min = 1))]
    pub system_code: String,
}

/// POST /api/legacy/verify
///
/// レガシー認証（`LEGACY_LOGIN_ENABLED=true` の場合のみルーティング）
pub async fn verify_legacy(
    State(state): State<AppState>,
    Json(request): Json<LegacyVerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    request.validate()?;

    let record = state
        .verification_service
        .verify_legacy(&request.user_name, &request.user_code, &request.system_code)
        .await?;

    Ok(Json(VerifyResponse { ok: true, record }))
}
