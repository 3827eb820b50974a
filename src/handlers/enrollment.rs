use axum::{Json, extract::State};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::EnrollmentData;
use crate::state::AppState;

use super::no_label_separator;

// === Begin Enrollment ===

#[derive(Debug, Deserialize, Validate)]
pub struct BeginEnrollmentRequest {
    #[garde(ascii, length(min = 1, max = 64), custom(no_label_separator))]
    pub user_name: String,
}

/// POST /api/enrollment
///
/// 登録開始（シークレット生成、プロビジョニングURIと現在のコードを返却）
///
/// # Security
/// - シークレット平文はログ出力禁止
pub async fn begin_enrollment(
    State(state): State<AppState>,
    Json(request): Json<BeginEnrollmentRequest>,
) -> Result<Json<EnrollmentData>, AppError> {
    request.validate()?;

    let data = state
        .enrollment_service
        .begin_enrollment(&request.user_name)
        .await?;

    Ok(Json(data))
}

// === Confirm Enrollment ===

#[derive(Deserialize, Validate)]
pub struct ConfirmEnrollmentRequest {
    #[garde(ascii, length(min = 1, max = 64), custom(no_label_separator))]
    pub user_name: String,
    #[garde(skip)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmEnrollmentResponse {
    pub activated: bool,
}

/// POST /api/enrollment/confirm
///
/// 初回コード検証で有効化
///
/// # Security
/// - コードはログ出力禁止
pub async fn confirm_enrollment(
    State(state): State<AppState>,
    Json(request): Json<ConfirmEnrollmentRequest>,
) -> Result<Json<ConfirmEnrollmentResponse>, AppError> {
    request.validate()?;

    let record = state
        .enrollment_service
        .confirm_enrollment(&request.user_name, &request.code)
        .await?;

    Ok(Json(ConfirmEnrollmentResponse {
        activated: record.is_active(),
    }))
}
