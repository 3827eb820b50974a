use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::services::totp::{CurrentCode, TotpService};

#[derive(Deserialize)]
pub struct CurrentCodeRequest {
    pub secret: String,
}

/// POST /api/totp/current
///
/// 現在のコードと残り秒数（登録画面が毎秒呼び出す）
pub async fn current_code(
    Json(request): Json<CurrentCodeRequest>,
) -> Result<Json<CurrentCode>, AppError> {
    let current = TotpService::current_code(&request.secret)
        .map_err(|_| AppError::Validation("シークレットの形式が不正です".to_string()))?;

    Ok(Json(current))
}
