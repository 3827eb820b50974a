pub mod enrollment;
pub mod health;
pub mod totp;
pub mod verification;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub use enrollment::{begin_enrollment, confirm_enrollment};
pub use health::health_check;
pub use totp::current_code;
pub use verification::{verify, verify_legacy};

/// Router の構築
///
/// レガシー認証は `legacy_login_enabled` の場合のみ公開する。
pub fn create_router(state: AppState, legacy_login_enabled: bool) -> Router {
    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/enrollment", post(begin_enrollment))
        .route("/api/enrollment/confirm", post(confirm_enrollment))
        .route("/api/verify", post(verify))
        .route("/api/totp/current", post(current_code));

    let router = if legacy_login_enabled {
        router.route("/api/legacy/verify", post(verify_legacy))
    } else {
        router
    };

    router.with_state(state)
}

/// `:` はプロビジョニングURIで発行者名とアカウント名の区切りになる
fn no_label_separator(value: &str, _: &()) -> garde::Result {
    if value.contains(':') {
        return Err(garde::Error::new("ユーザー名に ':' は使用できません"));
    }
    Ok(())
}
