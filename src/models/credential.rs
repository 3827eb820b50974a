use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// 認証情報の有効化状態
///
/// `Pending` → `Active` は確認コードの検証で遷移する。
/// `Disabled` への遷移は管理操作（外部）で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activation_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
    Pending,
    Active,
    Disabled,
}

/// ユーザー1人につき1件の認証情報レコード
///
/// シークレット平文・レガシーコードはログ出力禁止（Debug は secrecy により伏字）
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub user_name: String,
    /// Base32エンコードされた共有シークレット
    #[serde(skip)]
    pub secret: Option<SecretString>,
    pub activation_state: ActivationState,
    /// レガシー認証用の平文コード（TOTPとは独立）
    #[serde(skip)]
    pub legacy_user_code: Option<SecretString>,
    #[serde(skip)]
    pub legacy_system_code: Option<SecretString>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CredentialRecord {
    pub fn is_active(&self) -> bool {
        self.activation_state == ActivationState::Active
    }

    /// 空でないシークレットを返す
    pub fn secret(&self) -> Option<&str> {
        self.secret
            .as_ref()
            .map(|s| s.expose_secret())
            .filter(|s| !s.is_empty())
    }
}

/// 新規作成する認証情報
#[derive(Debug)]
pub struct NewCredential {
    pub user_name: String,
    pub secret: SecretString,
    pub activation_state: ActivationState,
    pub legacy_user_code: Option<SecretString>,
    pub legacy_system_code: Option<SecretString>,
}

impl NewCredential {
    /// 登録開始時のレコード（Pending）
    pub fn pending(user_name: impl Into<String>, secret: SecretString) -> Self {
        Self {
            user_name: user_name.into(),
            secret,
            activation_state: ActivationState::Pending,
            legacy_user_code: None,
            legacy_system_code: None,
        }
    }

    pub fn with_legacy_codes(mut self, user_code: SecretString, system_code: SecretString) -> Self {
        self.legacy_user_code = Some(user_code);
        self.legacy_system_code = Some(system_code);
        self
    }
}
