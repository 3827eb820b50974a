use secrecy::SecretBox;
use serde::Deserialize;

/// 認証情報ストアの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// プロセス内メモリ（ローカル開発用）
    Memory,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // ストア設定
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,
    /// postgres 使用時は必須
    #[serde(default)]
    pub database_url: Option<SecretBox<String>>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    /// シークレット暗号化キー（Base64エンコード、32バイト）。postgres 使用時は必須
    #[serde(default)]
    pub encryption_key: Option<SecretBox<String>>,

    // TOTP 設定
    /// TOTP発行者名（認証アプリに表示される）
    #[serde(default = "default_totp_issuer")]
    pub totp_issuer: String,

    /// レガシー認証（ユーザーコード + システムコード）を受け付けるか
    #[serde(default)]
    pub legacy_login_enabled: bool,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOTP_ISSUER: &str = "otpgate";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Postgres
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_totp_issuer() -> String {
    DEFAULT_TOTP_ISSUER.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// 任意の (キー, 値) から読み込む（キーは大文字小文字を区別しない）
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }
}
