use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

type HmacSha1 = Hmac<Sha1>;

/// コード桁数
pub const DIGITS: usize = 6;
/// タイムステップ（秒）
pub const PERIOD: u64 = 30;
/// 前後に許容するステップ数
pub const DEFAULT_WINDOW: u32 = 1;
/// 生成するシークレットのバイト数（160ビット）
pub const SECRET_BYTES: usize = 20;

const MODULUS: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TotpError {
    #[error("シークレットが空です")]
    EmptySecret,

    #[error("シークレットのBase32デコードに失敗")]
    InvalidSecret,
}

/// 現在のコードと残り秒数（登録画面の表示更新用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentCode {
    pub code: String,
    pub remaining_seconds: u64,
}

/// TOTP (Time-based One-Time Password) サービス
///
/// SHA-1 / 6桁 / 30秒 固定（RFC 6238 + RFC 4226）。
///
/// # Security
/// - シークレット平文・コードはログに出力しない
/// - 不正な入力でもエラーを外に出さず「不一致」として扱う
#[derive(Debug, Clone)]
pub struct TotpService {
    issuer: String,
}

impl TotpService {
    /// 新しい TotpService を作成
    ///
    /// # Arguments
    /// * `issuer` - TOTP発行者名（認証アプリに表示される）
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// 20バイトのランダムシークレットを生成し、Base32（パディングなし）でエンコード
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32_NOPAD.encode(&bytes)
    }

    /// 指定時刻（UNIX秒）のコードを生成
    pub fn generate(secret: &str, unix_time: u64) -> Result<String, TotpError> {
        let key = decode_secret(secret)?;
        Ok(hotp(&key, unix_time / PERIOD))
    }

    /// 現在時刻でコードを検証
    ///
    /// 一致したステップの現在ステップからの相対位置を返す（時計ずれの検出用）。
    pub fn validate(secret: &str, code: &str, window: u32) -> Option<i64> {
        Self::validate_at(secret, code, window, unix_now())
    }

    /// 指定時刻でコードを検証
    ///
    /// `C - window ..= C + window` の全ステップを比較する（途中で打ち切らない）。
    /// 形式不正なコード・デコードできないシークレットは `None`。
    pub fn validate_at(secret: &str, code: &str, window: u32, unix_time: u64) -> Option<i64> {
        // 入力検証: コードは6桁の数字のみ（HMAC計算前に弾く）
        if !is_well_formed_code(code) {
            return None;
        }

        let key = decode_secret(secret).ok()?;
        let current = unix_time / PERIOD;
        let window = i64::from(window);

        let mut matched: Option<i64> = None;
        for offset in -window..=window {
            let Some(counter) = current.checked_add_signed(offset) else {
                continue;
            };
            let expected = hotp(&key, counter);
            let equal: bool = expected.as_bytes().ct_eq(code.as_bytes()).into();
            if equal && matched.is_none_or(|m| offset.abs() < m.abs()) {
                matched = Some(offset);
            }
        }

        matched
    }

    /// 現在のステップが切り替わるまでの秒数（1..=30）
    pub fn remaining_seconds(unix_time: u64) -> u64 {
        PERIOD - (unix_time % PERIOD)
    }

    /// 現在のコードと残り秒数
    pub fn current_code(secret: &str) -> Result<CurrentCode, TotpError> {
        Self::code_at(secret, unix_now())
    }

    pub fn code_at(secret: &str, unix_time: u64) -> Result<CurrentCode, TotpError> {
        Ok(CurrentCode {
            code: Self::generate(secret, unix_time)?,
            remaining_seconds: Self::remaining_seconds(unix_time),
        })
    }

    /// このサービスの発行者名でプロビジョニングURIを構築
    pub fn provisioning_uri(&self, secret: &str, user_name: &str) -> String {
        provisioning_uri(secret, user_name, &self.issuer)
    }
}

/// `otpauth://` プロビジョニングURIを構築（QRコード描画は外部）
///
/// 発行者名・アカウント名はパーセントエンコードする。
pub fn provisioning_uri(secret: &str, user_name: &str, issuer: &str) -> String {
    let issuer = urlencoding::encode(issuer);
    let user_name = urlencoding::encode(user_name);
    format!(
        "otpauth://totp/{issuer}:{user_name}?secret={secret}&issuer={issuer}&algorithm=SHA1&digits={DIGITS}&period={PERIOD}"
    )
}

/// 現在のUNIX秒
pub fn unix_now() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or(0)
}

fn is_well_formed_code(code: &str) -> bool {
    code.len() == DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

/// Base32シークレットをデコード
///
/// 空白除去・大文字化・末尾パディング除去を行ってからデコードする。
fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let normalized = normalized.trim_end_matches('=');

    if normalized.is_empty() {
        return Err(TotpError::EmptySecret);
    }

    let key = BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| TotpError::InvalidSecret)?;

    if key.is_empty() {
        return Err(TotpError::InvalidSecret);
    }
    Ok(key)
}

/// HOTP (RFC 4226): HMAC-SHA1 + dynamic truncation
fn hotp(key: &[u8], counter: u64) -> String {
    // HMACは任意長の鍵を受け付ける
    let mut mac = match HmacSha1::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    format!("{:0width$}", binary % MODULUS, width = DIGITS)
}
