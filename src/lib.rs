//! TOTP による本人確認のコア
//!
//! シークレット生成・コード検証（RFC 6238）・登録フロー・有効化状態の管理と、
//! それを公開する薄い HTTP 層。

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
