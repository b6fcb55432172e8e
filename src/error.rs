//! エラー型の定義
//!
//! コア部分は`GameError`を返し、wasm境界で`JsValue`に変換します。

use thiserror::Error;
use wasm_bindgen::JsValue;

/// ゲームクライアントのエラー
#[derive(Debug, Error)]
pub enum GameError {
    /// メッセージのJSON解析・生成エラー
    #[error("プロトコルエラー: {0}")]
    Protocol(#[from] serde_json::Error),

    /// 形式は正しいが値が不正なメッセージ（NaNや無限大の座標など）
    #[error("不正なペイロード: {0}")]
    InvalidPayload(String),

    /// 設定値の検証エラー
    #[error("設定エラー: {0}")]
    InvalidConfig(String),

    /// 接続エラー（再接続は行わない）
    #[error("接続エラー: {0}")]
    Connection(String),

    /// セッション参加前に参加後の操作が呼ばれた
    #[error("セッションに参加していません")]
    NotJoined,

    /// 接続エラー後にコアが停止している
    #[error("セッションは停止しています: {0}")]
    Halted(String),

    /// ブラウザAPIの呼び出しエラー
    #[error("ブラウザAPIエラー: {0}")]
    Js(String),
}

impl From<GameError> for JsValue {
    fn from(err: GameError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<JsValue> for GameError {
    fn from(value: JsValue) -> Self {
        GameError::Js(format!("{:?}", value))
    }
}
