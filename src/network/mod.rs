//! ネットワークモジュール
//!
//! リレーサーバーとのWebSocket通信、メッセージ定義、遅延推定を提供します。
//! サーバーはメッセージを中継するだけで、ローカルプレイヤーの位置はクライアントが決めます。

pub mod client;
pub mod latency;
pub mod protocol;

pub use client::NetworkClient;
pub use latency::{LatencyEstimator, PredictionMode};
pub use protocol::{ClientMessage, ServerMessage};

/// トランスポートからハンドラに届くイベント
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// 解析・検証済みの受信メッセージ
    Message(ServerMessage),
    /// 接続が閉じられた
    Closed { code: u16, reason: String },
}

impl TransportEvent {
    /// 切断理由の表示用文字列
    pub fn close_reason(code: u16, reason: &str) -> String {
        if reason.is_empty() {
            format!("code {}", code)
        } else {
            format!("code {}: {}", code, reason)
        }
    }
}

/// 接続状態を表す列挙型
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConnectionState {
    /// 切断状態
    #[default]
    Disconnected,
    /// 接続試行中
    Connecting,
    /// 接続済み
    Connected,
    /// エラー発生（再接続はしない）
    Error(String),
}

impl ConnectionState {
    /// ページ側に渡す名前
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error(_) => "error",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_names() {
        assert_eq!(ConnectionState::default().as_str(), "disconnected");
        assert_eq!(ConnectionState::Error("refused".to_string()).as_str(), "error");
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
    }

    #[test]
    fn test_close_reason_text() {
        assert_eq!(TransportEvent::close_reason(1006, ""), "code 1006");
        assert_eq!(TransportEvent::close_reason(1000, "bye"), "code 1000: bye");
    }
}
