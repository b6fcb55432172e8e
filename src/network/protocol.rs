//! ネットワークプロトコルの定義
//!
//! クライアントとリレーサーバーの間で交換するメッセージです。
//! すべてJSONテキストフレームで、`{"type": "<イベント名>", ...}`の形式です。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::player::{Color, PlayerAttrs, PlayerId};
use crate::utils::math::Vec2;

/// クライアントから送信するメッセージ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// セッション参加要求
    Join {
        name: String,
        #[serde(rename = "characterId")]
        character_id: u32,
        color: Color,
    },
    /// ローカルプレイヤーの移動
    Move {
        x: f64,
        y: f64,
        #[serde(rename = "spawnParticles")]
        spawn_particles: bool,
    },
    /// 遅延測定
    Ping { timestamp: f64 },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(self)?)
    }

    /// ログ用のイベント名
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Move { .. } => "move",
            ClientMessage::Ping { .. } => "ping",
        }
    }
}

/// サーバーから受信するメッセージ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// 接続確立、トランスポートが割り当てた自分のID
    Connected { id: PlayerId },
    /// 参加時点の全プレイヤー
    CurrentSnapshot { players: HashMap<PlayerId, PlayerAttrs> },
    /// 新しいプレイヤーの参加
    PeerJoined {
        id: PlayerId,
        name: String,
        #[serde(default)]
        color: Color,
        x: f64,
        y: f64,
        #[serde(rename = "characterId", default = "default_character_id")]
        character_id: u32,
    },
    /// 他プレイヤーの移動
    PeerMoved {
        id: PlayerId,
        x: f64,
        y: f64,
        #[serde(rename = "spawnParticles", default)]
        spawn_particles: bool,
    },
    /// プレイヤーの退出
    PeerLeft { id: PlayerId },
    /// Pingの応答（送信時のタイムスタンプをそのまま返す）
    Pong { timestamp: f64 },
    /// ゾーン描画の軌跡ポイント
    PlayerDraw {
        id: PlayerId,
        x: f64,
        y: f64,
        zone: String,
        timestamp: f64,
    },
    /// 接続エラー
    ConnectError { message: String },
}

fn default_character_id() -> u32 {
    1
}

fn ensure_finite(what: &str, values: &[f64]) -> Result<(), GameError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(GameError::InvalidPayload(format!("{} contains non-finite numbers: {:?}", what, values)))
    }
}

impl ServerMessage {
    /// JSON文字列を解析し、数値を検証する
    ///
    /// 不正なメッセージは境界で拒否し、NaN座標がコアに入らないようにします。
    pub fn parse(json: &str) -> Result<Self, GameError> {
        let message: Self = serde_json::from_str(json)?;
        message.validate()?;
        Ok(message)
    }

    /// 数値フィールドがすべて有限値かチェック
    pub fn validate(&self) -> Result<(), GameError> {
        match self {
            ServerMessage::CurrentSnapshot { players } => {
                for (id, attrs) in players {
                    ensure_finite(&format!("snapshot entry {}", id), &[attrs.x, attrs.y])?;
                }
                Ok(())
            }
            ServerMessage::PeerJoined { id, x, y, .. } => ensure_finite(&format!("peerJoined {}", id), &[*x, *y]),
            ServerMessage::PeerMoved { id, x, y, .. } => ensure_finite(&format!("peerMoved {}", id), &[*x, *y]),
            ServerMessage::Pong { timestamp } => ensure_finite("pong", &[*timestamp]),
            ServerMessage::PlayerDraw { id, x, y, timestamp, .. } => {
                ensure_finite(&format!("playerDraw {}", id), &[*x, *y, *timestamp])
            }
            ServerMessage::Connected { .. } | ServerMessage::PeerLeft { .. } | ServerMessage::ConnectError { .. } => {
                Ok(())
            }
        }
    }

    /// ログ用のイベント名
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::CurrentSnapshot { .. } => "currentSnapshot",
            ServerMessage::PeerJoined { .. } => "peerJoined",
            ServerMessage::PeerMoved { .. } => "peerMoved",
            ServerMessage::PeerLeft { .. } => "peerLeft",
            ServerMessage::Pong { .. } => "pong",
            ServerMessage::PlayerDraw { .. } => "playerDraw",
            ServerMessage::ConnectError { .. } => "connectError",
        }
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `PeerJoined`のフィールドからプレイヤー属性を作る
pub fn joined_attrs(name: &str, color: &Color, position: Vec2, character_id: u32) -> PlayerAttrs {
    PlayerAttrs {
        name: name.to_string(),
        color: color.clone(),
        x: position.x,
        y: position.y,
        character_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_wire_format() {
        let message = ClientMessage::Move {
            x: 10.5,
            y: 20.0,
            spawn_particles: true,
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "move");
        assert_eq!(value["x"], 10.5);
        assert_eq!(value["spawnParticles"], true);
    }

    #[test]
    fn test_join_wire_format() {
        let message = ClientMessage::Join {
            name: "neo".to_string(),
            character_id: 2,
            color: Color::Green,
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "join");
        assert_eq!(value["characterId"], 2);
        assert_eq!(value["color"], "#9BFF00");
    }

    #[test]
    fn test_parse_snapshot() {
        let json = r##"{
            "type": "currentSnapshot",
            "players": {
                "A": {"name": "alice", "color": "#6018F2", "x": 100, "y": 100, "characterId": 1},
                "B": {"name": "bob", "color": "red", "x": 200, "y": 200, "characterId": 3}
            }
        }"##;
        match ServerMessage::parse(json).unwrap() {
            ServerMessage::CurrentSnapshot { players } => {
                assert_eq!(players.len(), 2);
                assert_eq!(players["A"].color, Color::Violet);
                assert_eq!(players["B"].character_id, 3);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_peer_events() {
        let moved = ServerMessage::parse(r#"{"type":"peerMoved","id":"B","x":1.5,"y":2.5,"spawnParticles":true}"#).unwrap();
        assert_eq!(
            moved,
            ServerMessage::PeerMoved {
                id: "B".to_string(),
                x: 1.5,
                y: 2.5,
                spawn_particles: true,
            }
        );

        let left = ServerMessage::parse(r#"{"type":"peerLeft","id":"B"}"#).unwrap();
        assert_eq!(left.kind(), "peerLeft");

        let joined = ServerMessage::parse(r#"{"type":"peerJoined","id":"C","name":"c","x":0,"y":0}"#).unwrap();
        match joined {
            ServerMessage::PeerJoined { color, character_id, .. } => {
                assert_eq!(color, Color::Purple);
                assert_eq!(character_id, 1);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_messages_rejected() {
        assert!(matches!(ServerMessage::parse("not json"), Err(GameError::Protocol(_))));
        assert!(matches!(
            ServerMessage::parse(r#"{"type":"peerMoved","id":"B","x":"left","y":0}"#),
            Err(GameError::Protocol(_))
        ));
        assert!(matches!(ServerMessage::parse(r#"{"type":"teleport"}"#), Err(GameError::Protocol(_))));
    }

    #[test]
    fn test_non_finite_rejected_by_validate() {
        let message = ServerMessage::PeerMoved {
            id: "B".to_string(),
            x: f64::NAN,
            y: 0.0,
            spawn_particles: false,
        };
        assert!(matches!(message.validate(), Err(GameError::InvalidPayload(_))));
    }
}
