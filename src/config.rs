//! ゲーム設定モジュール
//!
//! ワールドの大きさや移動パラメータなど、セッション全体で共有される定数をまとめます。
//! ページ側からは部分的なJSONオブジェクトを渡せるようにしてあり、省略された項目は
//! デフォルト値で埋められます。

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// 送信レート制限に使うフレームレート
pub const TARGET_FPS: f64 = 60.0;

/// 1フレームの最小時間（ミリ秒）
pub const FRAME_MIN_TIME_MS: f64 = 1000.0 / TARGET_FPS;

/// ゲーム設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// 接続先サーバーURL
    pub server_url: String,
    /// Ping送信間隔（ミリ秒）
    pub ping_interval_ms: f64,
    /// ワールドの幅
    pub world_width: f64,
    /// ワールドの高さ
    pub world_height: f64,
    /// プレイヤーの半径
    pub player_radius: f64,
    /// 1ティックあたりの最大速度
    pub max_velocity: f64,
    /// 1ティックあたりの加速度
    pub acceleration: f64,
    /// 入力がない軸に掛ける減衰係数 (0, 1)
    pub friction: f64,
    /// ワールド境界線の太さ
    pub world_border_width: f64,
    /// ビューポートの幅（カメラの中心合わせに使用）
    pub viewport_width: f64,
    /// ビューポートの高さ
    pub viewport_height: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:3000".to_string(),
            ping_interval_ms: 1000.0,
            world_width: 3000.0,
            world_height: 3000.0,
            player_radius: 32.0,
            max_velocity: 10.0,
            acceleration: 0.5,
            friction: 0.9,
            world_border_width: 20.0,
            viewport_width: 1280.0,
            viewport_height: 720.0,
        }
    }
}

impl GameConfig {
    /// JSON文字列から設定を読み込み、検証する
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 設定値の整合性をチェック
    pub fn validate(&self) -> Result<(), GameError> {
        let numbers = [
            ("pingIntervalMs", self.ping_interval_ms),
            ("worldWidth", self.world_width),
            ("worldHeight", self.world_height),
            ("playerRadius", self.player_radius),
            ("maxVelocity", self.max_velocity),
            ("acceleration", self.acceleration),
            ("friction", self.friction),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value <= 0.0 {
                return Err(GameError::InvalidConfig(format!("{} must be a positive number, got {}", name, value)));
            }
        }

        if self.friction >= 1.0 {
            return Err(GameError::InvalidConfig(format!("friction must be below 1.0, got {}", self.friction)));
        }

        if self.player_radius * 2.0 >= self.world_width.min(self.world_height) {
            return Err(GameError::InvalidConfig(format!(
                "playerRadius {} does not fit inside a {}x{} world",
                self.player_radius, self.world_width, self.world_height
            )));
        }

        Ok(())
    }

    /// プレイヤー中心が取りうるX座標の範囲
    pub fn x_bounds(&self) -> (f64, f64) {
        (self.player_radius, self.world_width - self.player_radius)
    }

    /// プレイヤー中心が取りうるY座標の範囲
    pub fn y_bounds(&self) -> (f64, f64) {
        (self.player_radius, self.world_height - self.player_radius)
    }

    /// ワールドの中心座標
    pub fn world_center(&self) -> (f64, f64) {
        (self.world_width / 2.0, self.world_height / 2.0)
    }
}
