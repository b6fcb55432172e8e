//! プレイヤーエンティティと移動計算
//!
//! ローカルプレイヤーだけが`integrate`で毎ティック動かされます。
//! リモートプレイヤーの位置はネットワークから受け取った値をそのまま使います。

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::input::MovementIntent;
use crate::utils::math::Vec2;

/// トランスポートが割り当てるプレイヤーID
pub type PlayerId = String;

/// この速さ未満まで減衰したら0に丸める
pub const VELOCITY_REST_THRESHOLD: f64 = 0.1;

/// プレイヤーの色
///
/// 既知のスウォッチはパーティクルのテンプレート選択に使います。
/// それ以外の文字列はそのまま描画に使います。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Color {
    /// `#9BFF00`
    Green,
    /// `#6018F2`
    Violet,
    /// `#7700ffff`（色未選択時のデフォルト）
    Purple,
    /// 任意のCSS色
    Raw(String),
}

impl Color {
    pub const GREEN_HEX: &'static str = "#9BFF00";
    pub const VIOLET_HEX: &'static str = "#6018F2";
    pub const PURPLE_HEX: &'static str = "#7700ffff";

    /// CSSに渡す文字列
    pub fn as_css(&self) -> &str {
        match self {
            Color::Green => Self::GREEN_HEX,
            Color::Violet => Self::VIOLET_HEX,
            Color::Purple => Self::PURPLE_HEX,
            Color::Raw(value) => value,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::Purple
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(Self::GREEN_HEX) {
            Color::Green
        } else if trimmed.eq_ignore_ascii_case(Self::VIOLET_HEX) {
            Color::Violet
        } else if trimmed.eq_ignore_ascii_case(Self::PURPLE_HEX) {
            Color::Purple
        } else {
            Color::Raw(value)
        }
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Color::from(value.to_string())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        match color {
            Color::Raw(value) => value,
            other => other.as_css().to_string(),
        }
    }
}

/// スナップショットや参加通知で届くプレイヤー属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAttrs {
    pub name: String,
    #[serde(default)]
    pub color: Color,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_character_id")]
    pub character_id: u32,
}

fn default_character_id() -> u32 {
    1
}

impl PlayerAttrs {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// 1ティックあたりの移動パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementParams {
    pub acceleration: f64,
    pub max_velocity: f64,
    pub friction: f64,
    /// プレイヤー中心の最小座標
    pub min: Vec2,
    /// プレイヤー中心の最大座標
    pub max: Vec2,
}

impl MovementParams {
    pub fn from_config(config: &GameConfig) -> Self {
        let (min_x, max_x) = config.x_bounds();
        let (min_y, max_y) = config.y_bounds();
        Self {
            acceleration: config.acceleration,
            max_velocity: config.max_velocity,
            friction: config.friction,
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }
}

/// 1軸分の速度更新
///
/// `positive`/`negative`は同じ軸の入力フラグです。
fn step_axis(velocity: f64, positive: bool, negative: bool, params: &MovementParams) -> f64 {
    let mut v = velocity;
    if negative {
        v = (v - params.acceleration).max(-params.max_velocity);
    }
    if positive {
        v = (v + params.acceleration).min(params.max_velocity);
    }

    if !positive && !negative {
        v *= params.friction;
        if v.abs() < VELOCITY_REST_THRESHOLD {
            v = 0.0;
        }
    }
    v
}

/// プレイヤー
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub character_id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Player {
    pub fn new(id: PlayerId, attrs: PlayerAttrs) -> Self {
        Self {
            id,
            position: attrs.position(),
            name: attrs.name,
            color: attrs.color,
            character_id: attrs.character_id,
            velocity: Vec2::ZERO,
        }
    }

    /// 属性を上書き（速度は保持）
    pub fn apply_attrs(&mut self, attrs: PlayerAttrs) {
        self.position = attrs.position();
        self.name = attrs.name;
        self.color = attrs.color;
        self.character_id = attrs.character_id;
    }

    /// 入力に従って1ティック進める
    ///
    /// 位置は境界内に強制的に収められますが、速度はそのまま残します。
    /// 壁に押し付けている間も入力による速度は維持され、離れると再び動き出します。
    ///
    /// 戻り値は静止していないかどうか（送信判定に使う）。
    pub fn integrate(&mut self, intent: &MovementIntent, params: &MovementParams) -> bool {
        self.velocity.x = step_axis(self.velocity.x, intent.right, intent.left, params);
        self.velocity.y = step_axis(self.velocity.y, intent.down, intent.up, params);

        self.position = (self.position + self.velocity).clamp(params.min, params.max);

        self.velocity.is_nonzero()
    }
}
