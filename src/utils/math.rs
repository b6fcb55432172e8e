//! 数学ユーティリティモジュール
//!
//! ワールド座標で使う2次元ベクトルと補間関数をまとめています。

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// 2次元ベクトル（ワールド単位）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 両成分が有限値かどうか
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// どちらかの成分が0でないか
    pub fn is_nonzero(&self) -> bool {
        self.x != 0.0 || self.y != 0.0
    }

    /// 各成分を範囲に制限
    pub fn clamp(self, min: Vec2, max: Vec2) -> Vec2 {
        Vec2::new(self.x.max(min.x).min(max.x), self.y.max(min.y).min(max.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// 線形補間（`t`は制限しない）
///
/// `t > 1.0`なら`end`を越えて外挿されます。
pub fn lerp_unclamped(start: Vec2, end: Vec2, t: f64) -> Vec2 {
    start + (end - start) * t
}

/// 線形補間（`t`を0.0〜1.0に制限）
pub fn lerp(start: Vec2, end: Vec2, t: f64) -> Vec2 {
    lerp_unclamped(start, end, t.clamp(0.0, 1.0))
}
