//! パーティクルレイヤー
//!
//! プレイヤーごとの短命なエフェクトを管理します。時間（ティック）だけの関数で、
//! ネットワークには依存しません。

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::game::player::{Color, PlayerId};
use crate::utils::math::Vec2;

/// 1回のスポーンで生成する数
pub const PARTICLES_PER_BURST: usize = 3;

/// パーティクルの寿命（ティック）
pub const PARTICLE_LIFETIME: u32 = 30;

/// スポーン位置のばらつき幅
const SPAWN_SPREAD: f64 = 10.0;

/// 速度のばらつき幅（各軸 ±SPEED_SPREAD/2）
const SPEED_SPREAD: f64 = 2.0;

/// パーティクルの見た目
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleTemplate {
    pub color: &'static str,
    pub size: f64,
}

/// 通常のテンプレート（黄緑）
pub const DEFAULT_TEMPLATE: ParticleTemplate = ParticleTemplate {
    color: "#99ff008c",
    size: 5.0,
};

/// 緑のプレイヤー用テンプレート（紫）
pub const CONTRAST_TEMPLATE: ParticleTemplate = ParticleTemplate {
    color: "#6118f277",
    size: 5.0,
};

impl ParticleTemplate {
    /// 所有者の色に応じたテンプレート
    pub fn for_color(color: Option<&Color>) -> ParticleTemplate {
        match color {
            Some(Color::Green) => CONTRAST_TEMPLATE,
            _ => DEFAULT_TEMPLATE,
        }
    }
}

/// パーティクル
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: &'static str,
    pub size: f64,
    /// 残り寿命（ティック）
    pub lifetime: u32,
}

/// パーティクルレイヤー
#[derive(Debug)]
pub struct ParticleLayer {
    groups: HashMap<PlayerId, Vec<Particle>>,
    rng: SmallRng,
}

impl Default for ParticleLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleLayer {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// シードを固定して作成（テスト用）
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            groups: HashMap::new(),
            rng,
        }
    }

    /// 指定位置にバーストを生成
    pub fn spawn(&mut self, owner: &str, position: Vec2, owner_color: Option<&Color>) {
        let template = ParticleTemplate::for_color(owner_color);
        let group = self.groups.entry(owner.to_string()).or_default();

        for _ in 0..PARTICLES_PER_BURST {
            let offset = Vec2::new(
                (self.rng.gen::<f64>() - 0.5) * SPAWN_SPREAD,
                (self.rng.gen::<f64>() - 0.5) * SPAWN_SPREAD,
            );
            let velocity = Vec2::new(
                (self.rng.gen::<f64>() - 0.5) * SPEED_SPREAD,
                (self.rng.gen::<f64>() - 0.5) * SPEED_SPREAD,
            );
            group.push(Particle {
                position: position + offset,
                velocity,
                color: template.color,
                size: template.size,
                lifetime: PARTICLE_LIFETIME,
            });
        }
    }

    /// 1ティック進める
    ///
    /// 寿命が尽きたパーティクルを削除し、空になった所有者グループも削除します。
    pub fn update(&mut self) {
        self.groups.retain(|_, particles| {
            particles.retain_mut(|particle| {
                particle.position = particle.position + particle.velocity;
                particle.lifetime = particle.lifetime.saturating_sub(1);
                particle.lifetime > 0
            });
            !particles.is_empty()
        });
    }

    /// 全パーティクル（描画用）
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.groups.values().flatten()
    }

    /// 所有者のパーティクル
    pub fn group(&self, owner: &str) -> Option<&[Particle]> {
        self.groups.get(owner).map(Vec::as_slice)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn particle_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
