//! 遅延推定モジュール
//!
//! 直近のRTTサンプルから平均遅延とジッターを求め、補間のオン/オフを管理します。

use std::collections::VecDeque;

use crate::utils::math::{lerp, lerp_unclamped, Vec2};

/// 保持するRTTサンプル数
pub const LATENCY_WINDOW: usize = 10;

/// 遅延推定値がないときに使う分母（ミリ秒）
pub const FALLBACK_LATENCY_MS: f64 = 16.0;

/// 補間係数の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionMode {
    /// 係数を制限しない（経過時間が遅延を超えると目標を越えて外挿する）
    #[default]
    Unclamped,
    /// 係数を0.0〜1.0に制限する
    Clamped,
}

/// 遅延推定器
#[derive(Debug, Clone)]
pub struct LatencyEstimator {
    samples: VecDeque<f64>,
    capacity: usize,
    latency: f64,
    jitter: f64,
    prediction_enabled: bool,
    mode: PredictionMode,
}

impl Default for LatencyEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyEstimator {
    pub fn new() -> Self {
        Self::with_capacity(LATENCY_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity: capacity.max(1),
            latency: 0.0,
            jitter: 0.0,
            prediction_enabled: false,
            mode: PredictionMode::default(),
        }
    }

    /// RTTサンプルを追加し、平均遅延とジッターを再計算
    pub fn add_ping(&mut self, rtt: f64) {
        if !rtt.is_finite() {
            log::warn!("非有限のRTTを無視しました: {}", rtt);
            return;
        }

        self.samples.push_back(rtt);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        self.latency = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        self.jitter = self.compute_jitter();
    }

    /// 隣接サンプル間の差の絶対値の平均
    fn compute_jitter(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let diffs: f64 = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| (b - a).abs())
            .sum();
        diffs / (self.samples.len() - 1) as f64
    }

    /// 平均遅延（ミリ秒）
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// ジッター（ミリ秒）
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// 保持中のサンプル（古い順）
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn prediction_enabled(&self) -> bool {
        self.prediction_enabled
    }

    /// 補間のオン/オフを切り替え、新しい状態を返す
    pub fn toggle_prediction(&mut self) -> bool {
        self.prediction_enabled = !self.prediction_enabled;
        log::info!("予測: {}", if self.prediction_enabled { "On" } else { "Off" });
        self.prediction_enabled
    }

    pub fn mode(&self) -> PredictionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PredictionMode) {
        self.mode = mode;
    }

    /// 表示位置を求める
    ///
    /// 予測が無効なら`target`をそのまま返します。有効なら
    /// `t = (now - server_timestamp) / latency`で`current`から`target`へ補間します。
    /// 遅延がまだ0なら分母に16msを使います。
    pub fn predict_position(&self, current: Vec2, target: Vec2, server_timestamp: f64, now: f64) -> Vec2 {
        if !self.prediction_enabled {
            return target;
        }

        let denominator = if self.latency != 0.0 { self.latency } else { FALLBACK_LATENCY_MS };
        let t = (now - server_timestamp) / denominator;

        match self.mode {
            PredictionMode::Unclamped => lerp_unclamped(current, target, t),
            PredictionMode::Clamped => lerp(current, target, t),
        }
    }
}
