//! ユーティリティモジュール
//!
//! ベクトル演算、フレーム制御、ロギングなど、ゲーム全体で使う小さな部品です。

pub mod animation;
pub mod frame;
pub mod logger;
pub mod math;

pub use animation::AnimationLoop;
pub use frame::FrameGate;
pub use logger::{default_level, init_logging};
pub use math::*;
