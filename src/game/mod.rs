//! ゲームモジュール
//!
//! ゲームのコア機能を提供するモジュールです。
//! プレイヤーと移動計算、プレイヤーレジストリ、ゾーン管理、セッション全体の同期処理を含みます。

pub mod player;
pub mod registry;
pub mod session;
pub mod zones;

pub use player::{Color, MovementParams, Player, PlayerAttrs, PlayerId};
pub use registry::{PlayerRegistry, Upsert};
pub use session::{GameSession, LocalProfile, SessionEvent, TickOutput};
pub use zones::{DrawTrace, PositionObserver, TracePoint, ZoneGrid, ZoneId, ZoneTracker, ZoneTransition};
