//! ゲームセッション
//!
//! 1回の接続ぶんの状態（プレイヤー、入力、パーティクル、遅延推定、軌跡）をまとめて持つ
//! コンテキストです。ブラウザAPIには触れず、時刻は呼び出し側から渡されます。
//!
//! - `handle_server_message`: 受信イベントをレジストリなどに反映
//! - `tick`: 1フレーム分の同期処理（移動、トレイル、送信判定、パーティクル更新）

use std::collections::HashMap;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::game::player::{Color, MovementParams, Player, PlayerAttrs, PlayerId};
use crate::game::registry::{PlayerRegistry, Upsert};
use crate::game::zones::{DrawTrace, TracePoint, ZoneGrid, ZoneTracker, ZoneTransition};
use crate::input::{KeyAction, MovementIntent};
use crate::network::latency::LatencyEstimator;
use crate::network::protocol::{joined_attrs, ClientMessage, ServerMessage};
use crate::rendering::particles::ParticleLayer;
use crate::utils::frame::FrameGate;
use crate::utils::math::Vec2;

/// ローカルプレイヤーとして参加するときの選択内容
#[derive(Debug, Clone, PartialEq)]
pub struct LocalProfile {
    pub name: String,
    pub color: Color,
    pub character_id: u32,
}

/// 受信メッセージを処理した結果
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// 自分のIDが割り当てられた（参加要求を送るタイミング）
    Connected,
    /// 最初のスナップショットを受け取った（ゲームループを開始する）
    Started,
    /// 状態が更新された
    Updated,
    /// 未知のIDなどで何も変わらなかった
    Ignored,
    /// 接続エラーで停止した
    Halted(String),
    /// 接続が閉じられ、全プレイヤーを破棄した
    Disconnected(String),
}

/// 1フレームの処理結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    /// 送信するメッセージ
    pub outbound: Vec<ClientMessage>,
    /// ローカルプレイヤーが静止していないか
    pub moved: bool,
    /// ローカルプレイヤーのゾーン移動
    pub zone_transition: Option<ZoneTransition>,
}

/// リモートプレイヤーの直近の移動（補間表示用）
#[derive(Debug, Clone, Copy, PartialEq)]
struct RemoteSample {
    from: Vec2,
    to: Vec2,
    received_at: f64,
}

/// ゲームセッション
#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    params: MovementParams,
    profile: LocalProfile,
    registry: PlayerRegistry<ZoneTracker>,
    intent: MovementIntent,
    particles: ParticleLayer,
    latency: LatencyEstimator,
    trace: DrawTrace,
    gate: FrameGate,
    remote_samples: HashMap<PlayerId, RemoteSample>,
    own_id: Option<PlayerId>,
    started: bool,
    halted: Option<String>,
    last_ping: Option<f64>,
    last_rtt: Option<f64>,
}

impl GameSession {
    /// 新しいセッションを作成
    pub fn new(config: GameConfig, profile: LocalProfile) -> Result<Self, GameError> {
        Self::with_particles(config, profile, ParticleLayer::new())
    }

    /// パーティクルレイヤーを指定して作成（乱数シードを固定したいとき）
    pub fn with_particles(config: GameConfig, profile: LocalProfile, particles: ParticleLayer) -> Result<Self, GameError> {
        config.validate()?;

        Ok(Self {
            params: MovementParams::from_config(&config),
            registry: new_registry(&config),
            config,
            profile,
            intent: MovementIntent::new(),
            particles,
            latency: LatencyEstimator::new(),
            trace: DrawTrace::new(),
            gate: FrameGate::default(),
            remote_samples: HashMap::new(),
            own_id: None,
            started: false,
            halted: None,
            last_ping: None,
            last_rtt: None,
        })
    }

    fn ensure_running(&self) -> Result<(), GameError> {
        match &self.halted {
            Some(reason) => Err(GameError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    /// プレイヤーを追加・更新し、古い補間サンプルを捨てる
    fn upsert_player(&mut self, id: &str, attrs: PlayerAttrs) -> Result<Upsert, GameError> {
        let outcome = self.registry.upsert_from_snapshot(id, attrs)?;
        self.remote_samples.remove(id);
        Ok(outcome)
    }

    /// 自分のIDのプレイヤーをローカルプレイヤーにしてワールド中央へ配置
    fn designate_local(&mut self, own_id: &str) -> Result<(), GameError> {
        self.registry.set_local(own_id)?;
        let (cx, cy) = self.config.world_center();
        if let Some(local) = self.registry.place_local(Vec2::new(cx, cy)) {
            local.color = self.profile.color.clone();
        }
        log::info!("ローカルプレイヤー {} を ({}, {}) に配置しました", own_id, cx, cy);
        Ok(())
    }

    /// 参加要求メッセージ
    pub fn join_message(&self) -> ClientMessage {
        ClientMessage::Join {
            name: self.profile.name.clone(),
            character_id: self.profile.character_id,
            color: self.profile.color.clone(),
        }
    }

    /// 受信メッセージを反映
    ///
    /// `now_ms`は壁時計の現在時刻（Pongの往復時間と補間表示の基準）です。
    pub fn handle_server_message(&mut self, message: ServerMessage, now_ms: f64) -> Result<SessionEvent, GameError> {
        self.ensure_running()?;

        #[cfg(feature = "debug_network")]
        log::trace!("イベント処理: {}", message.kind());

        match message {
            ServerMessage::Connected { id } => {
                log::info!("プレイヤーID {} が割り当てられました", id);
                self.own_id = Some(id);
                Ok(SessionEvent::Connected)
            }
            ServerMessage::CurrentSnapshot { players } => {
                let own_id = self.own_id.clone().ok_or(GameError::NotJoined)?;

                // 1件でも不正な値があればスナップショット全体を拒否する
                if let Some((id, attrs)) = players.iter().find(|(_, attrs)| !attrs.position().is_finite()) {
                    return Err(GameError::InvalidPayload(format!(
                        "snapshot entry {} has non-finite position ({}, {})",
                        id, attrs.x, attrs.y
                    )));
                }

                for (id, attrs) in players {
                    self.upsert_player(&id, attrs)?;
                }

                if self.registry.local().is_none() && self.registry.contains(&own_id) {
                    self.designate_local(&own_id)?;
                } else if !self.registry.contains(&own_id) {
                    log::warn!("スナップショットにローカルプレイヤー {} が含まれていません", own_id);
                }

                log::info!("スナップショット受信: {}人", self.registry.len());
                if self.started {
                    Ok(SessionEvent::Updated)
                } else {
                    self.started = true;
                    Ok(SessionEvent::Started)
                }
            }
            ServerMessage::PeerJoined {
                id,
                name,
                color,
                x,
                y,
                character_id,
            } => {
                let attrs = joined_attrs(&name, &color, Vec2::new(x, y), character_id);
                self.upsert_player(&id, attrs)?;
                // スナップショットに自分がいなかった場合はここでローカルプレイヤーになる
                if self.own_id.as_deref() == Some(id.as_str()) && self.registry.local().is_none() {
                    self.designate_local(&id)?;
                }
                log::info!("{} ({}) が参加しました", name, id);
                Ok(SessionEvent::Updated)
            }
            ServerMessage::PeerMoved {
                id,
                x,
                y,
                spawn_particles,
            } => {
                let position = Vec2::new(x, y);
                let previous = self.registry.get(&id).map(|player| player.position);
                if !self.registry.apply_remote_move(&id, position)? {
                    return Ok(SessionEvent::Ignored);
                }

                self.remote_samples.insert(
                    id.clone(),
                    RemoteSample {
                        from: previous.unwrap_or(position),
                        to: position,
                        received_at: now_ms,
                    },
                );

                if spawn_particles {
                    let color = self.registry.get(&id).map(|player| player.color.clone());
                    self.particles.spawn(&id, position, color.as_ref());
                }
                Ok(SessionEvent::Updated)
            }
            ServerMessage::PeerLeft { id } => {
                self.remote_samples.remove(&id);
                match self.registry.remove(&id) {
                    Some(player) => {
                        log::info!("{} ({}) が退出しました", player.name, id);
                        Ok(SessionEvent::Updated)
                    }
                    None => Ok(SessionEvent::Ignored),
                }
            }
            ServerMessage::Pong { timestamp } => {
                let rtt = now_ms - timestamp;
                self.latency.add_ping(rtt);
                self.last_rtt = Some(rtt);
                log::debug!("RTT {:.0}ms (平均 {:.1}ms, ジッター {:.1}ms)", rtt, self.latency.latency(), self.latency.jitter());
                Ok(SessionEvent::Updated)
            }
            ServerMessage::PlayerDraw {
                id,
                x,
                y,
                zone,
                timestamp,
            } => {
                if !self.registry.contains(&id) {
                    return Ok(SessionEvent::Ignored);
                }
                self.trace.push(TracePoint {
                    position: Vec2::new(x, y),
                    zone,
                    timestamp,
                });
                Ok(SessionEvent::Updated)
            }
            ServerMessage::ConnectError { message } => {
                log::error!("接続エラーのためセッションを停止します: {}", message);
                self.halted = Some(message.clone());
                Ok(SessionEvent::Halted(message))
            }
        }
    }

    /// 接続が閉じられた
    ///
    /// 全プレイヤーを破棄してセッションを停止します。再接続はしません。
    pub fn handle_disconnect(&mut self, reason: &str) -> SessionEvent {
        log::info!("切断のため{}人のプレイヤーを破棄します: {}", self.registry.len(), reason);
        self.registry.clear();
        self.remote_samples.clear();
        self.particles.clear();
        self.trace = DrawTrace::new();
        self.intent.clear();
        self.own_id = None;
        self.started = false;
        if self.halted.is_none() {
            self.halted = Some(reason.to_string());
        }
        SessionEvent::Disconnected(reason.to_string())
    }

    /// 1フレーム進める
    ///
    /// `frame_time`はアニメーションフレームのタイムスタンプで送信レートの判定に、
    /// `now_ms`は壁時計で軌跡の削除に使います。
    pub fn tick(&mut self, frame_time: f64, now_ms: f64) -> Result<TickOutput, GameError> {
        self.ensure_running()?;
        if !self.started {
            return Err(GameError::NotJoined);
        }

        let send_allowed = self.gate.check(frame_time);
        self.trace.prune(now_ms);

        let mut output = TickOutput::default();

        if let Some(moved) = self.registry.advance_local(&self.intent, &self.params) {
            if let Some(local) = self.registry.local() {
                // 静止中も毎フレーム出すトレイル
                self.particles.spawn(&local.id, local.position, Some(&local.color));

                if moved && send_allowed {
                    output.outbound.push(ClientMessage::Move {
                        x: local.position.x,
                        y: local.position.y,
                        spawn_particles: true,
                    });
                }
            }

            self.particles.update();
            output.moved = moved;
            output.zone_transition = self.registry.observer_mut().take_transition();
        }

        Ok(output)
    }

    /// Ping間隔が経過していればPingメッセージを返す
    ///
    /// IDが割り当てられてから停止するまでの間だけ送ります。
    pub fn maybe_ping(&mut self, now_ms: f64) -> Option<ClientMessage> {
        if self.halted.is_some() || self.own_id.is_none() {
            return None;
        }
        let due = match self.last_ping {
            Some(last) => now_ms - last >= self.config.ping_interval_ms,
            None => true,
        };
        if !due {
            return None;
        }
        self.last_ping = Some(now_ms);
        Some(ClientMessage::Ping { timestamp: now_ms })
    }

    /// キーイベントを移動入力に反映
    pub fn handle_key(&mut self, key: &str, code: &str, action: KeyAction) -> bool {
        self.intent.apply_key_event(key, code, action)
    }

    /// 補間のオン/オフを切り替える
    pub fn toggle_prediction(&mut self) -> bool {
        self.latency.toggle_prediction()
    }

    /// プレイヤーの表示位置
    ///
    /// ローカルプレイヤーはそのままの位置、リモートプレイヤーは補間が有効なら
    /// 直前の位置から受信位置へ補間した位置です。
    pub fn display_position(&self, player: &Player, now_ms: f64) -> Vec2 {
        if self.registry.is_local(&player.id) {
            return player.position;
        }
        match self.remote_samples.get(&player.id) {
            Some(sample) => self
                .latency
                .predict_position(sample.from, sample.to, sample.received_at, now_ms),
            None => player.position,
        }
    }

    /// 作成直後の状態に戻す（設定とプロフィールは残す）
    pub fn reset(&mut self) {
        self.registry = new_registry(&self.config);
        self.intent = MovementIntent::new();
        self.particles.clear();
        self.latency = LatencyEstimator::new();
        self.trace = DrawTrace::new();
        self.gate = FrameGate::default();
        self.remote_samples.clear();
        self.own_id = None;
        self.started = false;
        self.halted = None;
        self.last_ping = None;
        self.last_rtt = None;
    }

    pub fn ping_label(&self) -> String {
        format!("Ping: {:.0} ms", self.last_rtt.unwrap_or(0.0))
    }

    pub fn jitter_label(&self) -> String {
        format!("Jitter: {:.0} ms", self.latency.jitter())
    }

    pub fn prediction_label(&self) -> String {
        format!("Prediction: {}", if self.latency.prediction_enabled() { "On" } else { "Off" })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn profile(&self) -> &LocalProfile {
        &self.profile
    }

    pub fn registry(&self) -> &PlayerRegistry<ZoneTracker> {
        &self.registry
    }

    pub fn particles(&self) -> &ParticleLayer {
        &self.particles
    }

    pub fn latency(&self) -> &LatencyEstimator {
        &self.latency
    }

    pub fn latency_mut(&mut self) -> &mut LatencyEstimator {
        &mut self.latency
    }

    pub fn trace(&self) -> &DrawTrace {
        &self.trace
    }

    pub fn intent(&self) -> &MovementIntent {
        &self.intent
    }

    pub fn own_id(&self) -> Option<&str> {
        self.own_id.as_deref()
    }

    /// ローカルプレイヤーの位置（参加前は`None`）
    pub fn local_position(&self) -> Option<Vec2> {
        self.registry.local().map(|player| player.position)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }
}

fn new_registry(config: &GameConfig) -> PlayerRegistry<ZoneTracker> {
    PlayerRegistry::new(ZoneTracker::new(ZoneGrid::new(config.world_width, config.world_height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::zones::ZoneId;
    use crate::rendering::particles::{CONTRAST_TEMPLATE, PARTICLES_PER_BURST};

    fn profile() -> LocalProfile {
        LocalProfile {
            name: "alice".to_string(),
            color: Color::Green,
            character_id: 2,
        }
    }

    fn session() -> GameSession {
        GameSession::with_particles(GameConfig::default(), profile(), ParticleLayer::with_seed(11)).unwrap()
    }

    fn attrs(name: &str, x: f64, y: f64) -> PlayerAttrs {
        PlayerAttrs {
            name: name.to_string(),
            color: Color::Violet,
            x,
            y,
            character_id: 1,
        }
    }

    /// Aとして接続し、A/Bのスナップショットを受け取ったセッション
    fn joined() -> GameSession {
        let mut session = session();
        session
            .handle_server_message(ServerMessage::Connected { id: "A".to_string() }, 0.0)
            .unwrap();
        let players = HashMap::from([
            ("A".to_string(), attrs("alice", 100.0, 100.0)),
            ("B".to_string(), attrs("bob", 200.0, 200.0)),
        ]);
        let event = session
            .handle_server_message(ServerMessage::CurrentSnapshot { players }, 0.0)
            .unwrap();
        assert_eq!(event, SessionEvent::Started);
        session
    }

    fn moved(id: &str, x: f64, y: f64, spawn_particles: bool) -> ServerMessage {
        ServerMessage::PeerMoved {
            id: id.to_string(),
            x,
            y,
            spawn_particles,
        }
    }

    #[test]
    fn test_snapshot_designates_local_player() {
        let mut session = joined();
        let registry = session.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.all().filter(|p| registry.is_local(&p.id)).count(), 1);

        let local = registry.local().unwrap();
        assert_eq!(local.id, "A");
        assert_eq!(local.position, Vec2::new(1500.0, 1500.0));
        assert_eq!(local.color, Color::Green);

        assert_eq!(
            session.handle_server_message(moved("A", 9.0, 9.0, false), 10.0).unwrap(),
            SessionEvent::Ignored
        );
        assert_eq!(session.local_position(), Some(Vec2::new(1500.0, 1500.0)));

        assert_eq!(
            session.handle_server_message(moved("B", 250.0, 260.0, false), 10.0).unwrap(),
            SessionEvent::Updated
        );
        assert_eq!(session.registry().get("B").unwrap().position, Vec2::new(250.0, 260.0));
    }

    #[test]
    fn test_snapshot_before_connected_is_rejected() {
        let mut session = session();
        let result = session.handle_server_message(
            ServerMessage::CurrentSnapshot {
                players: HashMap::new(),
            },
            0.0,
        );
        assert!(matches!(result, Err(GameError::NotJoined)));
        assert!(matches!(session.tick(20.0, 0.0), Err(GameError::NotJoined)));
    }

    #[test]
    fn test_non_finite_snapshot_is_rejected_whole() {
        let mut session = session();
        session
            .handle_server_message(ServerMessage::Connected { id: "A".to_string() }, 0.0)
            .unwrap();
        let players = HashMap::from([
            ("A".to_string(), attrs("alice", 100.0, 100.0)),
            ("B".to_string(), attrs("bob", f64::NAN, 200.0)),
        ]);
        let result = session.handle_server_message(ServerMessage::CurrentSnapshot { players }, 0.0);
        assert!(matches!(result, Err(GameError::InvalidPayload(_))));
        assert!(session.registry().is_empty());
        assert!(!session.is_started());
    }

    #[test]
    fn test_tick_moves_and_sends() {
        let mut session = joined();
        assert!(session.handle_key("ArrowRight", "ArrowRight", KeyAction::Pressed));

        let output = session.tick(100.0, 1000.0).unwrap();
        assert!(output.moved);
        assert!(output.outbound.contains(&ClientMessage::Move {
            x: 1500.5,
            y: 1500.0,
            spawn_particles: true,
        }));
    }

    #[test]
    fn test_fast_frame_suppresses_send_but_still_moves() {
        let mut session = joined();
        session.handle_key("d", "KeyD", KeyAction::Pressed);

        session.tick(100.0, 1000.0).unwrap();
        let output = session.tick(105.0, 1005.0).unwrap();

        assert!(output.moved);
        assert!(!output.outbound.iter().any(|m| matches!(m, ClientMessage::Move { .. })));
        // 0.5 + 1.0
        assert_eq!(session.local_position(), Some(Vec2::new(1501.5, 1500.0)));
    }

    #[test]
    fn test_resting_player_sends_nothing_but_leaves_trail() {
        let mut session = joined();
        let output = session.tick(100.0, 1000.0).unwrap();

        assert!(!output.moved);
        assert!(!output.outbound.iter().any(|m| matches!(m, ClientMessage::Move { .. })));

        let trail = session.particles().group("A").unwrap();
        assert_eq!(trail.len(), PARTICLES_PER_BURST);
        // 緑のプレイヤーには紫のテンプレート
        assert!(trail.iter().all(|p| p.color == CONTRAST_TEMPLATE.color));
    }

    #[test]
    fn test_first_tick_reports_spawn_zone() {
        let mut session = joined();
        let output = session.tick(100.0, 1000.0).unwrap();
        let transition = output.zone_transition.unwrap();
        assert_eq!(transition.current, ZoneId::Middle);
        assert!(!transition.highlighted);

        assert!(session.tick(120.0, 1020.0).unwrap().zone_transition.is_none());
    }

    #[test]
    fn test_remote_move_spawns_particles_when_flagged() {
        let mut session = joined();
        session.handle_server_message(moved("B", 300.0, 300.0, false), 0.0).unwrap();
        assert!(session.particles().group("B").is_none());

        session.handle_server_message(moved("B", 310.0, 300.0, true), 0.0).unwrap();
        assert_eq!(session.particles().group("B").unwrap().len(), PARTICLES_PER_BURST);

        assert_eq!(
            session.handle_server_message(moved("ghost", 1.0, 1.0, true), 0.0).unwrap(),
            SessionEvent::Ignored
        );
        assert!(session.particles().group("ghost").is_none());
    }

    #[test]
    fn test_peer_join_and_leave() {
        let mut session = joined();
        let joined_event = session
            .handle_server_message(
                ServerMessage::PeerJoined {
                    id: "C".to_string(),
                    name: "carol".to_string(),
                    color: Color::Purple,
                    x: 10.0,
                    y: 20.0,
                    character_id: 4,
                },
                0.0,
            )
            .unwrap();
        assert_eq!(joined_event, SessionEvent::Updated);
        assert_eq!(session.registry().get("C").unwrap().character_id, 4);

        let left = session
            .handle_server_message(ServerMessage::PeerLeft { id: "C".to_string() }, 0.0)
            .unwrap();
        assert_eq!(left, SessionEvent::Updated);
        assert!(!session.registry().contains("C"));

        let unknown = session
            .handle_server_message(ServerMessage::PeerLeft { id: "C".to_string() }, 0.0)
            .unwrap();
        assert_eq!(unknown, SessionEvent::Ignored);
    }

    #[test]
    fn test_pong_feeds_latency() {
        let mut session = joined();
        session
            .handle_server_message(ServerMessage::Pong { timestamp: 1000.0 }, 1080.0)
            .unwrap();
        session
            .handle_server_message(ServerMessage::Pong { timestamp: 2000.0 }, 2060.0)
            .unwrap();

        assert_eq!(session.latency().latency(), 70.0);
        assert_eq!(session.ping_label(), "Ping: 60 ms");
        assert_eq!(session.jitter_label(), "Jitter: 20 ms");
    }

    #[test]
    fn test_ping_starts_once_connected() {
        let mut session = session();
        assert_eq!(session.maybe_ping(0.0), None);

        // スナップショット前でもIDが割り当てられればPingを送る
        session
            .handle_server_message(ServerMessage::Connected { id: "A".to_string() }, 0.0)
            .unwrap();
        assert_eq!(session.maybe_ping(0.0), Some(ClientMessage::Ping { timestamp: 0.0 }));
        assert_eq!(session.maybe_ping(999.0), None);
        assert_eq!(session.maybe_ping(1000.0), Some(ClientMessage::Ping { timestamp: 1000.0 }));
    }

    #[test]
    fn test_draw_trace_lifecycle() {
        let mut session = joined();
        let draw = |id: &str, timestamp: f64| ServerMessage::PlayerDraw {
            id: id.to_string(),
            x: 5.0,
            y: 6.0,
            zone: "middle-left".to_string(),
            timestamp,
        };

        assert_eq!(session.handle_server_message(draw("B", 1000.0), 1000.0).unwrap(), SessionEvent::Updated);
        assert_eq!(session.handle_server_message(draw("ghost", 1000.0), 1000.0).unwrap(), SessionEvent::Ignored);
        assert_eq!(session.trace().len(), 1);

        session.tick(100.0, 6000.0).unwrap();
        assert_eq!(session.trace().len(), 1);

        session.tick(120.0, 6001.0).unwrap();
        assert!(session.trace().is_empty());
    }

    #[test]
    fn test_connect_error_halts_session() {
        let mut session = joined();
        let event = session
            .handle_server_message(
                ServerMessage::ConnectError {
                    message: "refused".to_string(),
                },
                0.0,
            )
            .unwrap();
        assert_eq!(event, SessionEvent::Halted("refused".to_string()));
        assert_eq!(session.halt_reason(), Some("refused"));

        assert!(matches!(session.tick(100.0, 100.0), Err(GameError::Halted(_))));
        assert!(matches!(
            session.handle_server_message(moved("B", 1.0, 1.0, false), 0.0),
            Err(GameError::Halted(_))
        ));
        assert_eq!(session.maybe_ping(5000.0), None);
    }

    #[test]
    fn test_display_position_follows_prediction_toggle() {
        let mut session = joined();
        session.handle_server_message(moved("B", 300.0, 200.0, false), 1000.0).unwrap();
        let bob = session.registry().get("B").unwrap().clone();

        // 予測オフなら受信位置そのまま
        assert_eq!(session.display_position(&bob, 1008.0), Vec2::new(300.0, 200.0));

        assert!(session.toggle_prediction());
        assert_eq!(session.prediction_label(), "Prediction: On");
        // 遅延サンプルなしなので分母は16ms
        assert_eq!(session.display_position(&bob, 1008.0), Vec2::new(250.0, 200.0));

        let local = session.registry().local().unwrap().clone();
        assert_eq!(session.display_position(&local, 1008.0), local.position);
    }

    #[test]
    fn test_join_message_uses_profile() {
        let session = session();
        assert_eq!(
            session.join_message(),
            ClientMessage::Join {
                name: "alice".to_string(),
                character_id: 2,
                color: Color::Green,
            }
        );
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let mut session = joined();
        session.tick(100.0, 0.0).unwrap();
        session
            .handle_server_message(ServerMessage::Pong { timestamp: 0.0 }, 40.0)
            .unwrap();
        session
            .handle_server_message(
                ServerMessage::PlayerDraw {
                    id: "B".to_string(),
                    x: 1.0,
                    y: 1.0,
                    zone: "middle".to_string(),
                    timestamp: 0.0,
                },
                0.0,
            )
            .unwrap();
        session
            .handle_server_message(
                ServerMessage::ConnectError {
                    message: "refused".to_string(),
                },
                0.0,
            )
            .unwrap();

        session.reset();

        assert!(session.registry().is_empty());
        assert_eq!(session.registry().observer().current_zone(), None);
        assert_eq!(session.particles().particle_count(), 0);
        assert!(session.trace().is_empty());
        assert_eq!(session.latency().samples().count(), 0);
        assert_eq!(session.ping_label(), "Ping: 0 ms");
        assert_eq!(session.gate.last_frame(), 0.0);
        assert_eq!(session.halt_reason(), None);
        assert!(!session.is_started());
        assert_eq!(session.own_id(), None);

        // 停止が解除され、もう一度参加できる
        session
            .handle_server_message(ServerMessage::Connected { id: "A".to_string() }, 0.0)
            .unwrap();
        let players = HashMap::from([("A".to_string(), attrs("alice", 1.0, 1.0))]);
        assert_eq!(
            session
                .handle_server_message(ServerMessage::CurrentSnapshot { players }, 0.0)
                .unwrap(),
            SessionEvent::Started
        );
    }

    #[test]
    fn test_rejoin_replaces_stale_remote_sample() {
        let mut session = joined();
        session.handle_server_message(moved("B", 250.0, 260.0, false), 1000.0).unwrap();

        session
            .handle_server_message(
                ServerMessage::PeerJoined {
                    id: "B".to_string(),
                    name: "bob".to_string(),
                    color: Color::Violet,
                    x: 900.0,
                    y: 900.0,
                    character_id: 1,
                },
                1010.0,
            )
            .unwrap();
        let bob = session.registry().get("B").unwrap().clone();
        assert_eq!(bob.position, Vec2::new(900.0, 900.0));
        assert_eq!(session.display_position(&bob, 1012.0), Vec2::new(900.0, 900.0));

        session.toggle_prediction();
        assert_eq!(session.display_position(&bob, 1012.0), Vec2::new(900.0, 900.0));
    }

    #[test]
    fn test_resnapshot_replaces_stale_remote_sample() {
        let mut session = joined();
        session.handle_server_message(moved("B", 250.0, 260.0, false), 1000.0).unwrap();

        let players = HashMap::from([("B".to_string(), attrs("bob", 50.0, 60.0))]);
        assert_eq!(
            session
                .handle_server_message(ServerMessage::CurrentSnapshot { players }, 1010.0)
                .unwrap(),
            SessionEvent::Updated
        );
        let bob = session.registry().get("B").unwrap().clone();
        assert_eq!(session.display_position(&bob, 1012.0), Vec2::new(50.0, 60.0));
    }

    #[test]
    fn test_own_peer_joined_designates_local_player() {
        let mut session = session();
        session
            .handle_server_message(ServerMessage::Connected { id: "A".to_string() }, 0.0)
            .unwrap();
        let players = HashMap::from([("B".to_string(), attrs("bob", 200.0, 200.0))]);
        session
            .handle_server_message(ServerMessage::CurrentSnapshot { players }, 0.0)
            .unwrap();
        assert!(session.registry().local().is_none());

        session
            .handle_server_message(
                ServerMessage::PeerJoined {
                    id: "A".to_string(),
                    name: "alice".to_string(),
                    color: Color::Violet,
                    x: 5.0,
                    y: 5.0,
                    character_id: 2,
                },
                0.0,
            )
            .unwrap();

        let local = session.registry().local().unwrap();
        assert_eq!(local.id, "A");
        assert_eq!(local.position, Vec2::new(1500.0, 1500.0));
        assert_eq!(local.color, Color::Green);
        assert_eq!(session.registry().remotes().count(), 1);

        // 自分の移動のエコーは無視される
        assert_eq!(
            session.handle_server_message(moved("A", 5.0, 5.0, false), 0.0).unwrap(),
            SessionEvent::Ignored
        );
        assert_eq!(session.local_position(), Some(Vec2::new(1500.0, 1500.0)));
    }

    #[test]
    fn test_disconnect_destroys_players_and_stops() {
        let mut session = joined();
        session.tick(100.0, 0.0).unwrap();
        session
            .handle_server_message(
                ServerMessage::PlayerDraw {
                    id: "B".to_string(),
                    x: 1.0,
                    y: 1.0,
                    zone: "middle".to_string(),
                    timestamp: 0.0,
                },
                0.0,
            )
            .unwrap();

        let event = session.handle_disconnect("closed by server");
        assert_eq!(event, SessionEvent::Disconnected("closed by server".to_string()));

        assert!(session.registry().is_empty());
        assert!(session.registry().local().is_none());
        assert_eq!(session.registry().observer().tracked_count(), 0);
        assert_eq!(session.particles().particle_count(), 0);
        assert!(session.trace().is_empty());
        assert!(!session.is_started());

        assert!(matches!(session.tick(120.0, 20.0), Err(GameError::Halted(_))));
        assert_eq!(session.maybe_ping(5000.0), None);
        assert!(matches!(
            session.handle_server_message(moved("B", 1.0, 1.0, false), 0.0),
            Err(GameError::Halted(_))
        ));
    }

    #[test]
    fn test_disconnect_after_connect_error_keeps_error_reason() {
        let mut session = joined();
        session
            .handle_server_message(
                ServerMessage::ConnectError {
                    message: "refused".to_string(),
                },
                0.0,
            )
            .unwrap();
        session.handle_disconnect("closed");
        assert_eq!(session.halt_reason(), Some("refused"));
        assert!(session.registry().is_empty());
    }
}
