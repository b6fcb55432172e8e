use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;

// モジュール宣言
pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod utils;

use config::GameConfig;
use error::GameError;
use game::{Color, GameSession, LocalProfile, SessionEvent, ZoneTransition};
use input::KeyAction;
use network::client::EventHandler;
use network::{NetworkClient, ServerMessage, TransportEvent};
use rendering::Renderer;
use utils::AnimationLoop;

// 初期化用のエントリーポイント
#[wasm_bindgen(start)]
pub fn start() {
    // エラーをコンソールにパニックフックとして表示
    console_error_panic_hook::set_once();

    // ロガーの初期化
    utils::init_logging(utils::default_level());
    log::info!("WebAssembly module initialized!");
}

/// ループとイベントハンドラで共有する状態
#[derive(Clone)]
struct Shared {
    session: Rc<RefCell<GameSession>>,
    renderer: Rc<RefCell<Renderer>>,
    network: Rc<RefCell<NetworkClient>>,
    game_loop: Rc<RefCell<Option<AnimationLoop>>>,
    background_loop: Rc<RefCell<Option<AnimationLoop>>>,
}

impl Shared {
    fn stop_loops(&self) {
        if let Some(game_loop) = self.game_loop.borrow().as_ref() {
            game_loop.stop();
        }
        if let Some(background_loop) = self.background_loop.borrow().as_ref() {
            background_loop.stop();
        }
    }

    /// 同期ループを開始（移動 → 送信 → 描画を毎フレーム）
    fn start_game_loop(&self) -> Result<(), GameError> {
        let session = Rc::clone(&self.session);
        let renderer = Rc::clone(&self.renderer);
        let network = Rc::downgrade(&self.network);

        let game_loop = AnimationLoop::start("game", move |frame_time| {
            let now = js_sys::Date::now();
            let output = match session.borrow_mut().tick(frame_time, now) {
                Ok(output) => output,
                Err(err) => {
                    log::error!("ゲームループを停止します: {}", err);
                    return false;
                }
            };

            if let Some(network) = network.upgrade() {
                let network = network.borrow();
                for message in &output.outbound {
                    if let Err(err) = network.send(message) {
                        log::warn!("{}の送信に失敗: {}", message.kind(), err);
                    }
                }
            }

            if let Some(transition) = &output.zone_transition {
                show_zone_transition(transition);
            }

            if let Err(err) = renderer.borrow_mut().render(&session.borrow(), now) {
                log::error!("描画エラー: {}", err);
            }
            true
        })?;

        *self.game_loop.borrow_mut() = Some(game_loop);
        Ok(())
    }

    /// 接続中ずっと動くループを開始（カメラの追従とPing送信、ゲームの更新とは独立）
    fn start_background_loop(&self) -> Result<(), GameError> {
        let session = Rc::clone(&self.session);
        let renderer = Rc::clone(&self.renderer);
        let network = Rc::downgrade(&self.network);
        let background_loop = AnimationLoop::start("background", move |_| {
            if let Err(err) = renderer.borrow_mut().update_camera() {
                log::warn!("カメラの適用に失敗: {}", err);
            }

            let ping = session.borrow_mut().maybe_ping(js_sys::Date::now());
            if let (Some(ping), Some(network)) = (ping, network.upgrade()) {
                if let Err(err) = network.borrow().send(&ping) {
                    log::warn!("pingの送信に失敗: {}", err);
                }
            }
            true
        })?;

        *self.background_loop.borrow_mut() = Some(background_loop);
        Ok(())
    }

    /// トランスポートイベントのハンドラを作る
    fn event_handler(&self) -> EventHandler {
        let shared = self.downgrade();
        Rc::new(RefCell::new(move |event: TransportEvent| {
            let shared = match shared.upgrade() {
                Some(shared) => shared,
                None => return,
            };
            match event {
                TransportEvent::Message(message) => shared.dispatch(message),
                TransportEvent::Closed { code, reason } => {
                    let reason = TransportEvent::close_reason(code, &reason);
                    let event = shared.session.borrow_mut().handle_disconnect(&reason);
                    shared.apply(Ok(event));
                }
            }
        }))
    }

    fn dispatch(&self, message: ServerMessage) {
        let now = js_sys::Date::now();
        let event = self.session.borrow_mut().handle_server_message(message, now);
        self.apply(event);
    }

    /// セッションイベントに応じてループと送信を制御
    fn apply(&self, event: Result<SessionEvent, GameError>) {
        match event {
            Ok(SessionEvent::Connected) => {
                let join = self.session.borrow().join_message();
                if let Err(err) = self.network.borrow().send(&join) {
                    log::error!("参加要求の送信に失敗: {}", err);
                }
            }
            Ok(SessionEvent::Started) => {
                if let Err(err) = self.start_game_loop() {
                    log::error!("ゲームループを開始できません: {}", err);
                }
            }
            Ok(SessionEvent::Halted(reason)) => {
                log::error!("接続に失敗しました。サーバーURLを確認してください: {}", reason);
                self.stop_loops();
            }
            Ok(SessionEvent::Disconnected(reason)) => {
                log::info!("サーバーとの接続が切れました: {}", reason);
                self.stop_loops();
            }
            Ok(SessionEvent::Updated) | Ok(SessionEvent::Ignored) => {}
            Err(err) => log::warn!("メッセージを処理できません: {}", err),
        }
    }

    fn downgrade(&self) -> WeakShared {
        WeakShared {
            session: Rc::downgrade(&self.session),
            renderer: Rc::downgrade(&self.renderer),
            network: Rc::downgrade(&self.network),
            game_loop: Rc::downgrade(&self.game_loop),
            background_loop: Rc::downgrade(&self.background_loop),
        }
    }
}

/// ハンドラからの弱参照（ソケットのクロージャとの循環を避ける）
struct WeakShared {
    session: Weak<RefCell<GameSession>>,
    renderer: Weak<RefCell<Renderer>>,
    network: Weak<RefCell<NetworkClient>>,
    game_loop: Weak<RefCell<Option<AnimationLoop>>>,
    background_loop: Weak<RefCell<Option<AnimationLoop>>>,
}

impl WeakShared {
    fn upgrade(&self) -> Option<Shared> {
        Some(Shared {
            session: self.session.upgrade()?,
            renderer: self.renderer.upgrade()?,
            network: self.network.upgrade()?,
            game_loop: self.game_loop.upgrade()?,
            background_loop: self.background_loop.upgrade()?,
        })
    }
}

/// ゾーン表示要素のハイライトを切り替える
fn show_zone_transition(transition: &ZoneTransition) {
    log::debug!("ゾーン: {}", transition.current.as_str());

    let document = match web_sys::window().and_then(|window| window.document()) {
        Some(document) => document,
        None => return,
    };

    if let Some(previous) = transition.previous {
        if let Some(element) = document.get_element_by_id(&format!("zone-{}", previous.as_str())) {
            if let Err(err) = element.remove_attribute("data-highlighted") {
                log::warn!("ゾーン表示の更新に失敗: {:?}", err);
            }
        }
    }

    if transition.highlighted {
        if let Some(element) = document.get_element_by_id(&format!("zone-{}", transition.current.as_str())) {
            if let Err(err) = element.set_attribute("data-highlighted", "true") {
                log::warn!("ゾーン表示の更新に失敗: {:?}", err);
            }
        }
    }
}

// JavaScriptからアクセス可能なゲームクライアント
#[wasm_bindgen]
pub struct GameClient {
    instance_id: String,
    config: GameConfig,
    shared: Shared,
}

#[wasm_bindgen]
impl GameClient {
    /// 新しいゲームクライアントを作成
    ///
    /// `config_json`は省略可能な部分設定（例: `{"worldWidth": 2000}`）です。
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, config_json: Option<String>) -> Result<GameClient, JsValue> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json)?,
            None => GameConfig::default(),
        };

        let instance_id = format!("game_{}", uuid::Uuid::new_v4());
        log::info!("ゲームクライアント作成: {}", instance_id);

        let renderer = Renderer::new(canvas_id, &config)?;
        let session = GameSession::new(config.clone(), default_profile())?;

        Ok(GameClient {
            instance_id,
            config,
            shared: Shared {
                session: Rc::new(RefCell::new(session)),
                renderer: Rc::new(RefCell::new(renderer)),
                network: Rc::new(RefCell::new(NetworkClient::new())),
                game_loop: Rc::new(RefCell::new(None)),
                background_loop: Rc::new(RefCell::new(None)),
            },
        })
    }

    #[wasm_bindgen(getter)]
    pub fn instance_id(&self) -> String {
        self.instance_id.clone()
    }

    /// カメラのオフセットを反映する要素を指定
    pub fn attach_overlay(&mut self, element_id: &str) -> Result<(), JsValue> {
        self.shared.renderer.borrow_mut().attach_overlay(element_id)?;
        Ok(())
    }

    /// サーバーに接続して参加
    ///
    /// `server_url`を省略すると設定のURLを使います。
    pub fn connect(
        &mut self,
        server_url: Option<String>,
        name: &str,
        color: &str,
        character_id: u32,
    ) -> Result<(), JsValue> {
        if name.trim().is_empty() {
            return Err(GameError::InvalidConfig("名前を入力してください".to_string()).into());
        }

        // 既存の接続があれば破棄
        self.teardown();

        let profile = LocalProfile {
            name: name.trim().to_string(),
            color: Color::from(color),
            character_id,
        };
        *self.shared.session.borrow_mut() = GameSession::new(self.config.clone(), profile)?;

        let url = server_url.unwrap_or_else(|| self.config.server_url.clone());
        let handler = self.shared.event_handler();
        self.shared.network.borrow_mut().connect(&url, handler)?;
        self.shared.start_background_loop()?;
        Ok(())
    }

    /// キーが押された
    pub fn handle_key_down(&mut self, key: &str, code: &str) -> bool {
        self.shared.session.borrow_mut().handle_key(key, code, KeyAction::Pressed)
    }

    /// キーが離された
    pub fn handle_key_up(&mut self, key: &str, code: &str) -> bool {
        self.shared.session.borrow_mut().handle_key(key, code, KeyAction::Released)
    }

    /// キャンバスのクリック（補間の切り替え）、新しい表示ラベルを返す
    pub fn handle_click(&mut self) -> String {
        let mut session = self.shared.session.borrow_mut();
        session.toggle_prediction();
        session.prediction_label()
    }

    /// ウィンドウのリサイズ
    pub fn resize(&mut self, width: f64, height: f64) {
        self.shared.renderer.borrow_mut().resize(width, height);
    }

    pub fn ping_label(&self) -> String {
        self.shared.session.borrow().ping_label()
    }

    pub fn jitter_label(&self) -> String {
        self.shared.session.borrow().jitter_label()
    }

    pub fn prediction_label(&self) -> String {
        self.shared.session.borrow().prediction_label()
    }

    /// 接続状態（"disconnected" / "connecting" / "connected" / "error"）
    pub fn connection_state(&self) -> String {
        self.shared.network.borrow().connection_state().as_str().to_string()
    }

    /// ローカルプレイヤーがいるゾーン
    pub fn current_zone(&self) -> Option<String> {
        self.shared
            .session
            .borrow()
            .registry()
            .observer()
            .current_zone()
            .map(|zone| zone.as_str().to_string())
    }

    pub fn player_count(&self) -> usize {
        self.shared.session.borrow().registry().len()
    }

    // 解放時の処理
    pub fn dispose(&mut self) {
        self.teardown();
        log::info!("ゲームクライアント破棄: {}", self.instance_id);
    }
}

impl GameClient {
    /// ループを止め、接続とセッションを破棄
    fn teardown(&mut self) {
        self.shared.stop_loops();
        self.shared.game_loop.borrow_mut().take();
        self.shared.background_loop.borrow_mut().take();
        self.shared.network.borrow_mut().disconnect();
        self.shared.session.borrow_mut().reset();
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn default_profile() -> LocalProfile {
    LocalProfile {
        name: String::new(),
        color: Color::default(),
        character_id: 1,
    }
}
