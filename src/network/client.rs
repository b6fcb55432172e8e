//! ネットワーククライアント実装
//!
//! WebSocketでリレーサーバーに接続し、受信したメッセージを解析してハンドラに渡します。
//! 接続が開く前に送信されたメッセージは保留し、接続時にまとめて送信します。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, ErrorEvent, Event, MessageEvent, WebSocket};

use super::protocol::{ClientMessage, ServerMessage};
use super::{ConnectionState, TransportEvent};
use crate::error::GameError;

/// 受信メッセージと切断を受け取るハンドラ
pub type EventHandler = Rc<RefCell<dyn FnMut(TransportEvent)>>;

/// ネットワーククライアント
pub struct NetworkClient {
    /// WebSocket接続
    connection: Option<WebSocket>,
    /// 接続状態（イベントハンドラと共有）
    state: Rc<RefCell<ConnectionState>>,
    /// 接続前に送信されたメッセージ
    pending: Rc<RefCell<VecDeque<String>>>,
    // ハンドラが生きている間はクロージャを保持する
    on_open: Option<Closure<dyn FnMut(Event)>>,
    on_message: Option<Closure<dyn FnMut(MessageEvent)>>,
    on_error: Option<Closure<dyn FnMut(ErrorEvent)>>,
    on_close: Option<Closure<dyn FnMut(CloseEvent)>>,
}

impl Default for NetworkClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkClient {
    /// 新しいネットワーククライアントを作成
    pub fn new() -> Self {
        Self {
            connection: None,
            state: Rc::new(RefCell::new(ConnectionState::Disconnected)),
            pending: Rc::new(RefCell::new(VecDeque::new())),
            on_open: None,
            on_message: None,
            on_error: None,
            on_close: None,
        }
    }

    /// サーバーに接続
    ///
    /// 受信メッセージは解析・検証後に`handler`へ渡されます。ソケットのエラーは
    /// `ServerMessage::ConnectError`、切断は`TransportEvent::Closed`として届きます。
    /// `disconnect`による切断ではハンドラは呼ばれません。
    pub fn connect(&mut self, url: &str, handler: EventHandler) -> Result<(), GameError> {
        {
            let state = self.state.borrow();
            if matches!(*state, ConnectionState::Connected | ConnectionState::Connecting) {
                return Ok(());
            }
        }

        *self.state.borrow_mut() = ConnectionState::Connecting;
        log::info!("サーバーに接続中: {}", url);

        let ws = match WebSocket::new(url) {
            Ok(ws) => ws,
            Err(err) => {
                let message = format!("WebSocket接続の作成に失敗: {:?}", err);
                *self.state.borrow_mut() = ConnectionState::Error(message.clone());
                return Err(GameError::Connection(message));
            }
        };

        // 接続確立
        let open_state = Rc::clone(&self.state);
        let open_pending = Rc::clone(&self.pending);
        let open_socket = ws.clone();
        let on_open = Closure::wrap(Box::new(move |_: Event| {
            *open_state.borrow_mut() = ConnectionState::Connected;
            log::info!("WebSocket接続が確立されました");

            let queued: Vec<String> = open_pending.borrow_mut().drain(..).collect();
            for text in queued {
                if let Err(err) = open_socket.send_with_str(&text) {
                    log::error!("保留メッセージの送信に失敗: {:?}", err);
                }
            }
        }) as Box<dyn FnMut(Event)>);

        // メッセージ受信
        let message_handler = Rc::clone(&handler);
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            let text = match event.data().as_string() {
                Some(text) => text,
                None => {
                    log::warn!("テキスト以外のフレームを無視しました");
                    return;
                }
            };

            #[cfg(feature = "debug_network")]
            log::trace!("受信: {}", text);

            match ServerMessage::parse(&text) {
                Ok(message) => (&mut *message_handler.borrow_mut())(TransportEvent::Message(message)),
                Err(err) => log::warn!("メッセージを破棄しました: {}", err),
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        // エラー
        let error_state = Rc::clone(&self.state);
        let error_handler = Rc::clone(&handler);
        let on_error = Closure::wrap(Box::new(move |event: ErrorEvent| {
            let message = match event.message() {
                text if text.is_empty() => "WebSocketエラー".to_string(),
                text => text,
            };
            log::error!("WebSocketエラー: {}", message);
            *error_state.borrow_mut() = ConnectionState::Error(message.clone());
            (&mut *error_handler.borrow_mut())(TransportEvent::Message(ServerMessage::ConnectError { message }));
        }) as Box<dyn FnMut(ErrorEvent)>);

        // 切断
        let close_state = Rc::clone(&self.state);
        let close_handler = Rc::clone(&handler);
        let on_close = Closure::wrap(Box::new(move |event: CloseEvent| {
            log::info!("WebSocket接続が閉じられました: code={}, reason={}", event.code(), event.reason());
            {
                let mut state = close_state.borrow_mut();
                if !matches!(*state, ConnectionState::Error(_)) {
                    *state = ConnectionState::Disconnected;
                }
            }
            (&mut *close_handler.borrow_mut())(TransportEvent::Closed {
                code: event.code(),
                reason: event.reason(),
            });
        }) as Box<dyn FnMut(CloseEvent)>);

        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        self.connection = Some(ws);
        self.on_open = Some(on_open);
        self.on_message = Some(on_message);
        self.on_error = Some(on_error);
        self.on_close = Some(on_close);

        Ok(())
    }

    /// メッセージを送信
    ///
    /// 接続中なら保留し、接続後に送信します。
    pub fn send(&self, message: &ClientMessage) -> Result<(), GameError> {
        let ws = self.connection.as_ref().ok_or_else(|| GameError::Connection("未接続です".to_string()))?;
        let text = message.to_json()?;

        #[cfg(feature = "debug_network")]
        log::trace!("送信: {}", text);

        match ws.ready_state() {
            WebSocket::OPEN => {
                ws.send_with_str(&text)?;
                Ok(())
            }
            WebSocket::CONNECTING => {
                self.pending.borrow_mut().push_back(text);
                Ok(())
            }
            _ => Err(GameError::Connection(format!(
                "{}を送信できません: 接続が閉じています",
                message.kind()
            ))),
        }
    }

    /// 切断してイベントハンドラを解放
    pub fn disconnect(&mut self) {
        if let Some(ws) = self.connection.take() {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onerror(None);
            ws.set_onclose(None);
            if let Err(err) = ws.close() {
                log::warn!("WebSocketのクローズに失敗: {:?}", err);
            }
            log::info!("サーバーから切断しました");
        }

        self.on_open = None;
        self.on_message = None;
        self.on_error = None;
        self.on_close = None;
        self.pending.borrow_mut().clear();

        let mut state = self.state.borrow_mut();
        if !matches!(*state, ConnectionState::Error(_)) {
            *state = ConnectionState::Disconnected;
        }
    }

    /// 接続状態を取得
    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
