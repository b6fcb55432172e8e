//! アニメーションフレームループ
//!
//! `requestAnimationFrame`で自分自身を再スケジュールするループを、
//! 停止可能なハンドルとして扱えるようにします。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::GameError;

type FrameCallback = Closure<dyn FnMut(f64)>;

struct LoopState {
    name: &'static str,
    running: Cell<bool>,
    handle: Cell<Option<i32>>,
    callback: RefCell<Option<FrameCallback>>,
}

impl LoopState {
    /// 次のフレームを予約
    fn schedule(&self) -> Result<(), GameError> {
        let window = web_sys::window().ok_or_else(|| GameError::Js("windowが取得できません".to_string()))?;
        let callback = self.callback.borrow();
        if let Some(callback) = callback.as_ref() {
            let handle = window.request_animation_frame(callback.as_ref().unchecked_ref())?;
            self.handle.set(Some(handle));
        }
        Ok(())
    }

    fn cancel(&self) {
        if let Some(handle) = self.handle.take() {
            if let Some(window) = web_sys::window() {
                if let Err(err) = window.cancel_animation_frame(handle) {
                    log::warn!("{}: フレームのキャンセルに失敗: {:?}", self.name, err);
                }
            }
        }
    }
}

/// 停止可能なアニメーションフレームループ
///
/// フレーム関数が`false`を返すか`stop`が呼ばれると、以降のフレームは予約されません。
/// ハンドルを破棄するとループも止まります。
pub struct AnimationLoop {
    state: Rc<LoopState>,
}

impl AnimationLoop {
    /// ループを開始
    ///
    /// `frame`には`requestAnimationFrame`のタイムスタンプ（ミリ秒）が渡されます。
    pub fn start<F>(name: &'static str, mut frame: F) -> Result<Self, GameError>
    where
        F: FnMut(f64) -> bool + 'static,
    {
        let state = Rc::new(LoopState {
            name,
            running: Cell::new(true),
            handle: Cell::new(None),
            callback: RefCell::new(None),
        });

        // クロージャからは弱参照で持ち、ハンドルの破棄で解放されるようにする
        let weak = Rc::downgrade(&state);
        let callback = Closure::wrap(Box::new(move |timestamp: f64| {
            let state = match weak.upgrade() {
                Some(state) => state,
                None => return,
            };
            state.handle.set(None);
            if !state.running.get() {
                return;
            }

            if !frame(timestamp) {
                log::debug!("{}: ループ終了", state.name);
                state.running.set(false);
                return;
            }

            if let Err(err) = state.schedule() {
                log::error!("{}: 次フレームの予約に失敗: {}", state.name, err);
                state.running.set(false);
            }
        }) as Box<dyn FnMut(f64)>);

        *state.callback.borrow_mut() = Some(callback);
        state.schedule()?;
        log::debug!("{}: ループ開始", name);

        Ok(Self { state })
    }

    /// ループを停止（予約済みのフレームもキャンセル）
    pub fn stop(&self) {
        if self.state.running.replace(false) {
            log::debug!("{}: ループ停止", self.state.name);
        }
        self.state.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    pub fn name(&self) -> &'static str {
        self.state.name
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
