//! フレームレート制御

use crate::config::FRAME_MIN_TIME_MS;

/// 送信レートを制限するゲート
///
/// 前回の呼び出しからの経過時間が最小フレーム時間未満なら、そのフレームの送信を抑制します。
/// 位置の更新自体は毎フレーム行われます。
#[derive(Debug, Clone)]
pub struct FrameGate {
    min_frame_time: f64,
    last_frame: f64,
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new(FRAME_MIN_TIME_MS)
    }
}

impl FrameGate {
    pub fn new(min_frame_time: f64) -> Self {
        Self {
            min_frame_time,
            last_frame: 0.0,
        }
    }

    /// フレームを記録し、このフレームで送信してよいかを返す
    ///
    /// 抑制されたフレームも次回の基準になります。
    pub fn check(&mut self, frame_time: f64) -> bool {
        let allowed = frame_time - self.last_frame >= self.min_frame_time;
        self.last_frame = frame_time;
        allowed
    }

    pub fn last_frame(&self) -> f64 {
        self.last_frame
    }
}
