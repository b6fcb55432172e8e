//! 入力処理モジュール
//!
//! キーボードイベントを4方向の移動フラグ（`MovementIntent`）に変換します。
//! フラグは入力イベントが書き込み、同期ループが1ティックに1回読み取ります。

pub mod key_codes;

pub use key_codes::directions_for;

/// 移動方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// 同じ軸の反対方向
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// キーイベントの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Pressed,
    Released,
}

/// 移動入力の状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementIntent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementIntent {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag_mut(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    /// 方向キーが押された
    ///
    /// 同じ軸の反対方向は解除されるので、1軸で同時に立つフラグは常に1つ以下です。
    pub fn press(&mut self, direction: Direction) {
        *self.flag_mut(direction) = true;
        *self.flag_mut(direction.opposite()) = false;
    }

    /// 方向キーが離された
    pub fn release(&mut self, direction: Direction) {
        *self.flag_mut(direction) = false;
    }

    /// ブラウザのキーイベントを適用し、移動キーだったかどうかを返す
    pub fn apply_key_event(&mut self, key: &str, code: &str, action: KeyAction) -> bool {
        let mut handled = false;
        for direction in directions_for(key, code) {
            match action {
                KeyAction::Pressed => self.press(direction),
                KeyAction::Released => self.release(direction),
            }
            handled = true;
        }
        handled
    }

    /// すべてのフラグを解除（フォーカス喪失時など）
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// X軸の入力 (-1, 0, 1)
    pub fn horizontal(&self) -> i8 {
        (self.right as i8) - (self.left as i8)
    }

    /// Y軸の入力 (-1, 0, 1)、下向きが正
    pub fn vertical(&self) -> i8 {
        (self.down as i8) - (self.up as i8)
    }
}
