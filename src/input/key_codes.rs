//! キー名の定数定義
//!
//! 矢印キーは`KeyboardEvent.key`で、WASDはキーボード配列に依存しないよう
//! `KeyboardEvent.code`で判定します。

use super::Direction;

/// `key`: 上矢印
pub const KEY_ARROW_UP: &str = "ArrowUp";
/// `key`: 下矢印
pub const KEY_ARROW_DOWN: &str = "ArrowDown";
/// `key`: 左矢印
pub const KEY_ARROW_LEFT: &str = "ArrowLeft";
/// `key`: 右矢印
pub const KEY_ARROW_RIGHT: &str = "ArrowRight";

/// `code`: W
pub const CODE_W: &str = "KeyW";
/// `code`: S
pub const CODE_S: &str = "KeyS";
/// `code`: A
pub const CODE_A: &str = "KeyA";
/// `code`: D
pub const CODE_D: &str = "KeyD";

/// `key`から方向を判定
pub fn direction_from_key(key: &str) -> Option<Direction> {
    match key {
        KEY_ARROW_UP => Some(Direction::Up),
        KEY_ARROW_DOWN => Some(Direction::Down),
        KEY_ARROW_LEFT => Some(Direction::Left),
        KEY_ARROW_RIGHT => Some(Direction::Right),
        _ => None,
    }
}

/// `code`から方向を判定
pub fn direction_from_code(code: &str) -> Option<Direction> {
    match code {
        CODE_W => Some(Direction::Up),
        CODE_S => Some(Direction::Down),
        CODE_A => Some(Direction::Left),
        CODE_D => Some(Direction::Right),
        _ => None,
    }
}

/// キーイベントに対応する方向をすべて返す
///
/// `key`と`code`は別々に判定するので、両方が一致すれば2つ返ることがあります。
pub fn directions_for(key: &str, code: &str) -> impl Iterator<Item = Direction> {
    direction_from_key(key).into_iter().chain(direction_from_code(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_keys() {
        assert_eq!(direction_from_key("ArrowUp"), Some(Direction::Up));
        assert_eq!(direction_from_key("ArrowRight"), Some(Direction::Right));
        assert_eq!(direction_from_key("w"), None);
    }

    #[test]
    fn test_wasd_by_code() {
        // AZERTY配列でも物理位置で判定される
        let dirs: Vec<_> = directions_for("z", "KeyW").collect();
        assert_eq!(dirs, vec![Direction::Up]);

        let dirs: Vec<_> = directions_for("ArrowLeft", "ArrowLeft").collect();
        assert_eq!(dirs, vec![Direction::Left]);

        assert_eq!(directions_for("Enter", "Enter").count(), 0);
    }
}
