//! カメラモジュール
//!
//! 表示位置を目標位置へ指数的に近づけるカメラです。
//! ゲームの更新とは独立したアニメーションフレームで毎回`update`されます。

use crate::utils::math::Vec2;

/// 1回の更新で残り距離のうち進む割合
pub const CAMERA_SMOOTHNESS: f64 = 0.1;

/// これ以下の残り距離ではオフセットを適用しない
pub const CAMERA_APPLY_THRESHOLD: f64 = 0.1;

/// カメラ
///
/// `position`は画面左上に対応するワールド座標です。
#[derive(Debug, Clone, PartialEq)]
pub struct CameraController {
    position: Vec2,
    target: Vec2,
    smoothness: f64,
    viewport: Vec2,
}

impl CameraController {
    /// 新しいカメラを作成
    pub fn new(initial: Vec2, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            position: initial,
            target: Vec2::ZERO,
            smoothness: CAMERA_SMOOTHNESS,
            viewport: Vec2::new(viewport_width, viewport_height),
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// ビューポートサイズを更新（リサイズ時）
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Vec2::new(width, height);
    }

    /// ワールド座標が画面中央に来るように目標を設定
    pub fn follow(&mut self, world: Vec2) {
        self.target = world - self.viewport * 0.5;
    }

    /// 目標を直接設定
    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    /// 目標までの残り距離がしきい値を超えているか
    pub fn is_settling(&self) -> bool {
        (self.target.x - self.position.x).abs() > CAMERA_APPLY_THRESHOLD
            || (self.target.y - self.position.y).abs() > CAMERA_APPLY_THRESHOLD
    }

    /// カメラを1フレーム更新
    ///
    /// 更新後もまだ目標から離れていれば、適用すべき表示位置を返します。
    /// 静止している間は`None`なので再描画を省略できます。
    pub fn update(&mut self) -> Option<Vec2> {
        self.position = self.position + (self.target - self.position) * self.smoothness;

        if self.is_settling() {
            Some(self.position)
        } else {
            None
        }
    }

    /// ワールド座標をスクリーン座標に変換
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world - self.position
    }

    /// スクリーン座標をワールド座標に変換
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen + self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_centers_target() {
        let mut camera = CameraController::new(Vec2::new(1500.0, 1500.0), 800.0, 600.0);
        camera.follow(Vec2::new(1000.0, 1000.0));
        assert_eq!(camera.target(), Vec2::new(600.0, 700.0));
    }

    #[test]
    fn test_update_moves_fraction_of_distance() {
        let mut camera = CameraController::new(Vec2::ZERO, 800.0, 600.0);
        camera.set_target(Vec2::new(100.0, -50.0));

        let applied = camera.update();
        assert_eq!(camera.position(), Vec2::new(10.0, -5.0));
        assert_eq!(applied, Some(Vec2::new(10.0, -5.0)));
    }

    #[test]
    fn test_converges_and_stops_applying() {
        let mut camera = CameraController::new(Vec2::ZERO, 800.0, 600.0);
        camera.set_target(Vec2::new(400.0, 300.0));

        let mut frames = 0;
        while camera.update().is_some() {
            frames += 1;
            assert!(frames < 200, "camera never settled");
        }
        assert!(!camera.is_settling());
        assert!((camera.position().x - 400.0).abs() <= CAMERA_APPLY_THRESHOLD);

        // 静止後は何度更新しても適用しない
        assert_eq!(camera.update(), None);
    }

    #[test]
    fn test_coordinate_conversion() {
        let mut camera = CameraController::new(Vec2::new(100.0, 100.0), 800.0, 600.0);
        camera.set_viewport(1024.0, 768.0);
        assert_eq!(camera.viewport(), Vec2::new(1024.0, 768.0));

        let screen = camera.world_to_screen(Vec2::new(200.0, 250.0));
        assert_eq!(screen, Vec2::new(100.0, 150.0));
        assert_eq!(camera.screen_to_world(screen), Vec2::new(200.0, 250.0));
    }
}
