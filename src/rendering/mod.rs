//! レンダリングシステムモジュール
//!
//! Canvas 2Dへの描画を担当します。カメラとパーティクルはブラウザAPIに依存しない
//! サブモジュールに分けてあり、`Renderer`はそれらを読み取って描画するだけです。

pub mod camera;
pub mod particles;

pub use camera::CameraController;
pub use particles::{Particle, ParticleLayer, ParticleTemplate};

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement};

use crate::config::GameConfig;
use crate::error::GameError;
use crate::game::session::GameSession;
use crate::utils::math::Vec2;

/// 軌跡の線のスタイル
const TRACE_STROKE: &str = "rgba(255, 255, 255, 0.3)";
const TRACE_LINE_WIDTH: f64 = 16.0;

/// ワールド境界線の色
const BORDER_STROKE: &str = "rgba(255, 255, 255, 0.4)";

/// 名前ラベルのプレイヤー中心からのオフセット
const NAME_OFFSET_Y: f64 = 60.0;

/// レンダラー構造体
///
/// キャンバスとコンテキスト、カメラを管理します。
pub struct Renderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    camera: CameraController,
    /// カメラのオフセットをCSSで適用する要素（ゾーン表示など）
    overlay: Option<HtmlElement>,
}

impl Renderer {
    /// 新しいレンダラーを作成
    pub fn new(canvas_id: &str, config: &GameConfig) -> Result<Renderer, GameError> {
        let document = web_sys::window()
            .ok_or_else(|| GameError::Js("windowが取得できません".to_string()))?
            .document()
            .ok_or_else(|| GameError::Js("documentが取得できません".to_string()))?;

        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| GameError::Js(format!("キャンバス要素 {} が見つかりません", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| GameError::Js(format!("{} はキャンバス要素ではありません", canvas_id)))?;

        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| GameError::Js("2Dコンテキストが取得できません".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| GameError::Js("2Dコンテキストの型が不正です".to_string()))?;

        canvas.set_width(config.viewport_width as u32);
        canvas.set_height(config.viewport_height as u32);

        let (cx, cy) = config.world_center();
        let camera = CameraController::new(Vec2::new(cx, cy), config.viewport_width, config.viewport_height);

        log::info!("レンダラー初期化: {} ({}x{})", canvas_id, canvas.width(), canvas.height());

        Ok(Renderer {
            canvas,
            context,
            camera,
            overlay: None,
        })
    }

    /// カメラのオフセットを適用する要素を設定
    pub fn attach_overlay(&mut self, element_id: &str) -> Result<(), GameError> {
        let element = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(element_id))
            .ok_or_else(|| GameError::Js(format!("要素 {} が見つかりません", element_id)))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| GameError::Js(format!("{} はHTML要素ではありません", element_id)))?;
        self.overlay = Some(element);
        Ok(())
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraController {
        &mut self.camera
    }

    /// カメラを1フレーム進め、必要ならオーバーレイに反映
    pub fn update_camera(&mut self) -> Result<(), GameError> {
        if let Some(position) = self.camera.update() {
            if let Some(overlay) = &self.overlay {
                overlay
                    .style()
                    .set_property("transform", &format!("translate({}px, {}px)", -position.x, -position.y))?;
            }
        }
        Ok(())
    }

    /// キャンバスのサイズを設定（ウィンドウのリサイズ時）
    pub fn resize(&mut self, width: f64, height: f64) {
        self.canvas.set_width(width as u32);
        self.canvas.set_height(height as u32);
        self.camera.set_viewport(width, height);
    }

    /// キャンバスのサイズを取得
    pub fn size(&self) -> (f64, f64) {
        (self.canvas.width() as f64, self.canvas.height() as f64)
    }

    /// キャンバスをクリア
    pub fn clear(&self) {
        let (width, height) = self.size();
        self.context.clear_rect(0.0, 0.0, width, height);
    }

    /// セッションの状態を描画
    ///
    /// 描画順は 境界 → 軌跡 → パーティクル → リモートプレイヤー → ローカルプレイヤー です。
    pub fn render(&mut self, session: &GameSession, now_ms: f64) -> Result<(), GameError> {
        if let Some(position) = session.local_position() {
            self.camera.follow(position);
        }

        self.clear();
        self.draw_world_border(session.config());
        self.draw_trace(session);
        self.draw_particles(session.particles());

        let radius = session.config().player_radius;
        let registry = session.registry();
        for player in registry.remotes() {
            let position = session.display_position(player, now_ms);
            self.draw_player(position, radius, player.color.as_css(), &player.name, "12px sans-serif")?;
        }
        if let Some(local) = registry.local() {
            self.draw_player(local.position, radius, local.color.as_css(), &local.name, "bold 18px Arial")?;
        }

        Ok(())
    }

    fn draw_world_border(&self, config: &GameConfig) {
        let origin = self.camera.world_to_screen(Vec2::ZERO);
        self.context.set_stroke_style_str(BORDER_STROKE);
        self.context.set_line_width(config.world_border_width);
        self.context
            .stroke_rect(origin.x, origin.y, config.world_width, config.world_height);
    }

    fn draw_trace(&self, session: &GameSession) {
        let trace = session.trace();
        if trace.is_empty() {
            return;
        }

        self.context.save();
        self.context.set_stroke_style_str(TRACE_STROKE);
        self.context.set_line_width(TRACE_LINE_WIDTH);
        self.context.set_line_cap("round");
        self.context.set_line_join("round");
        self.context.begin_path();
        for (i, point) in trace.points().enumerate() {
            let screen = self.camera.world_to_screen(point.position);
            if i == 0 {
                self.context.move_to(screen.x, screen.y);
            } else {
                self.context.line_to(screen.x, screen.y);
            }
        }
        self.context.stroke();
        self.context.restore();
    }

    fn draw_particles(&self, particles: &ParticleLayer) {
        for particle in particles.iter() {
            let screen = self.camera.world_to_screen(particle.position);
            self.context.set_fill_style_str(particle.color);
            self.context.fill_rect(screen.x, screen.y, particle.size, particle.size);
        }
    }

    fn draw_player(&self, world: Vec2, radius: f64, color: &str, name: &str, font: &str) -> Result<(), GameError> {
        let screen = self.camera.world_to_screen(world);

        self.context.begin_path();
        self.context.set_fill_style_str(color);
        self.context.arc(screen.x, screen.y, radius, 0.0, std::f64::consts::TAU)?;
        self.context.fill();

        self.context.set_fill_style_str("white");
        self.context.set_font(font);
        self.context.set_text_align("center");
        self.context.set_text_baseline("top");
        self.context.fill_text(name, screen.x, screen.y + NAME_OFFSET_Y)?;
        Ok(())
    }
}
