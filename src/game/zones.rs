//! ゾーン管理モジュール
//!
//! ワールドを3x3のゾーンに分割し、プレイヤーの最終位置とローカルプレイヤーの
//! 所属ゾーンを追跡します。ゾーン描画エフェクト用の軌跡（`DrawTrace`）もここで管理します。

use std::collections::{HashMap, VecDeque};

use crate::game::player::PlayerId;
use crate::utils::math::Vec2;

/// 中央の帯の幅（両軸共通）
pub const CENTER_BAND_SIZE: f64 = 300.0;

/// 軌跡ポイントの生存時間（ミリ秒）
pub const DRAW_TRACE_TTL_MS: f64 = 5000.0;

/// ゾーン識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneId {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Middle,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl ZoneId {
    const GRID: [[ZoneId; 3]; 3] = [
        [ZoneId::TopLeft, ZoneId::TopCenter, ZoneId::TopRight],
        [ZoneId::MiddleLeft, ZoneId::Middle, ZoneId::MiddleRight],
        [ZoneId::BottomLeft, ZoneId::BottomCenter, ZoneId::BottomRight],
    ];

    /// 列・行インデックス（0..3）から取得
    pub fn from_cell(column: usize, row: usize) -> ZoneId {
        Self::GRID[row.min(2)][column.min(2)]
    }

    /// 入ったときにハイライトされるゾーンか（四隅のみ）
    pub fn is_highlighted(self) -> bool {
        matches!(
            self,
            ZoneId::TopLeft | ZoneId::TopRight | ZoneId::BottomLeft | ZoneId::BottomRight
        )
    }

    /// ページ側の要素IDに対応する名前
    pub fn as_str(self) -> &'static str {
        match self {
            ZoneId::TopLeft => "top-left",
            ZoneId::TopCenter => "top-center",
            ZoneId::TopRight => "top-right",
            ZoneId::MiddleLeft => "middle-left",
            ZoneId::Middle => "middle",
            ZoneId::MiddleRight => "middle-right",
            ZoneId::BottomLeft => "bottom-left",
            ZoneId::BottomCenter => "bottom-center",
            ZoneId::BottomRight => "bottom-right",
        }
    }
}

/// ワールドの3x3分割
///
/// 各軸は `[0, side]`, `(side, side + center]`, `(side + center, dim]` の3帯で、
/// `side = (dim - center) / 2`。境界上の点は手前の帯に属します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneGrid {
    width: f64,
    height: f64,
    center: f64,
}

impl ZoneGrid {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            center: CENTER_BAND_SIZE,
        }
    }

    fn band(value: f64, dimension: f64, center: f64) -> usize {
        let side = (dimension - center) / 2.0;
        if value <= side {
            0
        } else if value <= side + center {
            1
        } else {
            2
        }
    }

    /// 座標が属するゾーン
    pub fn zone_at(&self, position: Vec2) -> ZoneId {
        let column = Self::band(position.x, self.width, self.center);
        let row = Self::band(position.y, self.height, self.center);
        ZoneId::from_cell(column, row)
    }
}

/// ローカルプレイヤーのゾーン移動
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTransition {
    pub previous: Option<ZoneId>,
    pub current: ZoneId,
    /// 新しいゾーンをハイライトするか
    pub highlighted: bool,
}

/// プレイヤー位置の変更通知を受け取るインターフェース
///
/// `PlayerRegistry`はすべての変更をこのトレイト経由で通知します。
pub trait PositionObserver {
    /// プレイヤーが追加・更新された
    fn player_tracked(&mut self, id: &str, position: Vec2);
    /// リモートプレイヤーが移動した
    fn player_moved(&mut self, id: &str, position: Vec2);
    /// ローカルプレイヤーが移動した
    fn local_player_moved(&mut self, id: &str, position: Vec2);
    /// プレイヤーが削除された
    fn player_removed(&mut self, id: &str);
}

/// ゾーントラッカー
#[derive(Debug, Clone)]
pub struct ZoneTracker {
    grid: ZoneGrid,
    positions: HashMap<PlayerId, Vec2>,
    current_zone: Option<ZoneId>,
    pending_transition: Option<ZoneTransition>,
}

impl ZoneTracker {
    pub fn new(grid: ZoneGrid) -> Self {
        Self {
            grid,
            positions: HashMap::new(),
            current_zone: None,
            pending_transition: None,
        }
    }

    pub fn grid(&self) -> &ZoneGrid {
        &self.grid
    }

    /// 最後に通知されたプレイヤー位置
    pub fn last_position(&self, id: &str) -> Option<Vec2> {
        self.positions.get(id).copied()
    }

    /// 追跡中のプレイヤー数
    pub fn tracked_count(&self) -> usize {
        self.positions.len()
    }

    /// ローカルプレイヤーが現在いるゾーン
    pub fn current_zone(&self) -> Option<ZoneId> {
        self.current_zone
    }

    /// 未処理のゾーン移動を取り出す
    pub fn take_transition(&mut self) -> Option<ZoneTransition> {
        self.pending_transition.take()
    }

    /// 位置を記録し、変化があったかを返す
    fn record(&mut self, id: &str, position: Vec2) -> bool {
        match self.positions.get_mut(id) {
            Some(last) if *last == position => false,
            Some(last) => {
                *last = position;
                true
            }
            None => {
                self.positions.insert(id.to_string(), position);
                true
            }
        }
    }
}

impl PositionObserver for ZoneTracker {
    fn player_tracked(&mut self, id: &str, position: Vec2) {
        self.record(id, position);
    }

    fn player_moved(&mut self, id: &str, position: Vec2) {
        self.record(id, position);
    }

    fn local_player_moved(&mut self, id: &str, position: Vec2) {
        self.record(id, position);

        let zone = self.grid.zone_at(position);
        if self.current_zone != Some(zone) {
            let transition = ZoneTransition {
                previous: self.current_zone,
                current: zone,
                highlighted: zone.is_highlighted(),
            };
            log::debug!("ゾーン移動: {:?} -> {:?}", transition.previous, zone);
            self.current_zone = Some(zone);
            self.pending_transition = Some(transition);
        }
    }

    fn player_removed(&mut self, id: &str) {
        self.positions.remove(id);
    }
}

/// 軌跡ポイント
#[derive(Debug, Clone, PartialEq)]
pub struct TracePoint {
    pub position: Vec2,
    pub zone: String,
    /// 送信側のタイムスタンプ（ミリ秒）
    pub timestamp: f64,
}

/// ゾーン描画用の軌跡
///
/// 古いポイントは経過時間で削除するので、削除の頻度はフレームレートに依存しません。
#[derive(Debug, Clone, Default)]
pub struct DrawTrace {
    points: VecDeque<TracePoint>,
}

impl DrawTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: TracePoint) {
        self.points.push_back(point);
    }

    /// `now - timestamp <= TTL`のポイントだけを残す（ちょうどTTLのものは残る）
    pub fn prune(&mut self, now_ms: f64) {
        self.points
            .retain(|point| now_ms - point.timestamp <= DRAW_TRACE_TTL_MS);
    }

    pub fn points(&self) -> impl Iterator<Item = &TracePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
