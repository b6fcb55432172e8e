//! プレイヤーレジストリ
//!
//! ピアIDからプレイヤーへの対応を保持します。変更はネットワークの
//! ライフサイクルイベントとローカルプレイヤーの移動からのみ行われ、
//! すべての変更は`PositionObserver`に通知されます。

use std::collections::HashMap;

use crate::error::GameError;
use crate::game::player::{MovementParams, Player, PlayerAttrs, PlayerId};
use crate::game::zones::{PositionObserver, ZoneTracker};
use crate::input::MovementIntent;
use crate::utils::math::Vec2;

/// `upsert_from_snapshot`の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// プレイヤーレジストリ
#[derive(Debug)]
pub struct PlayerRegistry<O: PositionObserver = ZoneTracker> {
    players: HashMap<PlayerId, Player>,
    local_id: Option<PlayerId>,
    observer: O,
}

impl<O: PositionObserver> PlayerRegistry<O> {
    pub fn new(observer: O) -> Self {
        Self {
            players: HashMap::new(),
            local_id: None,
            observer,
        }
    }

    /// プレイヤーを追加、または既存プレイヤーの属性を更新
    ///
    /// 同じIDで何度呼んでもエンティティは1つだけです。ローカルプレイヤーの位置は
    /// ネットワークの値で上書きしません。
    pub fn upsert_from_snapshot(&mut self, id: &str, attrs: PlayerAttrs) -> Result<Upsert, GameError> {
        if !attrs.position().is_finite() {
            return Err(GameError::InvalidPayload(format!(
                "player {} has non-finite position ({}, {})",
                id, attrs.x, attrs.y
            )));
        }

        let is_local = self.is_local(id);
        let (outcome, position) = match self.players.get_mut(id) {
            Some(player) => {
                let kept = player.position;
                player.apply_attrs(attrs);
                if is_local {
                    player.position = kept;
                }
                (Upsert::Updated, player.position)
            }
            None => {
                let player = Player::new(id.to_string(), attrs);
                let position = player.position;
                self.players.insert(id.to_string(), player);
                (Upsert::Inserted, position)
            }
        };

        self.observer.player_tracked(id, position);
        Ok(outcome)
    }

    /// 既存プレイヤーをローカルプレイヤーに指定
    pub fn set_local(&mut self, id: &str) -> Result<&mut Player, GameError> {
        if !self.players.contains_key(id) {
            return Err(GameError::InvalidPayload(format!("local player {} is not in the roster", id)));
        }
        self.local_id = Some(id.to_string());
        self.players.get_mut(id).ok_or(GameError::NotJoined)
    }

    /// ローカルプレイヤーを指定位置に置く（参加直後の初期配置）
    pub fn place_local(&mut self, position: Vec2) -> Option<&mut Player> {
        let id = self.local_id.as_deref()?;
        let player = self.players.get_mut(id)?;
        player.position = position;
        player.velocity = Vec2::ZERO;
        self.observer.local_player_moved(id, position);
        Some(player)
    }

    /// リモートプレイヤーの位置を反映
    ///
    /// ローカルプレイヤーと未知のIDは無視し、`Ok(false)`を返します。
    pub fn apply_remote_move(&mut self, id: &str, position: Vec2) -> Result<bool, GameError> {
        if !position.is_finite() {
            return Err(GameError::InvalidPayload(format!(
                "move for {} has non-finite position ({}, {})",
                id, position.x, position.y
            )));
        }
        if self.is_local(id) {
            return Ok(false);
        }

        match self.players.get_mut(id) {
            Some(player) => {
                player.position = position;
                self.observer.player_moved(id, position);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// プレイヤーを削除（未知のIDは何もしない）
    pub fn remove(&mut self, id: &str) -> Option<Player> {
        let removed = self.players.remove(id)?;
        if self.is_local(id) {
            self.local_id = None;
        }
        self.observer.player_removed(id);
        Some(removed)
    }

    /// 全プレイヤーを削除（切断時）
    pub fn clear(&mut self) {
        for id in self.players.keys() {
            self.observer.player_removed(id);
        }
        self.players.clear();
        self.local_id = None;
    }

    /// ローカルプレイヤーを1ティック進める
    ///
    /// ローカルプレイヤーがいなければ`None`、いれば静止していないかどうかを返します。
    pub fn advance_local(&mut self, intent: &MovementIntent, params: &MovementParams) -> Option<bool> {
        let id = self.local_id.as_deref()?;
        let player = self.players.get_mut(id)?;
        let moving = player.integrate(intent, params);
        self.observer.local_player_moved(id, player.position);
        Some(moving)
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// ローカル以外のプレイヤー
    pub fn remotes(&self) -> impl Iterator<Item = &Player> {
        let local = self.local_id.clone();
        self.players
            .values()
            .filter(move |player| local.as_deref() != Some(player.id.as_str()))
    }

    pub fn local(&self) -> Option<&Player> {
        self.local_id.as_deref().and_then(|id| self.players.get(id))
    }

    pub fn local_mut(&mut self) -> Option<&mut Player> {
        let id = self.local_id.as_deref()?;
        self.players.get_mut(id)
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    pub fn is_local(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}
