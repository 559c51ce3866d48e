use nalgebra::Vector3;

use crate::config::Config;
use crate::smooth::ScalarSmoother;

/// 配置状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementState {
    /// 配置対象なし（未設定・取り外し・非表示）
    NoModel,
    /// カメラ前方の待機姿勢
    CameraFallback,
    /// 体に追従中
    BodyTracked,
}

/// トラッキングが途切れてもモデルを保持するカウントダウン
#[derive(Debug, Clone)]
pub struct VisibilityBuffer {
    window: u32,
    remaining: u32,
}

impl VisibilityBuffer {
    pub fn new(window: u32) -> Self {
        Self { window, remaining: 0 }
    }

    pub fn refresh(&mut self) {
        self.remaining = self.window;
    }

    /// 保持を続けるなら true（1フレーム消費）
    pub fn tick(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.remaining = 0;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// 一度だけ発火するフラグ（ログの洪水防止）
#[derive(Debug, Clone, Default)]
pub struct OneShot {
    fired: bool,
}

impl OneShot {
    /// 初回だけ true
    pub fn fire(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

#[derive(Debug, Clone, Default)]
pub struct Warnings {
    pub insufficient_landmarks: OneShot,
    pub anchor_fallback: OneShot,
    pub missing_bones: OneShot,
}

/// モデルごとの内部状態。`set_model` のたびに作り直す
#[derive(Debug, Clone)]
pub struct AnchorState {
    pub(crate) depth: ScalarSmoother,
    pub(crate) scaled: bool,
    pub(crate) base_offset: Vector3<f32>,
    /// 正規化後・等倍時のモデル寸法（スケール合わせの基準）
    pub(crate) rest_size: Vector3<f32>,
    pub(crate) visibility: VisibilityBuffer,
    pub(crate) warnings: Warnings,
}

impl AnchorState {
    pub fn new(config: &Config) -> Self {
        Self {
            depth: ScalarSmoother::new(config.depth.time_constant),
            scaled: false,
            base_offset: Vector3::zeros(),
            rest_size: Vector3::zeros(),
            visibility: VisibilityBuffer::new(config.placer.visibility_buffer_frames),
            warnings: Warnings::default(),
        }
    }

    pub fn smoothed_depth(&self) -> Option<f32> {
        self.depth.value()
    }

    pub fn is_scaled(&self) -> bool {
        self.scaled
    }

    pub fn base_offset(&self) -> Vector3<f32> {
        self.base_offset
    }

    pub fn rest_size(&self) -> Vector3<f32> {
        self.rest_size
    }

    pub fn visibility_remaining(&self) -> u32 {
        self.visibility.remaining()
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_counts_down() {
        let mut buf = VisibilityBuffer::new(3);
        assert!(!buf.tick());
        buf.refresh();
        assert!(buf.tick());
        assert!(buf.tick());
        assert!(buf.tick());
        assert!(!buf.tick());
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_buffer_clear() {
        let mut buf = VisibilityBuffer::new(10);
        buf.refresh();
        buf.clear();
        assert!(!buf.tick());
    }

    #[test]
    fn test_one_shot() {
        let mut flag = OneShot::default();
        assert!(flag.fire());
        assert!(!flag.fire());
        assert!(flag.has_fired());
        flag.reset();
        assert!(flag.fire());
    }

    #[test]
    fn test_anchor_state_fresh() {
        let state = AnchorState::new(&Config::default());
        assert!(!state.is_scaled());
        assert_eq!(state.smoothed_depth(), None);
        assert_eq!(state.visibility_remaining(), 0);
    }
}
