use nalgebra::{Vector2, Vector3};

use super::keypoint::{Landmark, LandmarkIndex};

/// 信頼判定に必須のスロット（鼻・両肩）
const REQUIRED_SLOTS: [LandmarkIndex; 3] = [
    LandmarkIndex::Nose,
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
];

/// ビューポートに対応するランドマーク空間上の矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedRegion {
    pub min: Vector2<f32>,
    pub size: Vector2<f32>,
}

impl TrackedRegion {
    pub fn new(min: [f32; 2], size: [f32; 2]) -> Self {
        Self {
            min: Vector2::new(min[0], min[1]),
            size: Vector2::new(size[0], size[1]),
        }
    }

    /// ランドマーク → ビューポート (0..1, 上が+y)
    pub fn to_viewport(&self, landmark: &Landmark) -> Vector2<f32> {
        Vector2::new(
            (landmark.x - self.min.x) / self.size.x,
            (landmark.y - self.min.y) / self.size.y,
        )
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }
}

impl Default for TrackedRegion {
    fn default() -> Self {
        Self::new([0.0, 0.0], [1.0, 1.0])
    }
}

/// 1トラッキングフレーム分のランドマーク
///
/// 座標系はカメラ基準: +x ビューポート右, +y ビューポート上, +z カメラ前方。
/// 他の形式は `from_normalized_image` などで境界で変換する。
#[derive(Debug, Clone, Default)]
pub struct LandmarkSnapshot {
    landmarks: Vec<Landmark>,
    region: TrackedRegion,
}

impl LandmarkSnapshot {
    pub fn new(landmarks: Vec<Landmark>, region: TrackedRegion) -> Self {
        Self { landmarks, region }
    }

    /// トラッカーの正規化画像座標（x右, y下, z手前が負）から変換
    pub fn from_normalized_image(landmarks: impl IntoIterator<Item = Landmark>) -> Self {
        let landmarks = landmarks
            .into_iter()
            .map(|lm| Landmark { x: lm.x, y: 1.0 - lm.y, z: -lm.z, ..lm })
            .collect();
        Self { landmarks, region: TrackedRegion::default() }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn region(&self) -> &TrackedRegion {
        &self.region
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(index as usize)
    }

    /// 閾値を満たす時だけ座標を返す
    pub fn reliable_position(&self, index: LandmarkIndex, threshold: f32) -> Option<Vector3<f32>> {
        self.get(index)
            .filter(|lm| lm.is_reliable(threshold))
            .map(|lm| Vector3::new(lm.x, lm.y, lm.z))
    }

    pub fn viewport(&self, index: LandmarkIndex, threshold: f32) -> Option<Vector2<f32>> {
        self.get(index)
            .filter(|lm| lm.is_reliable(threshold))
            .map(|lm| self.region.to_viewport(lm))
            .filter(|v| v.x.is_finite() && v.y.is_finite())
    }

    /// 鼻と両肩が揃っているか
    pub fn is_reliable(&self, threshold: f32) -> bool {
        REQUIRED_SLOTS
            .iter()
            .all(|&idx| self.get(idx).map_or(false, |lm| lm.is_reliable(threshold)))
    }
}
