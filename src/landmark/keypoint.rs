/// ポーズトラッカーの 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    const ALL: [LandmarkIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 単一ランドマーク
///
/// 信頼度はトラッカーが出力した時だけ `Some`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: Option<f32>,
    pub presence: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, visibility: None, presence: None }
    }

    pub fn with_confidence(mut self, visibility: f32, presence: f32) -> Self {
        self.visibility = Some(visibility);
        self.presence = Some(presence);
        self
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// 座標が有限で、出力された信頼度がすべて閾値以上か
    pub fn is_reliable(&self, threshold: f32) -> bool {
        let confident = |c: Option<f32>| c.map_or(true, |v| v.is_finite() && v >= threshold);
        self.is_finite() && confident(self.visibility) && confident(self.presence)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
        assert_eq!(LandmarkIndex::RightFootIndex as usize, 32);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(11), Some(LandmarkIndex::LeftShoulder));
        assert_eq!(LandmarkIndex::from_index(24), Some(LandmarkIndex::RightHip));
        assert_eq!(LandmarkIndex::from_index(33), None);
        for i in 0..LandmarkIndex::COUNT {
            assert_eq!(LandmarkIndex::from_index(i).map(|l| l as usize), Some(i));
        }
    }

    #[test]
    fn test_reliable_without_confidence() {
        // 信頼度が無ければ座標だけで判定
        assert!(Landmark::new(0.1, 0.2, 0.3).is_reliable(0.9));
        assert!(!Landmark::new(f32::NAN, 0.2, 0.3).is_reliable(0.0));
        assert!(!Landmark::new(0.0, f32::INFINITY, 0.0).is_reliable(0.0));
    }

    #[test]
    fn test_reliable_with_confidence() {
        let lm = Landmark::new(0.5, 0.5, 0.0).with_confidence(0.7, 0.95);
        assert!(lm.is_reliable(0.5));
        assert!(!lm.is_reliable(0.8));
    }

    #[test]
    fn test_nan_confidence_is_unreliable() {
        let lm = Landmark::new(0.5, 0.5, 0.0).with_confidence(f32::NAN, 1.0);
        assert!(!lm.is_reliable(0.0));
    }
}
