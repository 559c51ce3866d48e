use super::keypoint::LandmarkIndex;

/// 腕のボーン区間
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmSegment {
    LeftUpperArm,
    LeftLowerArm,
    RightUpperArm,
    RightLowerArm,
}

impl ArmSegment {
    pub const ALL: [ArmSegment; 4] = [
        ArmSegment::LeftUpperArm,
        ArmSegment::LeftLowerArm,
        ArmSegment::RightUpperArm,
        ArmSegment::RightLowerArm,
    ];

    /// 区間の (根元, 先端) ランドマーク
    pub fn endpoints(self) -> (LandmarkIndex, LandmarkIndex) {
        SEGMENT_CONNECTIONS[self.slot()]
    }

    /// ミラー時の反対側
    pub fn mirrored(self) -> Self {
        match self {
            ArmSegment::LeftUpperArm => ArmSegment::RightUpperArm,
            ArmSegment::LeftLowerArm => ArmSegment::RightLowerArm,
            ArmSegment::RightUpperArm => ArmSegment::LeftUpperArm,
            ArmSegment::RightLowerArm => ArmSegment::LeftLowerArm,
        }
    }

    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ArmSegment::LeftUpperArm => "left_upper_arm",
            ArmSegment::LeftLowerArm => "left_lower_arm",
            ArmSegment::RightUpperArm => "right_upper_arm",
            ArmSegment::RightLowerArm => "right_lower_arm",
        }
    }
}

/// 腕の接続定義 (開始ランドマーク, 終了ランドマーク)。`ArmSegment` の順
pub const SEGMENT_CONNECTIONS: [(LandmarkIndex, LandmarkIndex); 4] = [
    (LandmarkIndex::LeftShoulder, LandmarkIndex::LeftElbow),
    (LandmarkIndex::LeftElbow, LandmarkIndex::LeftWrist),
    (LandmarkIndex::RightShoulder, LandmarkIndex::RightElbow),
    (LandmarkIndex::RightElbow, LandmarkIndex::RightWrist),
];
