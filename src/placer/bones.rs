use nalgebra::{UnitQuaternion, Vector3};

use crate::camera::CameraProjector;
use crate::config::BonesConfig;
use crate::landmark::{ArmSegment, LandmarkSnapshot};
use crate::model::ProxyModel;
use crate::smooth::nlerp;

/// 区間ラベルに対応するノード名
pub fn names_for(table: &BonesConfig, segment: ArmSegment) -> &[String] {
    match segment {
        ArmSegment::LeftUpperArm => &table.left_upper_arm,
        ArmSegment::LeftLowerArm => &table.left_lower_arm,
        ArmSegment::RightUpperArm => &table.right_upper_arm,
        ArmSegment::RightLowerArm => &table.right_lower_arm,
    }
}

/// 腕の区間 → モデルのノード
///
/// インデックスはランドマーク側の区間（`ArmSegment::slot`）。
/// ミラー時は反対側のラベルのノードを束ねる。
#[derive(Debug, Clone)]
pub struct BoneBinding<N> {
    segments: [Vec<N>; 4],
}

impl<N> Default for BoneBinding<N> {
    fn default() -> Self {
        Self { segments: [Vec::new(), Vec::new(), Vec::new(), Vec::new()] }
    }
}

impl<N: Copy + Eq> BoneBinding<N> {
    pub fn bind<M: ProxyModel<Node = N>>(model: &M, table: &BonesConfig, mirror: bool) -> Self {
        let mut binding = Self::default();
        for segment in ArmSegment::ALL {
            let label = if mirror { segment.mirrored() } else { segment };
            let nodes = &mut binding.segments[segment.slot()];
            for name in names_for(table, label) {
                for node in model.find_nodes(name) {
                    if !nodes.contains(&node) {
                        nodes.push(node);
                    }
                }
            }
        }
        binding
    }

    pub fn nodes(&self, segment: ArmSegment) -> &[N] {
        &self.segments[segment.slot()]
    }

    /// ノードが1つも見つからなかった区間
    pub fn missing(&self) -> Vec<ArmSegment> {
        ArmSegment::ALL
            .into_iter()
            .filter(|s| self.segments[s.slot()].is_empty())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }
}

/// ボーンの +Y を親ローカルの `direction` に向ける回転
///
/// 真逆の時は X 軸回りに半回転。
pub fn rotation_from_up(direction: &Vector3<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between(&Vector3::y(), direction)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f32::consts::PI))
}

/// 腕のボーンを観測された区間方向へ向ける
///
/// 端点が信頼できない・長さが潰れている区間は前フレームの姿勢のまま。
/// 更新したノード数を返す。
pub fn orient_segments<M: ProxyModel>(
    model: &mut M,
    binding: &BoneBinding<M::Node>,
    snapshot: &LandmarkSnapshot,
    camera: &dyn CameraProjector,
    threshold: f32,
    alpha: f32,
) -> usize {
    let mut updated = 0;
    for segment in ArmSegment::ALL {
        let nodes = binding.nodes(segment);
        if nodes.is_empty() {
            continue;
        }
        let (root, tip) = segment.endpoints();
        let (Some(a), Some(b)) = (
            snapshot.reliable_position(root, threshold),
            snapshot.reliable_position(tip, threshold),
        ) else {
            continue;
        };
        let world = camera.landmark_direction(&(b - a));
        let len = world.norm();
        if !len.is_finite() || len < 1e-3 {
            continue;
        }
        let world = world / len;

        for &node in nodes {
            let (Some(parent), Some(current)) = (model.parent_world_rotation(node), model.local_rotation(node)) else {
                continue;
            };
            let local = parent.inverse() * world;
            let target = rotation_from_up(&local);
            model.set_local_rotation(node, nlerp(&current, &target, alpha));
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::landmark::{Landmark, LandmarkIndex, TrackedRegion};
    use crate::model::{ModelTransform, NodeId, SceneModel};
    use nalgebra::Point3;

    fn rig() -> SceneModel {
        let mut model = SceneModel::new("rig");
        let body = model.add_node("Body", None, ModelTransform::identity());
        for name in ["L_UpperArm", "L_Arm", "R_UpperArm", "R_Arm"] {
            model.add_node(name, Some(body), ModelTransform::identity());
        }
        model
    }

    fn level_camera() -> PerspectiveCamera {
        PerspectiveCamera::new(Point3::new(0.0, 1.4, 0.0), UnitQuaternion::identity(), 60.0, 0.5625, 0.3)
    }

    #[test]
    fn test_bind_without_mirror() {
        let model = rig();
        let binding = BoneBinding::bind(&model, &BonesConfig::default(), false);
        assert_eq!(binding.nodes(ArmSegment::LeftUpperArm), model.find_nodes("L_UpperArm").as_slice());
        assert_eq!(binding.total(), 4);
        assert!(binding.missing().is_empty());
    }

    #[test]
    fn test_bind_with_mirror_swaps_sides() {
        let model = rig();
        let binding = BoneBinding::bind(&model, &BonesConfig::default(), true);
        assert_eq!(binding.nodes(ArmSegment::LeftUpperArm), model.find_nodes("R_UpperArm").as_slice());
        assert_eq!(binding.nodes(ArmSegment::RightLowerArm), model.find_nodes("L_Arm").as_slice());
    }

    #[test]
    fn test_bind_reports_missing() {
        let mut model = SceneModel::new("half");
        model.add_node("L_UpperArm", None, ModelTransform::identity());
        let binding = BoneBinding::bind(&model, &BonesConfig::default(), false);
        assert_eq!(binding.missing().len(), 3);
        assert!(!binding.missing().contains(&ArmSegment::LeftUpperArm));
    }

    #[test]
    fn test_rotation_from_up_antiparallel() {
        let q = rotation_from_up(&-Vector3::y());
        assert!((q * Vector3::y() + Vector3::y()).norm() < 1e-5);
        let q = rotation_from_up(&Vector3::x());
        assert!((q * Vector3::y() - Vector3::x()).norm() < 1e-5);
    }

    #[test]
    fn test_orient_segments_points_bone_along_arm() {
        let mut model = rig();
        let binding = BoneBinding::bind(&model, &BonesConfig::default(), false);
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.0); LandmarkIndex::COUNT];
        // 左腕を真横へ
        lms[LandmarkIndex::LeftShoulder as usize] = Landmark::new(0.6, 0.6, 0.0);
        lms[LandmarkIndex::LeftElbow as usize] = Landmark::new(0.8, 0.6, 0.0);
        lms[LandmarkIndex::LeftWrist as usize] = Landmark::new(0.8, 0.6, 0.0);
        let snapshot = LandmarkSnapshot::new(lms, TrackedRegion::default());

        let updated = orient_segments(&mut model, &binding, &snapshot, &level_camera(), 0.5, 1.0);
        // 左上腕のみ。他の区間は長さゼロ
        assert_eq!(updated, 1);
        let node: NodeId = model.find_nodes("L_UpperArm")[0];
        let q = model.local_rotation(node).unwrap();
        assert!((q * Vector3::y() - Vector3::x()).norm() < 1e-5);
    }

    #[test]
    fn test_orient_segments_skips_unreliable() {
        let mut model = rig();
        let binding = BoneBinding::bind(&model, &BonesConfig::default(), false);
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.0); LandmarkIndex::COUNT];
        lms[LandmarkIndex::LeftShoulder as usize] = Landmark::new(0.6, 0.6, 0.0);
        lms[LandmarkIndex::LeftElbow as usize] = Landmark::new(0.8, 0.6, 0.0).with_confidence(0.1, 0.1);
        let snapshot = LandmarkSnapshot::new(lms, TrackedRegion::default());

        assert_eq!(orient_segments(&mut model, &binding, &snapshot, &level_camera(), 0.5, 1.0), 0);
        let node = model.find_nodes("L_UpperArm")[0];
        assert_eq!(model.local_rotation(node).unwrap(), UnitQuaternion::identity());
    }
}
