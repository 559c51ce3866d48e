use nalgebra::{Point3, UnitQuaternion, Vector2, Vector3};

use crate::camera::CameraProjector;
use crate::config::{AnchorConfig, DepthConfig};
use crate::landmark::{LandmarkIndex, LandmarkSnapshot};

const EPS: f32 = 1e-6;

/// 胴体の軸（ランドマーク空間）
#[derive(Debug, Clone, Copy)]
pub struct BodyAxes {
    pub left_shoulder: Vector3<f32>,
    pub right_shoulder: Vector3<f32>,
    pub shoulder_center: Vector3<f32>,
    pub hip_center: Vector3<f32>,
    /// 肩中心と腰中心の距離
    pub torso_height: f32,
    /// 腰 → 肩（正規化済み）
    pub body_up: Vector3<f32>,
    /// 左肩 → 右肩（正規化済み）。ミラー表示の正対でビューポート右向き
    pub body_right: Vector3<f32>,
}

impl BodyAxes {
    /// 両肩と両腰が信頼できて、胴体が潰れていない時だけ Some
    pub fn from_snapshot(snapshot: &LandmarkSnapshot, threshold: f32) -> Option<Self> {
        let ls = snapshot.reliable_position(LandmarkIndex::LeftShoulder, threshold)?;
        let rs = snapshot.reliable_position(LandmarkIndex::RightShoulder, threshold)?;
        let lh = snapshot.reliable_position(LandmarkIndex::LeftHip, threshold)?;
        let rh = snapshot.reliable_position(LandmarkIndex::RightHip, threshold)?;

        let shoulder_center = (ls + rs) * 0.5;
        let hip_center = (lh + rh) * 0.5;
        let up = shoulder_center - hip_center;
        let torso_height = up.norm();
        if !torso_height.is_finite() || torso_height < EPS {
            return None;
        }
        let across = rs - ls;
        let shoulder_width = across.norm();
        if !shoulder_width.is_finite() || shoulder_width < EPS {
            return None;
        }

        Some(Self {
            left_shoulder: ls,
            right_shoulder: rs,
            shoulder_center,
            hip_center,
            torso_height,
            body_up: up / torso_height,
            body_right: across / shoulder_width,
        })
    }

    pub fn shoulder_width(&self) -> f32 {
        (self.left_shoulder - self.right_shoulder).norm()
    }
}

/// 0..1 に正規化した逆補間
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < EPS {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// 正規化胴体高さ → 目標深度
///
/// 小さく映るほど遠い。[torso_small, torso_large] を [far, near] に線形で割り当てる。
pub fn target_depth(normalized_torso: f32, config: &DepthConfig) -> f32 {
    let t = inverse_lerp(config.torso_small, config.torso_large, normalized_torso);
    config.far + (config.near - config.far) * t
}

/// トラッキング領域の高さで割った胴体高さ
pub fn normalized_torso(axes: &BodyAxes, snapshot: &LandmarkSnapshot) -> Option<f32> {
    let region_height = snapshot.region().height();
    if !(region_height.abs() > EPS) {
        return None;
    }
    let n = axes.torso_height / region_height.abs();
    n.is_finite().then_some(n)
}

/// アンカーのビューポート座標
///
/// 基準点 + 鼻のずれ * face_follow + 水平バイアス。0..1 にクランプ。
pub fn viewport_anchor(snapshot: &LandmarkSnapshot, config: &AnchorConfig, threshold: f32) -> Vector2<f32> {
    let follow = snapshot
        .viewport(LandmarkIndex::Nose, threshold)
        .map(|nose| (nose - Vector2::new(0.5, 0.5)) * config.face_follow)
        .unwrap_or_else(Vector2::zeros);
    Vector2::new(
        (config.viewport_x + follow.x + config.horizontal_bias).clamp(0.0, 1.0),
        (config.viewport_y + follow.y).clamp(0.0, 1.0),
    )
}

/// 体の向き（カメラと正対した状態からのyaw、ラジアン）
///
/// 体の正面ベクトルをカメラの水平面に投影し、カメラへ向かう方向からの符号付き角度を返す。
/// 真上/真下を向いているなど投影が潰れる時は None。
pub fn body_yaw(axes: &BodyAxes, camera: &dyn CameraProjector) -> Option<f32> {
    let up = camera.landmark_direction(&axes.body_up);
    let right = camera.landmark_direction(&axes.body_right);
    // ランドマーク空間→ワールドは左手系から右手系への写像なので外積の順が逆になる
    let facing = right.cross(&up);

    let axis = camera.up();
    let flat = facing - axis * facing.dot(&axis);
    let toward_camera = -camera.forward();
    let reference = toward_camera - axis * toward_camera.dot(&axis);
    if flat.norm_squared() < EPS || reference.norm_squared() < EPS {
        return None;
    }
    let (a, b) = (reference.normalize(), flat.normalize());
    let yaw = a.cross(&b).dot(&axis).atan2(a.dot(&b));
    yaw.is_finite().then_some(yaw)
}

/// カメラの水平前方を基準にした Y 軸回りの回転
///
/// カメラが真上/真下を向いていて水平前方が無い時は None。
pub fn facing_rotation(camera: &dyn CameraProjector, yaw: f32) -> Option<UnitQuaternion<f32>> {
    let forward = camera.forward();
    let flat = Vector3::new(forward.x, 0.0, forward.z);
    if flat.norm_squared() < EPS {
        return None;
    }
    let base = UnitQuaternion::face_towards(&flat, &Vector3::y());
    Some(base * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw))
}

/// 安全側の距離（ニアクリップより十分奥）
pub fn fallback_depth(camera: &dyn CameraProjector, config: &DepthConfig) -> f32 {
    config.fallback.max(camera.near_clip() + 0.5)
}

/// 前方ガードの結果
#[derive(Debug, Clone, Copy)]
pub struct Guarded {
    pub point: Point3<f32>,
    /// 置き換えが起きたか
    pub replaced: bool,
}

/// ワールド点がカメラ前方の視錐台内にあることを保証する
///
/// 無効値・背後・ニアクリップ付近・極端に遠い・画面外の点は、
/// 安全な距離のビューポート点に置き換える。置き換え先すら有限でなければ None。
pub fn ensure_in_front(point: &Point3<f32>, camera: &dyn CameraProjector, config: &DepthConfig) -> Option<Guarded> {
    let depth = fallback_depth(camera, config);
    let replace = |x: f32, y: f32| {
        let p = camera.viewport_to_world(&Vector3::new(x, y, depth));
        p.iter().all(|v| v.is_finite()).then_some(Guarded { point: p, replaced: true })
    };

    if !point.iter().all(|v| v.is_finite()) {
        return replace(0.5, 0.5);
    }

    let view = camera.world_to_viewport(point);
    let invalid = !view.iter().all(|v| v.is_finite());
    let behind = !invalid && view.z <= camera.near_clip() + config.near_clip_margin;
    let extreme = !invalid && view.z > config.max_distance;
    let offscreen = !invalid && !((0.0..=1.0).contains(&view.x) && (0.0..=1.0).contains(&view.y));

    if !(invalid || behind || extreme || offscreen) {
        return Some(Guarded { point: *point, replaced: false });
    }
    if invalid || offscreen {
        replace(0.5, 0.5)
    } else {
        replace(view.x.clamp(0.0, 1.0), view.y.clamp(0.0, 1.0))
    }
}
