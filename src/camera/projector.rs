use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::config::CameraConfig;

/// ビューポート ⇔ ワールドの変換
///
/// ビューポートは (x, y) が 0..1（左下原点）、z がカメラ前方への距離（メートル）。
/// 2つの変換は互いに逆写像であること。
pub trait CameraProjector {
    fn world_to_viewport(&self, point: &Point3<f32>) -> Vector3<f32>;
    fn viewport_to_world(&self, viewport: &Vector3<f32>) -> Point3<f32>;
    fn near_clip(&self) -> f32;
    fn forward(&self) -> Vector3<f32>;
    fn up(&self) -> Vector3<f32>;

    fn right(&self) -> Vector3<f32> {
        self.forward().cross(&self.up())
    }

    /// カメラ基準のランドマーク空間ベクトル（x右, y上, z前方）をワールド方向へ
    fn landmark_direction(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.right() * v.x + self.up() * v.y + self.forward() * v.z
    }
}

/// ピンホールカメラ。デフォルト姿勢で -Z を向き +Y が上
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    position: Point3<f32>,
    rotation: UnitQuaternion<f32>,
    tan_half_fov: f32,
    aspect: f32,
    near_clip: f32,
}

impl PerspectiveCamera {
    /// - fov_v_deg: 垂直画角（度）
    /// - aspect: 幅 / 高さ
    pub fn new(
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
        fov_v_deg: f32,
        aspect: f32,
        near_clip: f32,
    ) -> Self {
        Self {
            position,
            rotation,
            tan_half_fov: (fov_v_deg.to_radians() / 2.0).tan(),
            aspect,
            near_clip,
        }
    }

    /// 設定の FOV + 解像度 + 位置 + 回転 (Euler XYZ, 度) から構築
    pub fn from_config(config: &CameraConfig) -> Self {
        let [rx, ry, rz] = config.rotation_deg;
        let rotation =
            UnitQuaternion::from_euler_angles(rx.to_radians(), ry.to_radians(), rz.to_radians());
        let aspect = if config.height > 0 {
            config.width as f32 / config.height as f32
        } else {
            1.0
        };
        let [x, y, z] = config.position;
        Self::new(Point3::new(x, y, z), rotation, config.fov_v_deg, aspect, config.near_clip)
    }
}

impl CameraProjector for PerspectiveCamera {
    fn world_to_viewport(&self, point: &Point3<f32>) -> Vector3<f32> {
        let d = point - self.position;
        let depth = d.dot(&self.forward());
        // depth≈0 では無限大/NaN になり、呼び出し側のガードで弾かれる
        let half_h = depth * self.tan_half_fov;
        let half_w = half_h * self.aspect;
        Vector3::new(
            0.5 + d.dot(&self.right()) / (2.0 * half_w),
            0.5 + d.dot(&self.up()) / (2.0 * half_h),
            depth,
        )
    }

    fn viewport_to_world(&self, viewport: &Vector3<f32>) -> Point3<f32> {
        let depth = viewport.z;
        let half_h = depth * self.tan_half_fov;
        let half_w = half_h * self.aspect;
        self.position
            + self.forward() * depth
            + self.right() * ((viewport.x - 0.5) * 2.0 * half_w)
            + self.up() * ((viewport.y - 0.5) * 2.0 * half_h)
    }

    fn near_clip(&self) -> f32 {
        self.near_clip
    }

    fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::z()
    }

    fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }
}
