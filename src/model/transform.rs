use nalgebra::{Matrix4, UnitQuaternion, Vector3};

/// モデルの位置・回転・スケール
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl ModelTransform {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>, scale: Vector3<f32>) -> Self {
        Self { position, rotation, scale }
    }

    /// 原点、回転なし、等倍
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    /// 最大成分を均一スケールとみなす
    pub fn uniform_scale(&self) -> f32 {
        self.scale.x.max(self.scale.y).max(self.scale.z)
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|v| v.is_finite())
    }

    /// T * R * S
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::identity()
    }
}
