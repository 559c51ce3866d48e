use nalgebra::{Matrix4, Point3, Vector3};

/// 軸平行バウンディングボックス
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    pub fn encapsulate_point(&mut self, p: &Point3<f32>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn encapsulate(&mut self, other: &Aabb) {
        self.encapsulate_point(&other.min);
        self.encapsulate_point(&other.max);
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// アフィン変換後の8頂点を包む箱
    pub fn transformed(&self, m: &Matrix4<f32>) -> Aabb {
        let corners = self.corners().map(|c| m.transform_point(&c));
        let mut out = Aabb::new(corners[0], corners[0]);
        for c in &corners[1..] {
            out.encapsulate_point(c);
        }
        out
    }

    /// 水平方向は中心、垂直方向は下端から `height_fraction` の位置
    pub fn anchor_point(&self, height_fraction: f32) -> Point3<f32> {
        let c = self.center();
        let t = height_fraction.clamp(0.0, 1.0);
        Point3::new(c.x, self.min.y + self.size().y * t, c.z)
    }

    /// 底面中心
    pub fn bottom_center(&self) -> Point3<f32> {
        self.anchor_point(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }
}
