/// 追従点マーカーの見た目を受け取る側
pub trait PointAnnotation {
    fn set_color(&mut self, rgb: u32);
    fn set_radius(&mut self, radius: f32);
}

/// マーカーの色（0xRRGGBB）と半径
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    pub color: u32,
    pub radius: f32,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self { color: 0x00FF00, radius: 15.0 }
    }
}

impl PointStyle {
    pub fn apply(&self, sink: &mut dyn PointAnnotation) {
        sink.set_color(self.color);
        sink.set_radius(self.radius);
    }
}
