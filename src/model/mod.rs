pub mod bounds;
pub mod scene;
pub mod transform;

use nalgebra::UnitQuaternion;

pub use bounds::Aabb;
pub use scene::{NodeId, SceneModel};
pub use transform::ModelTransform;

/// レンダラー・マテリアルの集計（診断ログ用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub renderers: usize,
    pub enabled_renderers: usize,
    pub materials: usize,
}

/// 体に着せる3Dモデル
///
/// プレーサーが所有している間は、他から変換を書き換えないこと。
pub trait ProxyModel {
    type Node: Copy + Eq + std::fmt::Debug;

    fn name(&self) -> &str;

    fn transform(&self) -> ModelTransform;
    fn set_transform(&mut self, transform: ModelTransform);

    /// 全メッシュを包むワールド空間の箱。毎回ジオメトリから計算する
    fn world_bounds(&self) -> Option<Aabb>;

    /// 名前が一致するノードをすべて返す
    fn find_nodes(&self, name: &str) -> Vec<Self::Node>;
    fn parent_world_rotation(&self, node: Self::Node) -> Option<UnitQuaternion<f32>>;
    fn local_rotation(&self, node: Self::Node) -> Option<UnitQuaternion<f32>>;
    fn set_local_rotation(&mut self, node: Self::Node, rotation: UnitQuaternion<f32>);

    fn set_active(&mut self, active: bool);
    fn is_active(&self) -> bool;

    fn render_stats(&self) -> RenderStats;
}
