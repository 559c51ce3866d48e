use anyhow::{Context, Result};
use nalgebra::{Matrix4, Point3, Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::{Aabb, ModelTransform, ProxyModel, RenderStats};

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("node `{node}` refers to unknown parent `{parent}` (parents must be listed first)")]
    UnknownParent { node: String, parent: String },
    #[error("node `{0}` has a degenerate rotation")]
    BadRotation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct Mesh {
    /// ノードローカルの箱
    bounds: Aabb,
    materials: usize,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct SceneNode {
    name: String,
    /// None ならモデルのルート直下
    parent: Option<NodeId>,
    local: ModelTransform,
    meshes: Vec<Mesh>,
}

/// メモリ上のシーングラフ
///
/// ルート変換がモデル全体の変換。ノードは親より後に並ぶ。
#[derive(Debug, Clone)]
pub struct SceneModel {
    name: String,
    root: ModelTransform,
    nodes: Vec<SceneNode>,
    active: bool,
}

impl SceneModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            root: ModelTransform::identity(),
            nodes: Vec::new(),
            active: true,
        }
    }

    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>, local: ModelTransform) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.to_string(),
            parent: parent.filter(|p| p.0 < id.0),
            local,
            meshes: Vec::new(),
        });
        id
    }

    pub fn add_mesh(&mut self, node: NodeId, bounds: Aabb, materials: usize) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.meshes.push(Mesh { bounds, materials, enabled: true });
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// ルートからノードまでの行列
    fn node_matrix(&self, node: NodeId) -> Matrix4<f32> {
        let mut m = Matrix4::identity();
        let mut cur = Some(node);
        while let Some(id) = cur {
            let n = &self.nodes[id.0];
            m = n.local.to_matrix() * m;
            cur = n.parent;
        }
        self.root.to_matrix() * m
    }

    fn chain_rotation(&self, node: Option<NodeId>) -> UnitQuaternion<f32> {
        let mut q = UnitQuaternion::identity();
        let mut cur = node;
        while let Some(id) = cur {
            let n = &self.nodes[id.0];
            q = n.local.rotation * q;
            cur = n.parent;
        }
        self.root.rotation * q
    }

    pub fn from_desc(desc: &SceneDesc) -> std::result::Result<Self, SceneError> {
        let mut model = SceneModel::new(&desc.name);
        for nd in &desc.nodes {
            let parent = match &nd.parent {
                Some(parent_name) => {
                    let found = model.nodes.iter().position(|n| &n.name == parent_name);
                    match found {
                        Some(i) => Some(NodeId(i)),
                        None => {
                            return Err(SceneError::UnknownParent {
                                node: nd.name.clone(),
                                parent: parent_name.clone(),
                            })
                        }
                    }
                }
                None => None,
            };
            let [x, y, z, w] = nd.rotation;
            let q = Quaternion::new(w, x, y, z);
            if !(q.norm() > 1e-6) {
                return Err(SceneError::BadRotation(nd.name.clone()));
            }
            let local = ModelTransform::new(
                Vector3::from(nd.translation),
                UnitQuaternion::from_quaternion(q),
                Vector3::from(nd.scale),
            );
            let id = model.add_node(&nd.name, parent, local);
            for mesh in &nd.meshes {
                model.nodes[id.0].meshes.push(Mesh {
                    bounds: Aabb::new(Point3::from(mesh.min), Point3::from(mesh.max)),
                    materials: mesh.materials,
                    enabled: mesh.enabled,
                });
            }
        }
        Ok(model)
    }

    /// JSONのシーン記述を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        let desc: SceneDesc = serde_json::from_str(&content).context("Failed to parse model file")?;
        Ok(Self::from_desc(&desc)?)
    }
}

impl ProxyModel for SceneModel {
    type Node = NodeId;

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> ModelTransform {
        self.root
    }

    fn set_transform(&mut self, transform: ModelTransform) {
        self.root = transform;
    }

    fn world_bounds(&self) -> Option<Aabb> {
        let mut out: Option<Aabb> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.meshes.is_empty() {
                continue;
            }
            let m = self.node_matrix(NodeId(i));
            for mesh in &node.meshes {
                let b = mesh.bounds.transformed(&m);
                match out.as_mut() {
                    Some(acc) => acc.encapsulate(&b),
                    None => out = Some(b),
                }
            }
        }
        out
    }

    fn find_nodes(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.name == name)
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    fn parent_world_rotation(&self, node: NodeId) -> Option<UnitQuaternion<f32>> {
        let n = self.nodes.get(node.0)?;
        Some(self.chain_rotation(n.parent))
    }

    fn local_rotation(&self, node: NodeId) -> Option<UnitQuaternion<f32>> {
        self.nodes.get(node.0).map(|n| n.local.rotation)
    }

    fn set_local_rotation(&mut self, node: NodeId, rotation: UnitQuaternion<f32>) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.local.rotation = rotation;
        }
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn render_stats(&self) -> RenderStats {
        let meshes = self.nodes.iter().flat_map(|n| n.meshes.iter());
        let mut stats = RenderStats::default();
        for mesh in meshes {
            stats.renderers += 1;
            if mesh.enabled {
                stats.enabled_renderers += 1;
            }
            stats.materials += mesh.materials;
        }
        stats
    }
}

// --- JSON記述 ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDesc {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDesc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub translation: [f32; 3],
    /// クォータニオン (x, y, z, w)
    #[serde(default = "default_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub meshes: Vec<MeshDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshDesc {
    pub min: [f32; 3],
    pub max: [f32; 3],
    #[serde(default = "default_materials")]
    pub materials: usize,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_rotation() -> [f32; 4] { [0.0, 0.0, 0.0, 1.0] }
fn default_scale() -> [f32; 3] { [1.0, 1.0, 1.0] }
fn default_materials() -> usize { 1 }
fn default_enabled() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> SceneModel {
        let mut model = SceneModel::new("shirt");
        let body = model.add_node("Body", None, ModelTransform::identity());
        model.add_mesh(body, Aabb::new(Point3::new(-0.3, 0.0, -0.1), Point3::new(0.3, 0.7, 0.1)), 2);
        let upper = model.add_node(
            "L_UpperArm",
            Some(body),
            ModelTransform::new(Vector3::new(0.3, 0.6, 0.0), UnitQuaternion::identity(), Vector3::repeat(1.0)),
        );
        model.add_mesh(upper, Aabb::new(Point3::new(0.0, -0.3, -0.05), Point3::new(0.1, 0.0, 0.05)), 1);
        model
    }

    #[test]
    fn test_world_bounds_includes_children() {
        let model = shirt();
        let b = model.world_bounds().unwrap();
        assert!((b.max.x - 0.4).abs() < 1e-5);
        assert!((b.max.y - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_world_bounds_follow_root_scale() {
        let mut model = shirt();
        let mut t = model.transform();
        t.scale = Vector3::repeat(2.0);
        t.position = Vector3::new(0.0, 1.0, 0.0);
        model.set_transform(t);
        let b = model.world_bounds().unwrap();
        assert!((b.min.y - 1.0).abs() < 1e-5);
        assert!((b.max.y - 2.4).abs() < 1e-5);
    }

    #[test]
    fn test_empty_model_has_no_bounds() {
        assert!(SceneModel::new("empty").world_bounds().is_none());
    }

    #[test]
    fn test_find_nodes_returns_all_matches() {
        let mut model = shirt();
        model.add_node("L_UpperArm", None, ModelTransform::identity());
        assert_eq!(model.find_nodes("L_UpperArm").len(), 2);
        assert!(model.find_nodes("R_UpperArm").is_empty());
    }

    #[test]
    fn test_parent_world_rotation_includes_root() {
        let mut model = shirt();
        let r = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0);
        let mut t = model.transform();
        t.rotation = r;
        model.set_transform(t);
        let node = model.find_nodes("L_UpperArm")[0];
        let q = model.parent_world_rotation(node).unwrap();
        assert!(q.angle_to(&r) < 1e-5);
    }

    #[test]
    fn test_render_stats() {
        let stats = shirt().render_stats();
        assert_eq!(stats.renderers, 2);
        assert_eq!(stats.enabled_renderers, 2);
        assert_eq!(stats.materials, 3);
    }

    #[test]
    fn test_from_desc_json() {
        let json = r#"{
            "name": "tops",
            "nodes": [
                { "name": "Body", "meshes": [ { "min": [-0.3, 0.0, -0.1], "max": [0.3, 0.7, 0.1] } ] },
                { "name": "R_UpperArm", "parent": "Body", "translation": [-0.3, 0.6, 0.0] }
            ]
        }"#;
        let desc: SceneDesc = serde_json::from_str(json).unwrap();
        let model = SceneModel::from_desc(&desc).unwrap();
        assert_eq!(model.node_count(), 2);
        assert_eq!(model.render_stats().materials, 1);
        assert_eq!(model.find_nodes("R_UpperArm"), vec![NodeId(1)]);
    }

    #[test]
    fn test_from_desc_unknown_parent() {
        let json = r#"{ "name": "bad", "nodes": [ { "name": "Arm", "parent": "Body" } ] }"#;
        let desc: SceneDesc = serde_json::from_str(json).unwrap();
        assert!(matches!(
            SceneModel::from_desc(&desc),
            Err(SceneError::UnknownParent { .. })
        ));
    }
}
