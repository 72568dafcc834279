use crate::behavior::Behavior;
use crate::cache::{source_label, OwnedSource};
use crate::context::NodeContext;
use crate::device::{check_geometry, TextureInfo, Vertex};
use crate::error::{EngineError, EngineResult};
use crate::scene::{NodeId, Scene};
use glam::Vec2;
use std::borrow::Cow;
use std::path::PathBuf;

/// An indexed triangle mesh, optionally textured.
///
/// Vertex positions are relative to the top-left of the node's world rect,
/// so moving the node moves the mesh. The rect itself is not resized.
#[derive(Debug, Clone, Default)]
pub struct VertexNode {
    source: Option<OwnedSource>,
    texture: Option<TextureInfo>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl VertexNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a triangle list. Malformed meshes are rejected up front.
    pub fn from_mesh(vertices: Vec<Vertex>, indices: Vec<u32>) -> EngineResult<Self> {
        let mut node = Self::new();
        node.set_mesh(vertices, indices)?;
        Ok(node)
    }

    pub fn with_texture_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(OwnedSource::Path(path.into()));
        self
    }

    pub fn with_texture_bytes(mut self, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        self.source = Some(OwnedSource::Bytes(bytes.into()));
        self
    }

    pub fn with_texture(mut self, texture: TextureInfo) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn texture(&self) -> Option<TextureInfo> {
        self.texture
    }

    pub fn clear_texture(&mut self) {
        self.texture = None;
    }

    /// Replace the mesh. On error the previous mesh is kept.
    pub fn set_mesh(&mut self, vertices: Vec<Vertex>, indices: Vec<u32>) -> EngineResult<()> {
        check_geometry(&vertices, &indices)?;
        self.vertices = vertices;
        self.indices = indices;
        Ok(())
    }

    /// Replace the mesh on a live node.
    pub fn set_mesh_on(
        scene: &mut Scene,
        id: NodeId,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    ) -> EngineResult<()> {
        scene
            .behavior_mut::<VertexNode>(id)
            .ok_or_else(|| EngineError::misuse(format!("{id:?} is not a vertex node")))?
            .set_mesh(vertices, indices)
    }

    fn load(&mut self, ctx: &mut NodeContext<'_, '_>) {
        if let Some(source) = self.source.take() {
            match ctx.load_texture(source.as_source()) {
                Ok(info) => self.texture = Some(info),
                Err(e) => log::error!(
                    "Failed to load mesh texture {}: {e}",
                    source_label(source.as_source())
                ),
            }
        }
    }
}

impl Behavior for VertexNode {
    fn start(&mut self, ctx: &mut NodeContext<'_, '_>) {
        self.load(ctx);
    }

    fn render(&mut self, ctx: &mut NodeContext<'_, '_>) {
        if self.indices.is_empty() {
            return;
        }
        let world = ctx.world_rect();
        let origin = Vec2::new(world.x, world.y);
        let placed: Vec<Vertex> = self
            .vertices
            .iter()
            .map(|v| Vertex {
                position: origin + v.position,
                ..*v
            })
            .collect();
        let texture = self.texture.map(|t| t.handle);
        ctx.device().draw_geometry(texture, &placed, &self.indices);
    }
}
