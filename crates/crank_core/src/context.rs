//! What a hook can see: the scene it lives in and a read-only snapshot of the
//! frame (input, timing, screen), plus the render device and asset caches.

use crate::behavior::Behavior;
use crate::cache::{AssetSource, Assets};
use crate::device::{FontHandle, RenderDevice, TextureInfo};
use crate::error::EngineResult;
use crate::input::InputState;
use crate::scene::{NodeData, NodeId, Scene};
use crate::time::TimeState;
use crate::transform::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenInfo {
    /// Logical size of the drawable area.
    pub width: u32,
    pub height: u32,
    /// Device pixels per logical pixel.
    pub dpi_scale: f32,
    pub focused: bool,
}

impl ScreenInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            dpi_scale: 1.0,
            focused: true,
        }
    }

    pub fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

/// Frame-wide state lent to the scene for one phase. The root context is the
/// only writer of input and timing; nodes only read them.
pub struct Env<'a> {
    pub input: &'a InputState,
    pub time: &'a TimeState,
    pub screen: &'a ScreenInfo,
    pub device: &'a mut dyn RenderDevice,
    pub assets: &'a mut Assets,
    pub quit: &'a mut bool,
}

pub struct NodeContext<'a, 'e> {
    id: NodeId,
    pub scene: &'a mut Scene,
    pub env: &'a mut Env<'e>,
}

impl<'a, 'e> NodeContext<'a, 'e> {
    pub fn new(id: NodeId, scene: &'a mut Scene, env: &'a mut Env<'e>) -> Self {
        Self { id, scene, env }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node whose hook is running. It stays in the arena until its
    /// `on_destroy` hook has returned.
    pub fn node(&self) -> &NodeData {
        &self.scene[self.id]
    }

    pub fn node_mut(&mut self) -> &mut NodeData {
        &mut self.scene[self.id]
    }

    pub fn world_rect(&self) -> Rect {
        self.scene.world_rect(self.id).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.node().parent()
    }

    pub fn add_child<B: Behavior>(&mut self, behavior: B) -> NodeId {
        self.scene.add_child(self.id, behavior)
    }

    /// Mark this node and its subtree for removal at the end of the frame.
    pub fn destroy(&mut self) {
        self.scene.destroy(self.id);
    }

    pub fn input(&self) -> &InputState {
        self.env.input
    }

    pub fn time(&self) -> &TimeState {
        self.env.time
    }

    pub fn screen(&self) -> &ScreenInfo {
        self.env.screen
    }

    pub fn viewport(&self) -> Rect {
        self.env.screen.viewport()
    }

    pub fn device(&mut self) -> &mut dyn RenderDevice {
        &mut *self.env.device
    }

    pub fn load_texture(&mut self, source: AssetSource<'_>) -> EngineResult<TextureInfo> {
        let env = &mut *self.env;
        env.assets.texture(&mut *env.device, source)
    }

    pub fn load_font(&mut self, source: AssetSource<'_>, point_size: f32) -> EngineResult<FontHandle> {
        let env = &mut *self.env;
        env.assets.font(&mut *env.device, source, point_size)
    }

    pub fn assets(&mut self) -> &mut Assets {
        &mut *self.env.assets
    }

    /// Ask the loop to stop after the current frame.
    pub fn quit(&mut self) {
        *self.env.quit = true;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::device::RecordingDevice;

    /// Owns everything an `Env` borrows, for driving a bare `Scene`.
    pub struct Harness {
        pub input: InputState,
        pub time: TimeState,
        pub screen: ScreenInfo,
        pub device: RecordingDevice,
        pub assets: Assets,
        pub quit: bool,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                input: InputState::new(),
                time: TimeState::new(),
                screen: ScreenInfo::new(800, 600),
                device: RecordingDevice::new(),
                assets: Assets::new(),
                quit: false,
            }
        }

        pub fn env(&mut self) -> Env<'_> {
            Env {
                input: &self.input,
                time: &self.time,
                screen: &self.screen,
                device: &mut self.device,
                assets: &mut self.assets,
                quit: &mut self.quit,
            }
        }
    }
}
