pub mod batch;
pub mod camera;
pub mod device;
pub mod gpu_context;
pub mod pipeline;
pub mod text;
pub mod texture;
pub mod vertex;

pub use batch::{DrawCall, QuadBatch};
pub use camera::{Camera2D, CameraUniform};
pub use device::{NoOverlay, OverlayPainter, RenderStats, WgpuDevice};
pub use gpu_context::GpuContext;
pub use pipeline::QuadPipeline;
pub use text::TextRasterizer;
pub use texture::GpuTexture;
pub use vertex::QuadVertex;
