//! Built-in node kinds.

pub mod image;
pub mod rect;
pub mod sprite;
pub mod text;
pub mod vertex;

pub use image::ImageNode;
pub use rect::RectNode;
pub use sprite::{SpriteNode, DEFAULT_FRAME_SPEED};
pub use text::TextNode;
pub use vertex::VertexNode;
