pub mod events;
pub mod window;

pub use events::{map_key, map_mouse_button, translate_window_event};
pub use window::{apply_window_request, create_window, PlatformConfig};
