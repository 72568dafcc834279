pub mod animation;
pub mod audio;
pub mod behavior;
pub mod cache;
pub mod collision;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod event;
pub mod game;
pub mod input;
pub mod nodes;
pub mod scene;
pub mod time;
pub mod transform;
pub mod util;

pub use animation::{Animation, Animator, AnimatorMode, Easing, PlayState};
pub use behavior::{Behavior, Empty};
pub use cache::{AssetSource, Assets};
pub use config::{load_config_from_path, EngineConfig};
pub use context::{Env, NodeContext, ScreenInfo};
pub use device::{RecordingDevice, RenderDevice, Vertex};
pub use error::{EngineError, EngineResult};
pub use event::{EventSource, RawEvent, ScriptedEvents};
pub use game::Game;
pub use input::{InputState, Key, MouseButton};
pub use scene::{NodeData, NodeId, Scene};
pub use time::TimeState;
pub use transform::{Anchor, Rect};
pub use util::Color;
