pub mod commands;
pub mod shared_str;
pub mod timeline;
pub mod types;

pub use commands::{RenderCommand, TextAlign};
pub use shared_str::SharedStr;
pub use timeline::{TimelineNode, node_count};
pub use types::{Color, Point, Rect};
