//! Minimal UI support types shared by the canvas and the shell

mod input;
mod rect;

pub use input::MouseState;
pub use rect::Rect;
