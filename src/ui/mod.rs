//! Display and input.
//!
//! - **surface**: the drawing surface trait and an in-memory canvas
//! - **renderer**: paints grid cells onto a surface
//! - **console**: grid plus renderer, collecting damage
//! - **chat**: chat, status and error lines
//! - **keymapper**: key events to key codes
//! - **presenter**: shows the canvas in the host terminal

pub mod chat;
pub mod console;
pub mod keymapper;
pub mod presenter;
pub mod renderer;
pub mod surface;

pub use keymapper::KeyMapper;
pub use presenter::{Overlay, Presenter};
pub use surface::Canvas;
