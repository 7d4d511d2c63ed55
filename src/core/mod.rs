//! Client core: wire protocol, request correlation and the screen model.
//!
//! - **protocol**: message tags, request builders and server event decoding
//! - **transport**: request ids, pending replies and the `Channel` seam
//! - **dispatch**: handler registry keyed by message tag
//! - **term**: attribute words, row decoding and the cell grid
//! - **session**: startup, routing and the operations the UI calls
//! - **net**: newline-delimited JSON over TCP
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Transport (TcpChannel, pending replies)
//! ├── Dispatcher (server events -> View)
//! └── View
//!     ├── Console (TerminalGrid + Renderer + Surface)
//!     └── ChatLog
//! ```

pub mod dispatch;
pub mod net;
pub mod protocol;
pub mod session;
pub mod term;
pub mod transport;
