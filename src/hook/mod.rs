//! The outbound message hook.
//!
//! For each message about to be sent, [`Imagify::before_send`] decides through
//! a [`Trigger`] whether to convert it, serializes the elements to markup,
//! looks the markup up in the image cache, renders it on the worker pool on a
//! miss, and replaces the elements with the image.
//!
//! ```text
//! OutboundMessage ─► Trigger ─► serialize ─► TieredCache ─(miss)─► WorkerPool
//!                                                 │                   │
//!                                                 └──── image ◄───────┘
//! ```

mod message;
mod service;
mod trigger;

pub use message::{MessageSession, OutboundMessage};
pub use service::{data_url, image_element, HookOutcome, Imagify};
pub use trigger::{Trigger, DEFAULT_MAX_LENGTH, DEFAULT_MAX_LINE_COUNT};
