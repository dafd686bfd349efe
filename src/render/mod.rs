//! Rendering of serialized markup into images.
//!
//! ```text
//! ┌──────────────┐   render_image()   ┌──────────────┐
//! │  WorkerPool  │ ─────────────────► │ RenderBackend│  (browser, headless
//! │  N sessions  │ ◄───────────────── │   sessions   │   renderer, mock...)
//! └──────────────┘   JPEG/PNG bytes   └──────────────┘
//! ```
//!
//! - [`RenderBackend`]: trait implemented by the actual renderer
//! - [`WorkerPool`]: fixed set of open sessions handed out one job at a time
//! - [`PageTemplate`]: the page each session is opened with

mod backend;
mod pool;
mod template;

pub use backend::{CaptureRegion, Dimensions, RenderBackend};
pub use pool::{
    Worker, WorkerGuard, WorkerPool, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_POOL_SIZE,
};
pub use template::{PageTemplate, PageValues, DEFAULT_STYLE, DEFAULT_TEMPLATE};
