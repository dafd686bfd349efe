use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RenderError;

/// Size of rendered content in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Area of the page to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<Dimensions> for CaptureRegion {
    fn from(dimensions: Dimensions) -> Self {
        Self {
            x: 0,
            y: 0,
            width: dimensions.width,
            height: dimensions.height,
        }
    }
}

/// A browser-like renderer that can hold pages open between jobs.
///
/// Sessions are stateful: a session is created once with the full page and
/// each job only swaps the element markup inside it. A session is only ever
/// used by one job at a time.
#[async_trait]
pub trait RenderBackend: Send + Sync + 'static {
    /// Handle of an open page.
    type Session: Send + 'static;

    /// Open a new session showing `initial_markup`.
    async fn create_session(&self, initial_markup: &str) -> Result<Self::Session, RenderError>;

    /// Put `markup` into the session's element slot and lay it out.
    ///
    /// Returns the size of the rendered card.
    async fn render(
        &self,
        session: &mut Self::Session,
        markup: &str,
    ) -> Result<Dimensions, RenderError>;

    /// Screenshot `region` of the session at the given quality (1-100).
    async fn capture(
        &self,
        session: &mut Self::Session,
        region: CaptureRegion,
        quality: u8,
    ) -> Result<Bytes, RenderError>;

    /// Close the session and release its resources.
    async fn close(&self, session: Self::Session) -> Result<(), RenderError>;
}
