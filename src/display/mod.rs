//! Display surfaces and cooperative cancellation.
//!
//! A renderer shows one annotated frame per cycle and is then asked, without
//! blocking for more than `POLL_WAIT_MS`, whether the user wants to stop.

mod cancel;
mod headless;
#[cfg(feature = "opencv")]
mod highgui;

use anyhow::Result;

use crate::config::DisplaySettings;
use crate::frame::AnnotatedFrame;

pub use cancel::CancelFlag;
pub use headless::HeadlessRenderer;
#[cfg(feature = "opencv")]
pub use highgui::HighGuiRenderer;

/// Upper bound on how long `poll_cancel` may wait for a key press.
pub const POLL_WAIT_MS: i32 = 1;
/// Key that ends the session.
pub const QUIT_KEY: char = 'q';

pub trait Renderer {
    /// Display `frame`. The surface is created on first use.
    fn show(&mut self, frame: &AnnotatedFrame) -> Result<()>;

    /// Non-blocking check for a cancellation request.
    fn poll_cancel(&mut self) -> bool;

    /// Destroy any display surfaces. Safe to call any number of times.
    fn close(&mut self);
}

/// Pick the renderer for `settings`.
///
/// Falls back to headless output when no windowing backend was compiled in.
pub fn open_renderer(settings: &DisplaySettings, cancel: CancelFlag) -> Box<dyn Renderer> {
    if settings.headless {
        log::info!("display: headless");
        return Box::new(HeadlessRenderer::new(cancel));
    }

    #[cfg(feature = "opencv")]
    {
        log::info!("display: window \"{}\"", settings.window_title);
        Box::new(HighGuiRenderer::new(&settings.window_title, cancel))
    }
    #[cfg(not(feature = "opencv"))]
    {
        log::warn!("display: built without the opencv feature, running headless");
        Box::new(HeadlessRenderer::new(cancel))
    }
}
