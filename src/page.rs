//! The page-side scripting API the exporter drives.
//!
//! Structurizr exposes `structurizr.scripting` on the diagrams page. The
//! [`DiagramPage`] trait is the seam over that object so the export flow can
//! run against a real browser ([`crate::cdp::CdpPage`]) or a simulated page.

use crate::view::View;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Host-side function the page calls with every exported image.
///
/// Receives the raw binding payload; see
/// [`crate::payload::SavedImage::from_binding_payload`].
pub type SaveHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Options passed to `exportCurrentDiagramToPNG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PngExportOptions {
    pub include_metadata: bool,
    pub crop: bool,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            crop: false,
        }
    }
}

/// Operations the exporter needs from a loaded diagrams page.
pub trait DiagramPage {
    /// Navigate to `url` and return once the DOM has been parsed.
    fn open(&mut self, url: &str) -> Result<()>;

    /// `structurizr.scripting.isDiagramRendered()`. False while the
    /// scripting object does not exist yet.
    fn is_diagram_rendered(&self) -> Result<bool>;

    /// Make `handler` callable from page code. Export requests issued later
    /// deliver their images through it.
    fn expose_save_handler(&mut self, handler: SaveHandler) -> Result<()>;

    /// `structurizr.scripting.getViews()`
    fn views(&self) -> Result<Vec<View>>;

    /// `structurizr.scripting.changeView(key)`
    fn change_view(&mut self, key: &str) -> Result<()>;

    /// Ask the page to render the current diagram to PNG and hand it to the
    /// save handler under `filename`. Returns without waiting for delivery.
    fn export_diagram(&mut self, options: &PngExportOptions, filename: &str) -> Result<()>;

    /// Same as [`DiagramPage::export_diagram`] for the current diagram's key.
    fn export_diagram_key(&mut self, filename: &str) -> Result<()>;

    /// Close the page and its browser
    fn close(self) -> Result<()>;

    /// Poll [`DiagramPage::is_diagram_rendered`] until it is true.
    fn wait_until_rendered(&self, timeout: Duration, poll_interval: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.is_diagram_rendered()? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout(timeout.as_millis() as u64));
            }
            std::thread::sleep(poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn png_options_serialize_like_the_page_expects() {
        let json = serde_json::to_string(&PngExportOptions::default()).unwrap();
        assert_eq!(json, r#"{"includeMetadata":true,"crop":false}"#);
    }

    struct SlowPage {
        polls_until_rendered: Cell<u32>,
    }

    impl DiagramPage for SlowPage {
        fn open(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }
        fn is_diagram_rendered(&self) -> Result<bool> {
            let left = self.polls_until_rendered.get();
            if left == 0 {
                return Ok(true);
            }
            self.polls_until_rendered.set(left - 1);
            Ok(false)
        }
        fn expose_save_handler(&mut self, _handler: SaveHandler) -> Result<()> {
            Ok(())
        }
        fn views(&self) -> Result<Vec<View>> {
            Ok(Vec::new())
        }
        fn change_view(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
        fn export_diagram(&mut self, _options: &PngExportOptions, _filename: &str) -> Result<()> {
            Ok(())
        }
        fn export_diagram_key(&mut self, _filename: &str) -> Result<()> {
            Ok(())
        }
        fn close(self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn wait_polls_until_rendered() {
        let page = SlowPage {
            polls_until_rendered: Cell::new(3),
        };
        page.wait_until_rendered(Duration::from_secs(5), Duration::from_millis(1))
            .unwrap();
        assert_eq!(page.polls_until_rendered.get(), 0);
    }

    #[test]
    fn wait_times_out() {
        let page = SlowPage {
            polls_until_rendered: Cell::new(u32::MAX),
        };
        let err = page
            .wait_until_rendered(Duration::from_millis(20), Duration::from_millis(5))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(20)));
    }
}
