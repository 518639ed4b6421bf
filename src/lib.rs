//! Structurizr diagram exporter
//!
//! Drives a headless Chrome through the diagrams page of a Structurizr
//! workspace: every view the page's `structurizr.scripting` API reports is
//! selected in turn and rendered to PNG in the browser, and the images are
//! handed back to the host and written to disk.
//!
//! # Example
//!
//! ```no_run
//! use diagram_exporter::ExporterConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExporterConfig {
//!     output_dir: "./export".into(),
//!     ..Default::default()
//! };
//!
//! let summary = diagram_exporter::export_diagrams("http://localhost:8080/workspace/diagrams", config)?;
//! println!("{} images from {} views", summary.written.len(), summary.views);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod exporter;
pub mod page;
pub mod payload;
pub mod tracker;
pub mod view;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use exporter::{ExportSummary, Exporter};
pub use page::{DiagramPage, PngExportOptions, SaveHandler};
pub use payload::SavedImage;
pub use view::{View, ViewType};

/// Browser executable used when none is configured
pub const DEFAULT_CHROME_PATH: &str = "/usr/bin/google-chrome-stable";

/// Directory the images are written to when none is configured
pub const DEFAULT_OUTPUT_DIR: &str = "./export";

/// Configuration for an export run
///
/// The defaults launch `/usr/bin/google-chrome-stable` headless with the
/// sandbox off, GPU on and certificate errors ignored, and write into
/// `./export`, which must already exist.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Browser executable; `None` lets `headless_chrome` find one
    pub chrome_path: Option<PathBuf>,
    /// Directory the PNG files are written to
    pub output_dir: PathBuf,
    /// Run Chrome without a window
    pub headless: bool,
    /// Keep Chrome's process sandbox on
    pub sandbox: bool,
    /// Let Chrome use the GPU for rendering
    pub enable_gpu: bool,
    /// Accept invalid TLS certificates on the diagrams page
    pub ignore_certificate_errors: bool,
    /// Timeout for DOM parsing, each render wait, and each gap between
    /// delivered images, in milliseconds
    pub timeout_ms: u64,
    /// Interval between render-predicate polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Options handed to `exportCurrentDiagramToPNG`
    pub png_options: PngExportOptions,
    /// Print progress lines to stdout
    pub print_progress: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            chrome_path: Some(PathBuf::from(DEFAULT_CHROME_PATH)),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            headless: true,
            sandbox: false,
            enable_gpu: true,
            ignore_certificate_errors: true,
            timeout_ms: 30000,
            poll_interval_ms: 100,
            png_options: PngExportOptions::default(),
            print_progress: true,
        }
    }
}

/// Launch Chrome and export every view of the diagrams page at `url`.
#[cfg(feature = "cdp")]
pub fn export_diagrams(url: &str, config: ExporterConfig) -> Result<ExportSummary> {
    let page = cdp::CdpPage::launch(&config)?;
    Exporter::new(page, config).run(url)
}
