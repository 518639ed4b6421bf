//! The export sequence: open the page, walk every view, collect the PNGs.

use crate::page::{DiagramPage, SaveHandler};
use crate::payload::{write_png, SavedImage};
use crate::tracker::ExportTracker;
use crate::view::{ExportKind, ExportPlan};
use crate::{ExporterConfig, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// What a finished export produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of views the page reported
    pub views: usize,
    /// Number of images requested (and received)
    pub expected: usize,
    /// Files written, in the order the page delivered them
    pub written: Vec<PathBuf>,
}

/// Drives a [`DiagramPage`] through a full export.
pub struct Exporter<P: DiagramPage> {
    page: P,
    config: ExporterConfig,
}

impl<P: DiagramPage> Exporter<P> {
    pub fn new(page: P, config: ExporterConfig) -> Self {
        Self { page, config }
    }

    /// Export every view of the page at `url`.
    ///
    /// Export requests are not awaited one by one: the loop moves on to the
    /// next view as soon as the requests are issued, and the call returns
    /// once the page has delivered every expected image. A malformed payload
    /// or a failed write ends the run, as does `timeout_ms` passing without
    /// a new image. The page is closed on success and on failure.
    pub fn run(self, url: &str) -> Result<ExportSummary> {
        let Exporter { mut page, config } = self;
        let result = export_all(&mut page, &config, url);
        let closed = page.close();
        let summary = result?;
        closed?;
        Ok(summary)
    }
}

fn export_all<P: DiagramPage>(page: &mut P, config: &ExporterConfig, url: &str) -> Result<ExportSummary> {
    let timeout = Duration::from_millis(config.timeout_ms);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    progress(config, &format!("Opening {}", url));
    page.open(url)?;
    page.wait_until_rendered(timeout, poll_interval)?;

    let (tracker, completion) = ExportTracker::new();
    let tracker = Arc::new(tracker);
    page.expose_save_handler(save_handler(tracker.clone(), config.print_progress))?;

    let views = page.views()?;
    let plan = ExportPlan::new(&views, &config.output_dir);
    tracker.set_expected(plan.len());
    debug!("{} views, {} images expected", views.len(), plan.len());

    progress(config, "Starting export");
    for view in plan.views() {
        page.change_view(&view.view_key)?;
        page.wait_until_rendered(timeout, poll_interval)?;

        for request in &view.requests {
            let filename = path_arg(&request.path);
            match request.kind {
                ExportKind::Diagram => page.export_diagram(&config.png_options, &filename)?,
                ExportKind::Key => page.export_diagram_key(&filename)?,
            }
        }
    }

    // Gaps between deliveries are bounded by the same timeout as renders.
    let written = completion.wait(&tracker, timeout, poll_interval)?;
    progress(config, "Finished");

    Ok(ExportSummary {
        views: views.len(),
        expected: plan.len(),
        written,
    })
}

/// Host-side save function: decode, write, count.
fn save_handler(tracker: Arc<ExportTracker>, print_progress: bool) -> SaveHandler {
    Arc::new(move |payload: serde_json::Value| {
        let image = match SavedImage::from_binding_payload(payload) {
            Ok(image) => image,
            Err(e) => {
                warn!("Malformed save payload: {}", e);
                tracker.fail(e);
                return;
            }
        };
        if print_progress {
            println!(" - {}", image.filename);
        }
        let path = PathBuf::from(&image.filename);
        match write_png(&image.content, &path) {
            Ok(()) => {
                let received = tracker.record(path);
                debug!("received {} of {:?}", received, tracker.expected());
            }
            Err(e) => tracker.fail(e),
        }
    })
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn progress(config: &ExporterConfig, line: &str) {
    if config.print_progress {
        println!(" - {}", line);
    }
}
