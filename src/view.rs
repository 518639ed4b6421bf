//! Diagram views and the export plan derived from them

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Kind of diagram view reported by the page.
///
/// Only [`ViewType::Image`] changes behavior: image views have no key
/// (legend), so they produce a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ViewType {
    SystemLandscape,
    SystemContext,
    Container,
    Component,
    Dynamic,
    Deployment,
    Filtered,
    Custom,
    Image,
    /// Any type this crate does not know about; treated like a diagram view.
    #[serde(other)]
    Unknown,
}

impl ViewType {
    pub fn is_image(self) -> bool {
        self == ViewType::Image
    }
}

/// A view as returned by `structurizr.scripting.getViews()`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct View {
    pub key: String,
    #[serde(rename = "type")]
    pub view_type: ViewType,
}

impl View {
    pub fn new(key: impl Into<String>, view_type: ViewType) -> Self {
        Self {
            key: key.into(),
            view_type,
        }
    }

    /// Images to request for this view: the diagram first, then its key.
    pub fn export_requests(&self, output_dir: &Path) -> Vec<ExportRequest> {
        let mut kinds = vec![ExportKind::Diagram];
        if !self.view_type.is_image() {
            kinds.push(ExportKind::Key);
        }
        kinds
            .into_iter()
            .map(|kind| ExportRequest {
                view_key: self.key.clone(),
                kind,
                path: export_path(output_dir, &self.key, kind),
            })
            .collect()
    }
}

/// Parse the JSON view list produced by the page.
pub fn parse_views(json: &str) -> crate::Result<Vec<View>> {
    serde_json::from_str(json).map_err(|e| crate::Error::InvalidViews(e.to_string()))
}

/// Which image of a view is being exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Diagram,
    Key,
}

/// Output path for one exported image: `<dir>/<key>.png` or `<dir>/<key>-key.png`.
///
/// The result always stays under `output_dir`, even for keys with a leading
/// path separator.
pub fn export_path(output_dir: &Path, view_key: &str, kind: ExportKind) -> PathBuf {
    let view_key = view_key.trim_start_matches(['/', '\\']);
    let file_name = match kind {
        ExportKind::Diagram => format!("{}.png", view_key),
        ExportKind::Key => format!("{}-key.png", view_key),
    };
    output_dir.join(file_name)
}

/// A single image the exporter will ask the page for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub view_key: String,
    pub kind: ExportKind,
    pub path: PathBuf,
}

/// Images requested for one view, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewExports {
    pub view_key: String,
    pub requests: Vec<ExportRequest>,
}

/// Every image requested for a list of views, in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct ExportPlan {
    views: Vec<ViewExports>,
}

impl ExportPlan {
    pub fn new(views: &[View], output_dir: &Path) -> Self {
        let views = views
            .iter()
            .map(|view| ViewExports {
                view_key: view.key.clone(),
                requests: view.export_requests(output_dir),
            })
            .collect();
        Self { views }
    }

    pub fn views(&self) -> &[ViewExports] {
        &self.views
    }

    /// Expected number of received images: one per image view, two per
    /// other view.
    pub fn len(&self) -> usize {
        self.views.iter().map(|v| v.requests.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
