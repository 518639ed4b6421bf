//! Chrome DevTools Protocol page implementation

use crate::page::{DiagramPage, PngExportOptions, SaveHandler};
use crate::view::{parse_views, View};
use crate::{Error, ExporterConfig, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Name of the binding page code calls to hand images back to the host
pub const SAVE_BINDING: &str = "saveDiagramPng";

// Chrome is killed by headless_chrome after this long without CDP traffic.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

const RENDERED_SCRIPT: &str = r#"(function() {
    try {
        return typeof structurizr !== 'undefined'
            && !!structurizr.scripting
            && structurizr.scripting.isDiagramRendered() === true;
    } catch (e) {
        return false;
    }
})()"#;

const DOM_PARSED_SCRIPT: &str = "document.readyState !== 'loading'";

const VIEWS_SCRIPT: &str = r#"JSON.stringify(structurizr.scripting.getViews().map(function(v) {
    return { key: v.key, type: v.type };
}))"#;

/// Diagrams page in a headless Chrome tab (uses the `headless_chrome` crate)
///
/// Owns the browser process; dropping or closing the page terminates it.
pub struct CdpPage {
    browser: Browser,
    tab: Arc<Tab>,
    timeout: Duration,
    poll_interval: Duration,
}

/// Chrome launch options for `config`.
pub fn launch_options(config: &ExporterConfig) -> Result<LaunchOptions<'static>> {
    LaunchOptions::default_builder()
        .path(config.chrome_path.clone())
        .headless(config.headless)
        .sandbox(config.sandbox)
        .enable_gpu(config.enable_gpu)
        .ignore_certificate_errors(config.ignore_certificate_errors)
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .build()
        .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))
}

impl CdpPage {
    /// Launch Chrome with the configured flags and open one tab.
    pub fn launch(config: &ExporterConfig) -> Result<Self> {
        let launch_options = launch_options(config)?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        Ok(Self {
            browser,
            tab,
            timeout: Duration::from_millis(config.timeout_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    fn eval(&self, script: &str) -> Result<Option<serde_json::Value>> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;
        Ok(result.value)
    }

    fn eval_bool(&self, script: &str) -> Result<bool> {
        Ok(matches!(self.eval(script)?, Some(serde_json::Value::Bool(true))))
    }

    /// Run `call` and route its PNG callback argument into the save binding.
    fn request_png(&self, call: impl FnOnce(&str) -> String, filename: &str) -> Result<()> {
        let filename_js = serde_json::to_string(filename)
            .map_err(|e| Error::ScriptError(format!("Unencodable filename: {}", e)))?;
        let callback = format!(
            "function(png) {{ window.{}(JSON.stringify({{ content: png, filename: {} }})); }}",
            SAVE_BINDING, filename_js
        );
        let script = format!("(function() {{ {}; return true; }})()", call(&callback));
        debug!("requesting {}", filename);
        self.eval(&script)?;
        Ok(())
    }
}

impl DiagramPage for CdpPage {
    fn open(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        let start = Instant::now();
        while !self.eval_bool(DOM_PARSED_SCRIPT)? {
            if start.elapsed() >= self.timeout {
                return Err(Error::LoadError(format!(
                    "DOM of {} not parsed after {}ms",
                    url,
                    self.timeout.as_millis()
                )));
            }
            std::thread::sleep(self.poll_interval);
        }
        Ok(())
    }

    fn is_diagram_rendered(&self) -> Result<bool> {
        self.eval_bool(RENDERED_SCRIPT)
    }

    fn expose_save_handler(&mut self, handler: SaveHandler) -> Result<()> {
        self.tab
            .expose_function(
                SAVE_BINDING,
                Arc::new(move |payload: serde_json::Value| (handler)(payload)),
            )
            .map_err(|e| Error::ScriptError(format!("Failed to expose {}: {}", SAVE_BINDING, e)))?;
        debug!("exposed {} to the page", SAVE_BINDING);
        Ok(())
    }

    fn views(&self) -> Result<Vec<View>> {
        match self.eval(VIEWS_SCRIPT)? {
            Some(serde_json::Value::String(json)) => parse_views(&json),
            Some(other) => Err(Error::InvalidViews(format!("expected a JSON string, got {}", other))),
            None => Err(Error::ScriptError(
                "structurizr.scripting.getViews() returned nothing".into(),
            )),
        }
    }

    fn change_view(&mut self, key: &str) -> Result<()> {
        let key_js = serde_json::to_string(key)
            .map_err(|e| Error::ScriptError(format!("Unencodable view key: {}", e)))?;
        debug!("changing view to {}", key);
        self.eval(&format!(
            "(function() {{ structurizr.scripting.changeView({}); return true; }})()",
            key_js
        ))?;
        Ok(())
    }

    fn export_diagram(&mut self, options: &PngExportOptions, filename: &str) -> Result<()> {
        let options_js = serde_json::to_string(options)
            .map_err(|e| Error::ScriptError(format!("Unencodable export options: {}", e)))?;
        self.request_png(
            |callback| {
                format!(
                    "structurizr.scripting.exportCurrentDiagramToPNG({}, {})",
                    options_js, callback
                )
            },
            filename,
        )
    }

    fn export_diagram_key(&mut self, filename: &str) -> Result<()> {
        self.request_png(
            |callback| format!("structurizr.scripting.exportCurrentDiagramKeyToPNG({})", callback),
            filename,
        )
    }

    fn close(self) -> Result<()> {
        // Dropping the browser terminates the Chrome child process.
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
