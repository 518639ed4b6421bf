use clap::Parser;
use diagram_exporter::{ExporterConfig, DEFAULT_CHROME_PATH, DEFAULT_OUTPUT_DIR};
use std::path::PathBuf;

/// Export every diagram view of a Structurizr diagrams page to PNG files.
#[derive(Parser, Debug)]
#[command(name = "diagram-exporter", version, about)]
struct Cli {
    /// URL of the diagrams page
    url: String,

    /// Chrome executable to launch
    #[arg(long, default_value = DEFAULT_CHROME_PATH)]
    chrome_path: PathBuf,

    /// Existing directory to write the PNG files into
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Timeout for page load and each diagram render, in milliseconds
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,

    /// Do not print progress lines
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn into_config(self) -> diagram_exporter::Result<(String, ExporterConfig)> {
        url::Url::parse(&self.url)
            .map_err(|e| diagram_exporter::Error::ConfigError(format!("invalid URL {}: {}", self.url, e)))?;

        let config = ExporterConfig {
            chrome_path: Some(self.chrome_path),
            output_dir: self.output_dir,
            timeout_ms: self.timeout_ms,
            print_progress: !self.quiet,
            ..Default::default()
        };
        Ok((self.url, config))
    }
}

fn run(cli: Cli) -> diagram_exporter::Result<()> {
    let (url, config) = cli.into_config()?;
    diagram_exporter::export_diagrams(&url, config)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("diagram-exporter: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_the_only_required_argument() {
        let cli = Cli::try_parse_from(["diagram-exporter", "http://localhost:8080/diagrams"]).unwrap();
        let (url, config) = cli.into_config().unwrap();
        assert_eq!(url, "http://localhost:8080/diagrams");
        assert_eq!(config.output_dir, PathBuf::from("./export"));
        assert_eq!(config.chrome_path, Some(PathBuf::from(DEFAULT_CHROME_PATH)));
        assert!(config.print_progress);
    }

    #[test]
    fn missing_url_is_a_usage_error() {
        assert!(Cli::try_parse_from(["diagram-exporter"]).is_err());
    }

    #[test]
    fn malformed_url_is_rejected() {
        let cli = Cli::try_parse_from(["diagram-exporter", "not a url"]).unwrap();
        assert!(matches!(
            cli.into_config(),
            Err(diagram_exporter::Error::ConfigError(_))
        ));
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "diagram-exporter",
            "--output-dir",
            "out",
            "--quiet",
            "--timeout-ms",
            "500",
            "https://example.com/diagrams",
        ])
        .unwrap();
        let (_, config) = cli.into_config().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.timeout_ms, 500);
        assert!(!config.print_progress);
    }
}
