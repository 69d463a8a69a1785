use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::Weak;
use vigil::config::Config;
use vigil::editor::{BufferSnapshot, EditorContent, SpanRecord};
use vigil::hook::{CrashInterceptor, PanicHookSlot};
use vigil::policy::LogPolicy;
use vigil::report::FileSink;

/// Command-line arguments for the crash diagnostics harness
#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Crash interception and editor diagnostics harness",
    long_about = "Installs the vigil crash interceptor over a demo editor buffer and either \
                  runs a crash scenario on a worker thread to exercise the whole pipeline, \
                  or idles with interception active until interrupted."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Crash scenario to run on a worker thread
    #[arg(
        short,
        long,
        value_name = "SCENARIO",
        help = "Run a crash scenario: index-oob, explicit-panic, or assertion"
    )]
    simulate: Option<String>,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }
        }

        if let Some(ref scenario) = self.simulate {
            if !matches!(scenario.as_str(), "index-oob" | "explicit-panic" | "assertion") {
                return Err(format!(
                    "Unknown scenario '{}', expected index-oob, explicit-panic, or assertion",
                    scenario
                ));
            }
        }

        Ok(())
    }
}

/// Load configuration from file or fall back to defaults
fn load_config(config_path: Option<&PathBuf>) -> Config {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Configuration file '{}' unusable ({}), using defaults",
                        path.display(),
                        e
                    );
                    Config::default()
                }
            }
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    }
}

/// Build the demo editor buffer the interceptor reports on
fn build_demo_editor(config: &Config) -> anyhow::Result<Arc<BufferSnapshot>> {
    let spans = vec![
        SpanRecord {
            start: 0,
            end: 13,
            kind: "heading".to_string(),
            flags: 0,
        },
        SpanRecord {
            start: 14,
            end: 52,
            kind: "paragraph".to_string(),
            flags: 0,
        },
    ];

    let mut editor =
        BufferSnapshot::new("<h1>Notes</h1>\n<p>Draft paragraph under edit.</p>").with_spans(spans);

    if let Some(ref path) = config.report.path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        info!("Known-defect reports will be appended to {}", path.display());
        editor = editor.with_sink(Arc::new(FileSink::new(path)));
    }

    Ok(Arc::new(editor))
}

/// Run one crash scenario on a named worker thread
///
/// The panic escapes the worker, travels through the installed interceptor,
/// and surfaces here as a join error.
fn run_scenario(scenario: &str) -> anyhow::Result<()> {
    info!("Running crash scenario '{}'", scenario);

    let scenario = scenario.to_string();
    let worker = std::thread::Builder::new()
        .name(format!("scenario-{}", scenario))
        .spawn(move || match scenario.as_str() {
            "index-oob" => {
                let blocks = vec![10usize, 20, 30];
                let index = blocks.len() + 2;
                let _ = blocks[index];
            }
            "explicit-panic" => panic!("editor state corrupted"),
            _ => {
                let span_bounds = vec![8usize, 3];
                assert!(span_bounds[0] <= span_bounds[1]);
            }
        })
        .context("spawning scenario worker")?;

    match worker.join() {
        Ok(()) => anyhow::bail!("scenario finished without crashing"),
        Err(_) => {
            info!("Scenario crash was intercepted and delegated");
            Ok(())
        }
    }
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting vigil crash diagnostics harness");

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = load_config(cli.config.as_ref());

    let editor = match build_demo_editor(&config) {
        Ok(editor) => editor,
        Err(e) => {
            error!("Failed to set up the demo editor: {:#}", e);
            std::process::exit(1);
        }
    };

    let policy = config.build_policy();
    let policy_weak: Weak<dyn LogPolicy> = Arc::downgrade(&policy);
    let editor_weak: Weak<BufferSnapshot> = Arc::downgrade(&editor);
    let editor_weak: Weak<dyn EditorContent> = editor_weak;
    let interceptor = CrashInterceptor::install_weak(
        policy_weak,
        editor_weak,
        PanicHookSlot::global(),
        config.platform.toolkit_build,
        config.snapshot.max_content_len,
    );
    info!(
        "Interceptor installed (policy: {}, toolkit build: {})",
        policy.name(),
        config.platform.toolkit_build
    );

    if let Some(ref scenario) = cli.simulate {
        let result = run_scenario(scenario);
        interceptor.restore_default_handler();
        if let Err(e) = result {
            error!("Scenario failed: {:#}", e);
            std::process::exit(1);
        }
        info!("Scenario complete, default handler restored");
        return;
    }

    // Idle with interception active until interrupted
    let (shutdown_sender, shutdown_receiver) = mpsc::channel();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if let Err(e) = shutdown_sender.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })
    .expect("Error setting SIGINT handler for graceful shutdown");

    info!("Interception active. Press Ctrl+C to stop.");
    if let Err(e) = shutdown_receiver.recv() {
        error!("Shutdown channel closed unexpectedly: {}", e);
    }

    interceptor.restore_default_handler();
    info!("Default handler restored, shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_validate_accepts_known_scenarios() {
        for scenario in ["index-oob", "explicit-panic", "assertion"] {
            let cli = Cli {
                config: None,
                verbose: false,
                simulate: Some(scenario.to_string()),
            };
            assert!(cli.validate().is_ok());
        }
    }

    #[test]
    fn test_cli_validate_rejects_unknown_scenario() {
        let cli = Cli {
            config: None,
            verbose: false,
            simulate: Some("divide-by-zero".to_string()),
        };
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_load_config_missing_file_falls_back_to_defaults() {
        let config = load_config(Some(&PathBuf::from("/nonexistent/vigil.toml")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_build_demo_editor_without_report_path() {
        let editor = build_demo_editor(&Config::default()).unwrap();
        assert!(vigil::editor::EditorContent::external_sink(editor.as_ref()).is_none());
    }

    #[test]
    fn test_build_demo_editor_with_report_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.report.path = Some(dir.path().join("reports").join("crashes.jsonl"));

        let editor = build_demo_editor(&config).unwrap();
        assert!(vigil::editor::EditorContent::external_sink(editor.as_ref()).is_some());
        assert!(dir.path().join("reports").is_dir());
    }
}
