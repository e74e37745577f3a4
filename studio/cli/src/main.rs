//! VibeGraphics Studio - Command-Line Surface
//!
//! Drives the studio workflow from a terminal: research a topic or supply
//! content by hand, generate a spec against a template, then render and
//! download the infographic.
//!
//! # Usage
//!
//! ```bash
//! # Is the service up?
//! vibe-studio health
//!
//! # Store the API key (kept in the config dir, owner-only)
//! vibe-studio key set sk-...
//!
//! # Topic flow, rendering the image into ./out
//! vibe-studio topic "History of AI" --template tech-blueprint --image --out out
//!
//! # Manual flow with extra sections
//! vibe-studio manual --title "Q3" --body "Revenue grew" \
//!     --section "Highlights=New markets" --template minimalist-modern
//!
//! # Verbose logging
//! RUST_LOG=debug vibe-studio health
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use studio_core::{
    ConfigOverrides, CredentialStore, ExportFormat, HttpService, StateStore, StudioConfig,
    Workflow,
};

/// VibeGraphics Studio - infographic generation from the terminal
#[derive(Parser, Debug)]
#[command(name = "vibe-studio")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Generation service base URL
    #[arg(short = 'u', long, value_name = "URL")]
    service_url: Option<String>,

    /// Directory holding config.toml and credentials.toml
    #[arg(short = 'c', long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "VIBE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the generation service is reachable
    Health,

    /// List templates
    Templates {
        /// Only this category ("All" lists everything)
        #[arg(long)]
        category: Option<String>,
    },

    /// List template categories
    Categories,

    /// Manage the API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Research a topic and generate a spec
    Topic {
        /// Topic to research
        topic: String,

        /// Template id
        #[arg(short, long)]
        template: String,

        /// Also render the image
        #[arg(long)]
        image: bool,

        /// Prompt overriding the spec's image prompt
        #[arg(long, requires = "image")]
        prompt: Option<String>,

        /// Where downloaded images go
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Generate a spec from hand-written content
    Manual {
        /// Document title
        #[arg(long)]
        title: String,

        /// Main body text
        #[arg(long)]
        body: String,

        /// Extra section as TITLE=CONTENT (repeatable)
        #[arg(long = "section", value_name = "TITLE=CONTENT")]
        sections: Vec<String>,

        /// Template id
        #[arg(short, long)]
        template: String,

        /// Also render the image
        #[arg(long)]
        image: bool,

        /// Prompt overriding the spec's image prompt
        #[arg(long, requires = "image")]
        prompt: Option<String>,

        /// Where downloaded images go
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Convert a generated image
    Export {
        /// Target format (png or pdf)
        #[arg(short, long)]
        format: ExportFormat,

        /// Service-side path of the generated image
        #[arg(long)]
        image_path: String,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Save a new key
    Set {
        /// The key
        value: String,
    },
    /// Ask the service whether a key works (defaults to the saved one)
    Test {
        /// Key to test instead of the saved one
        value: Option<String>,
    },
    /// Show the saved key, masked
    Show,
    /// Forget the saved key
    Clear,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("studio_core={level},studio_cli={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let config = StudioConfig::load(ConfigOverrides {
        config_dir: args.config_dir,
        service_url: args.service_url,
    })
    .context("Failed to load configuration")?;
    info!(
        service_url = %config.service_url,
        config_dir = ?config.config_dir,
        "Configuration loaded"
    );

    let credentials = CredentialStore::open(config.credentials_path())
        .context("Failed to open credential store")?;
    let store = StateStore::new(credentials);
    let service = HttpService::from_config(&config).context("Failed to create HTTP client")?;
    let workflow = Workflow::new(store, service);

    let progress = commands::follow_progress(workflow.store().clone());
    let result = commands::run(&workflow, args.command).await;
    progress.abort();

    workflow
        .store()
        .flush_credential()
        .context("Failed to save credential")?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_sections_repeat() {
        let args = Args::try_parse_from([
            "vibe-studio",
            "manual",
            "--title",
            "Q3",
            "--body",
            "Revenue grew",
            "--section",
            "Highlights=New markets",
            "--section",
            "Risks=Supply chain",
            "--template",
            "minimalist-modern",
        ])
        .unwrap();

        match args.command {
            Command::Manual {
                sections, image, ..
            } => {
                assert_eq!(sections.len(), 2);
                assert!(!image);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_prompt_requires_image() {
        let result = Args::try_parse_from([
            "vibe-studio",
            "topic",
            "AI",
            "--template",
            "tech-blueprint",
            "--prompt",
            "neon",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_export_format_is_parsed() {
        let args = Args::try_parse_from([
            "vibe-studio",
            "export",
            "--format",
            "pdf",
            "--image-path",
            "/outputs/a.png",
            "--out",
            "a.pdf",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Export {
                format: ExportFormat::Pdf,
                ..
            }
        ));

        assert!(Args::try_parse_from([
            "vibe-studio",
            "export",
            "--format",
            "svg",
            "--image-path",
            "x",
            "--out",
            "y"
        ])
        .is_err());
    }
}
