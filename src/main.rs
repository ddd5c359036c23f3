// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, read the file, build the client
//   and hand it to the UI loop (or run a single turn with `--prompt`).
// - Returns `anyhow::Result` so startup failures print a readable chain.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use gemini_upload::api::{GeminiClient, LocalFile, UploadMode};
use gemini_upload::busy::{SpinnerSink, TickSink};
use gemini_upload::config::{self, Endpoints, Settings};
use gemini_upload::transport::{HttpTransport, TransportOptions};
use gemini_upload::ui::{self, Session};
use std::path::PathBuf;
use std::time::Duration;

/// Ask Gemini about an image or PDF.
#[derive(Parser, Debug)]
#[command(name = "gemini-upload", version, about)]
struct Cli {
    /// File to upload (.png, .jpg, .jpeg or .pdf); asked for when omitted
    file: Option<PathBuf>,

    /// Run a single turn with this prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Configuration file (defaults to ./env.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PEM bundle to trust instead of the system roots
    #[arg(long, env = "GEMINI_CA_BUNDLE")]
    ca_bundle: Option<PathBuf>,

    /// Seconds allowed for establishing each connection
    #[arg(long, default_value_t = 5)]
    connect_timeout: u64,

    /// Send the file inline (base64) instead of uploading it first
    #[arg(long)]
    inline: bool,

    /// Show debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Missing keys are only reported here; each turn checks them again.
    let config_path = config::resolve_path(cli.config.as_deref());
    Settings::load(&config_path)?.warn_missing();

    let path = match cli.file {
        Some(path) => path,
        None => ui::ask_file_path()?,
    };
    let file = LocalFile::read(&path).with_context(|| format!("Cannot use {}", path.display()))?;
    println!("{} total bytes\n{}", file.bytes.len(), file.mime_type);

    let transport = HttpTransport::new(&TransportOptions {
        connect_timeout: Duration::from_secs(cli.connect_timeout),
        ca_bundle: cli.ca_bundle,
    })
    .context("Failed to build HTTP client")?;
    let mut client = GeminiClient::new(transport, Endpoints::default())
        .with_busy_sink(|| Box::new(SpinnerSink::new()) as Box<dyn TickSink>);

    let mode = if cli.inline { UploadMode::Inline } else { UploadMode::Resumable };
    let session = Session { config_path, file, mode };

    match cli.prompt {
        Some(prompt) => {
            let text = ui::run_once(&mut client, &session, &prompt)?;
            ui::print_response(&text);
        }
        None => ui::prompt_loop(&mut client, &session)?,
    }
    Ok(())
}
