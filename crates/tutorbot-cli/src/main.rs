//! 📊 tutorbot CLI — interactive Data Science tutor, onboarding, and status.
//!
//! Usage:
//!   tutorbot chat          — Start an interactive tutoring session
//!   tutorbot onboard       — Create a default configuration
//!   tutorbot status        — Show current configuration and model candidates

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};

use tutorbot_core::chat::run_chat;
use tutorbot_core::config::Config;
use tutorbot_core::presentation::{Presenter, TerminalPresenter};
use tutorbot_core::selector::{validate_candidate, HttpConnector, ModelSelector};
use tutorbot_core::session::ConversationSession;

#[derive(Parser)]
#[command(
    name = "tutorbot",
    version,
    about = "A conversational Data Science tutor",
    long_about = "📊 tutorbot — ask anything about Data Science.\n\nTries a high-capability model first and falls back to a lighter one when it is unavailable or over quota."
)]
struct Cli {
    /// Path to a config file (default: ./config.json, then ~/.tutorbot/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive tutoring session
    Chat {
        /// Preferred model (overrides the first configured candidate)
        #[arg(short, long)]
        model: Option<String>,

        /// Fallback model (overrides the second configured candidate)
        #[arg(short, long)]
        fallback: Option<String>,
    },

    /// Create or reset the default configuration
    Onboard,

    /// Show configuration status and model candidates
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing on stderr so logs never interleave with replies.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Chat { model, fallback }) => {
            cmd_chat(config_path, model.as_deref(), fallback.as_deref()).await?
        }
        Some(Commands::Onboard) => cmd_onboard()?,
        Some(Commands::Status) => cmd_status(config_path)?,
        None => cmd_chat(config_path, None, None).await?,
    }

    Ok(())
}

// ── Shared Setup ────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load_from(p),
        None => Config::load(),
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if let Err(errors) = config.validate() {
        eprintln!("\n  \x1b[31m❌ Configuration errors:\x1b[0m");
        for e in &errors {
            eprintln!("     • {}", e);
        }
        eprintln!();
        anyhow::bail!("Fix the above {} error(s) in config.json", errors.len());
    }
    Ok(())
}

// ── Chat Command ────────────────────────────────────────────────────

async fn cmd_chat(
    config_path: Option<&Path>,
    model: Option<&str>,
    fallback: Option<&str>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.override_models(model, fallback);
    validate_config(&config)?;

    let connector = HttpConnector::new(config.request_timeout())?;
    let selector = ModelSelector::new(
        config.candidates(),
        Box::new(connector),
        config.selector_options(),
    );

    let (mut session, acquisition) = match ConversationSession::start(selector) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("\n  \x1b[31m❌ No model available: {}\x1b[0m\n", e);
            anyhow::bail!("Could not initialise any model; check your API keys and model names");
        }
    };

    // Print header
    println!();
    println!("  📊 tutorbot v{}", env!("CARGO_PKG_VERSION"));
    println!("  AI Conversational Data Science Tutor");
    println!(
        "  Model: {} | Provider: {}",
        acquisition.model, acquisition.provider
    );
    println!();
    println!("  Ask me anything about Data Science! Type /help for commands, /quit to exit.");
    println!("  ─────────────────────────────────────");
    println!();

    let stdin = io::stdin();
    let mut presenter = TerminalPresenter::new(stdin.lock(), io::stdout());
    if std::env::var_os("NO_COLOR").is_some() {
        presenter = presenter.without_color();
    }

    for skipped in &acquisition.skipped {
        presenter.show_warning(&format!(
            "{} issue ({}). Switched to {}.",
            skipped.model, skipped.error, acquisition.model
        ))?;
    }

    let summary = run_chat(&mut session, &mut presenter).await?;
    tracing::info!(
        exchanges = summary.exchanges,
        failures = summary.failures,
        "Chat ended"
    );

    println!("  Goodbye! 👋");
    Ok(())
}

// ── Onboard Command ─────────────────────────────────────────────────

fn cmd_onboard() -> Result<()> {
    let path = Config::write_default_template()?;
    println!();
    println!("  ✅ Configuration created at:");
    println!("     {}", path.display());
    println!();
    println!("  Next steps:");
    println!("  1. Edit the config file and add your API key");
    println!("     (or export OPENROUTER_API_KEY / HF_TOKEN / GEMINI_API_KEY)");
    println!("  2. Run `tutorbot chat` to start learning");
    println!();
    Ok(())
}

// ── Status Command ──────────────────────────────────────────────────

fn cmd_status(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let loaded_from = config_path.map(Path::to_path_buf).or_else(Config::locate);

    println!();
    println!("  📊 tutorbot status");
    println!("  ─────────────────────────────────────");

    // Config file
    match loaded_from {
        Some(path) => println!("  Config:    {}", path.display()),
        None => println!(
            "  Config:    ⚠️  Not found (run `tutorbot onboard`), using defaults + environment"
        ),
    }

    // Providers
    let active = config.providers.find_all_active();
    if active.is_empty() {
        println!("  Providers: ❌ No API key configured");
    } else {
        let names: Vec<&str> = active.iter().map(|(n, _)| *n).collect();
        println!("  Providers: ✅ {}", names.join(", "));
    }

    // Candidates
    println!("  Models:");
    for (i, candidate) in config.candidates().iter().enumerate() {
        let state = match validate_candidate(candidate) {
            Ok(()) => "✅".to_string(),
            Err(e) => format!("❌ {}", e),
        };
        let role = if i == 0 { "primary " } else { "fallback" };
        println!(
            "    {} {} via {} {}",
            role, candidate.model, candidate.provider, state
        );
    }

    println!(
        "  Requests:  timeout {}s, max {} tokens, quota fallback {}",
        config.chat.timeout_seconds,
        config.chat.max_tokens,
        if config.chat.fallback_on_quota { "on" } else { "off" }
    );

    println!();
    Ok(())
}
