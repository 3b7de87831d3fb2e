//! Strategist CLI binary: analyze a startup idea and chat about it from the terminal.
//!
//! Subcommands: `analyze` (full report, optional HTML export and follow-up chat), `chat`.

mod display;
mod log_format;
mod logging;
mod repl;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use strategist::{
    render_report_html, Analyzer, BusinessInput, ChatOptions, ChatSession, GeminiClient,
    Geolocation, GenerativeModel, StrategistConfig,
};

#[derive(Parser, Debug)]
#[command(name = "strategist")]
#[command(about = "Strategist: AI strategy report and follow-up chat for a startup idea")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Verbose: write logs to stderr (LOG_FILE takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Analyze a business idea: SWOT, audience, trends, local opportunities, marketing
    Analyze(AnalyzeArgs),
    /// Chat with the strategy assistant
    Chat,
}

#[derive(clap::Args, Debug, Clone)]
struct AnalyzeArgs {
    /// Business name
    #[arg(long, value_name = "TEXT")]
    name: String,

    /// What the business does
    #[arg(long, value_name = "TEXT")]
    description: String,

    /// Target audience
    #[arg(long, value_name = "TEXT")]
    audience: String,

    /// Known competitors
    #[arg(long, value_name = "TEXT")]
    competitors: String,

    /// Latitude for local opportunities (requires --lng)
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude for local opportunities (requires --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,

    /// Write the report as an HTML document to this file
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Print the analysis result as JSON instead of the formatted report
    #[arg(long)]
    json: bool,

    /// Open the chat after the report, offering the suggested questions
    #[arg(long)]
    chat: bool,
}

impl AnalyzeArgs {
    fn input(&self) -> BusinessInput {
        BusinessInput {
            name: self.name.clone(),
            description: self.description.clone(),
            target_audience: self.audience.clone(),
            competitors: self.competitors.clone(),
        }
    }

    fn location(&self) -> Option<Geolocation> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Geolocation::new(lat, lng)),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let applied = config::load_and_apply("strategist", None);
    logging::init(args.verbose)?;
    match &applied {
        Ok(applied) => {
            let keys: Vec<&str> = applied.set_keys().collect();
            tracing::debug!(?keys, "applied config");
        }
        Err(e) => {
            tracing::warn!(error = %e, "config not applied");
            eprintln!("strategist: config not applied: {}", e);
        }
    }

    let outcome = match &args.cmd {
        Command::Analyze(a) => run_analyze(a).await,
        Command::Chat => run_chat().await,
    };
    if let Err(e) = outcome {
        eprintln!("strategist: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn model_from_env() -> Result<(StrategistConfig, Arc<dyn GenerativeModel>), Box<dyn std::error::Error>> {
    let config = StrategistConfig::from_env()?;
    let model: Arc<dyn GenerativeModel> = Arc::new(GeminiClient::from_config(&config));
    Ok((config, model))
}

async fn run_analyze(args: &AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let input = args.input();
    if !input.is_complete() {
        return Err("--name, --description, --audience and --competitors must all be non-empty".into());
    }
    let (config, model) = model_from_env()?;
    let analyzer = Analyzer::from_config(Arc::clone(&model), &config);
    let labels = analyzer.prompts().labels.clone();

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    eprintln!("Analyzing {}...", input.name.trim());
    let outcome = analyzer
        .analyze_with_cancel(&input, args.location(), &cancel)
        .await;
    watcher.abort();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "analysis failed");
            return Err(format!("{}\n  ({})", labels.analysis_error, e).into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let styled = std::io::stdout().is_terminal();
        print!("{}", display::format_report(&result, &input.name, &labels, styled));
    }

    if let Some(path) = &args.export {
        std::fs::write(path, render_report_html(&result, &input.name, &labels))?;
        eprintln!("Exported to {}", path.display());
    }

    if args.chat {
        let options = ChatOptions::from_config(&config, analyzer.prompts());
        let session = ChatSession::new(model, options);
        let suggestions = result.suggested_questions.clone().unwrap_or_default();
        repl::run_repl_loop(&session, &labels, &suggestions).await?;
    }
    Ok(())
}

async fn run_chat() -> Result<(), Box<dyn std::error::Error>> {
    let (config, model) = model_from_env()?;
    let prompts = strategist::prompts::load_or_default(config.prompts_path.as_deref())
        .with_language(config.language.as_deref());
    let session = ChatSession::new(model, ChatOptions::from_config(&config, &prompts));
    repl::run_repl_loop(&session, &prompts.labels, &[]).await
}
