use clap::{Parser, Subcommand};
use colored::Colorize;
use mimic_core::MimicError;
use mimic_core::parser::ExportFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mimic")]
#[command(about = "MIMIC - distil a texting persona from a chat export", long_about = None, version)]
struct Cli {
    /// Directory holding config.toml, secret.json and personas/ (default: ~/.config/mimic)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Explicit config.toml to use instead of the one in the home directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct ExportArgs {
    /// Chat export file (line-oriented text or structured JSON)
    export: PathBuf,

    /// Export format: auto, line or json
    #[arg(long, default_value = "auto")]
    format: ExportFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an export and print a summary
    Parse {
        #[command(flatten)]
        export: ExportArgs,
        /// Print the parsed messages as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print per-sender texting statistics
    Stats {
        #[command(flatten)]
        export: ExportArgs,
        #[arg(long)]
        json: bool,
    },
    /// Run the token-budgeted sampler and print what it kept
    Sample {
        #[command(flatten)]
        export: ExportArgs,
        /// Override the configured token target
        #[arg(long)]
        target_tokens: Option<usize>,
        /// Override the configured sampler seed
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Analyse a subject and store a new persona version
    Analyze {
        #[command(flatten)]
        export: ExportArgs,
        /// Sender to model (default: most active sender other than --user)
        #[arg(long)]
        subject: Option<String>,
        /// Your own sender name in the export
        #[arg(long)]
        user: Option<String>,
        /// Persona ID to store under (default: derived from the subject)
        #[arg(long)]
        id: Option<String>,
        /// Photo of the subject for the identity stage
        #[arg(long)]
        photo: Option<PathBuf>,
        /// Gemini model to use
        #[arg(long)]
        model: Option<String>,
        /// Print the assembled persona prompt
        #[arg(long)]
        print_prompt: bool,
    },
    /// Reply to a message as a stored persona
    Reply {
        /// Persona ID
        id: String,
        /// Incoming message
        message: String,
        /// Wait out the simulated delays and print fragments as they are due
        #[arg(long)]
        live: bool,
        /// Seed for the timing jitter
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        model: Option<String>,
    },
    /// List stored versions of a persona
    History {
        /// Persona ID (omit to list all personas)
        id: Option<String>,
        /// Print the latest system instruction
        #[arg(long)]
        prompt: bool,
    },
    /// Learn new facts from a later conversation
    Learn {
        /// Persona ID
        id: String,
        #[command(flatten)]
        export: ExportArgs,
        /// Sender name of the persona in this export (default: most active sender other than --user)
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// Only read the last N messages of the export
        #[arg(long, default_value_t = 200)]
        last: usize,
        #[arg(long)]
        model: Option<String>,
    },
}

fn init_tracing(json: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = commands::AppContext::load(cli.home.as_deref(), cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { export, json } => {
            commands::corpus::parse(&export.export, export.format, json)?
        }
        Commands::Stats { export, json } => {
            commands::corpus::stats(&export.export, export.format, json)?
        }
        Commands::Sample {
            export,
            target_tokens,
            seed,
            json,
        } => commands::corpus::sample(&ctx, &export.export, export.format, target_tokens, seed, json)?,
        Commands::Analyze {
            export,
            subject,
            user,
            id,
            photo,
            model,
            print_prompt,
        } => {
            commands::analyze::run(
                &ctx,
                commands::analyze::AnalyzeArgs {
                    export: export.export,
                    format: export.format,
                    subject,
                    user,
                    id,
                    photo,
                    model,
                    print_prompt,
                },
            )
            .await?
        }
        Commands::Reply {
            id,
            message,
            live,
            seed,
            model,
        } => commands::persona::reply(&ctx, &id, &message, live, seed, model.as_deref()).await?,
        Commands::History { id, prompt } => {
            commands::persona::history(&ctx, id.as_deref(), prompt).await?
        }
        Commands::Learn {
            id,
            export,
            subject,
            user,
            last,
            model,
        } => {
            commands::persona::learn(
                &ctx,
                &id,
                &export.export,
                export.format,
                subject.as_deref(),
                user.as_deref(),
                last,
                model.as_deref(),
            )
            .await?
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match err.downcast_ref::<MimicError>() {
                Some(mimic_err) => mimic_err.user_message(),
                None => format!("{err:#}"),
            };
            eprintln!("{} {}", "error:".red().bold(), message);
            ExitCode::FAILURE
        }
    }
}
