use super::{AppContext, load_export, resolve_subject};
use anyhow::{Context, Result};
use colored::Colorize;
use mimic_application::AnalysisRequest;
use mimic_core::generation::InlineAttachment;
use mimic_core::parser::ExportFormat;
use mimic_core::progress::{ProgressCallback, ProgressUpdate};
use mimic_infrastructure::subject_id_from_name;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AnalyzeArgs {
    pub export: PathBuf,
    pub format: ExportFormat,
    pub subject: Option<String>,
    pub user: Option<String>,
    pub id: Option<String>,
    pub photo: Option<PathBuf>,
    pub model: Option<String>,
    pub print_prompt: bool,
}

pub async fn run(ctx: &AppContext, args: AnalyzeArgs) -> Result<()> {
    let messages = load_export(&args.export, args.format)?;
    let subject = resolve_subject(&messages, args.subject.as_deref(), args.user.as_deref())?;
    let subject_id = args
        .id
        .clone()
        .unwrap_or_else(|| subject_id_from_name(&subject));
    let identity_attachment = args.photo.as_deref().map(read_photo).transpose()?;

    println!(
        "{} {} ({} messages in export) as '{}'",
        "Analysing".bold(),
        subject.cyan(),
        messages.len(),
        subject_id
    );

    let usecase = ctx.usecase(args.model.as_deref()).await?;
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling after the current call...".yellow());
            on_ctrl_c.cancel();
        }
    });

    let request = AnalysisRequest {
        subject,
        messages,
        identity_attachment,
    };
    let (record, outcome) = usecase
        .analyze(&subject_id, request, Some(progress_printer()), cancel)
        .await?;

    println!();
    for stage in &outcome.stages {
        let status = match stage.degraded {
            None => "ok".green(),
            Some(reason) => reason.to_string().yellow(),
        };
        println!(
            "  {:<24} {:<16} attempts {}  messages {}  {:.1}s",
            stage.kind.label(),
            status,
            stage.attempts,
            stage.messages_sent,
            stage.duration.as_secs_f64()
        );
    }
    println!();
    println!(
        "{} {} v{}: {}/{} categories, ~{} tokens, {:.0}s",
        "Saved".green().bold(),
        record.subject_id,
        record.version,
        outcome.profile.analyzed_count(),
        outcome.stages.len(),
        record.token_count,
        record.analysis_duration_seconds
    );
    if args.print_prompt {
        println!();
        println!("{}", record.prompt_text);
    }
    Ok(())
}

fn progress_printer() -> ProgressCallback {
    Arc::new(|update: ProgressUpdate| {
        let eta = update
            .seconds_remaining
            .filter(|s| *s > 0)
            .map(|s| format!(" (~{s}s left)"))
            .unwrap_or_default();
        eprintln!("{:>4} {}{}", format!("{}%", update.percent).bold(), update.status, eta.dimmed());
    })
}

fn read_photo(path: &Path) -> Result<InlineAttachment> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mime_type = mime_guess::from_path(path).first_or_octet_stream();
    if mime_type.type_() != mime_guess::mime::IMAGE {
        anyhow::bail!("{} does not look like an image ({})", path.display(), mime_type);
    }
    Ok(InlineAttachment {
        mime_type: mime_type.essence_str().to_string(),
        data,
    })
}
