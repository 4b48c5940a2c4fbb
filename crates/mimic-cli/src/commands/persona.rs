use super::{AppContext, load_export, resolve_subject};
use anyhow::{Result, bail};
use colored::Colorize;
use mimic_application::{PlannedReply, ReplyService};
use mimic_core::parser::ExportFormat;
use mimic_core::record::PersonaRecordRepository;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;

pub async fn reply(
    ctx: &AppContext,
    id: &str,
    message: &str,
    live: bool,
    seed: Option<u64>,
    model: Option<&str>,
) -> Result<()> {
    let usecase = ctx.usecase(model).await?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let plan = usecase.reply(id, &[], message, &mut rng).await?;

    if live {
        ReplyService::deliver(&plan, |fragment| println!("{}", fragment.text.trim())).await;
    } else {
        print_schedule(&plan);
    }
    Ok(())
}

fn print_schedule(plan: &PlannedReply) {
    println!(
        "{}",
        format!("(reads and thinks for {:.1}s)", plan.initial_delay_ms as f64 / 1000.0).dimmed()
    );
    let mut elapsed = plan.initial_delay_ms;
    for fragment in &plan.fragments {
        elapsed += fragment.delay_ms;
        println!(
            "{} {}",
            format!("[+{:>5.1}s]", elapsed as f64 / 1000.0).dimmed(),
            fragment.text.trim()
        );
    }
}

pub async fn history(ctx: &AppContext, id: Option<&str>, show_prompt: bool) -> Result<()> {
    let repository = ctx.repository()?;
    let Some(id) = id else {
        let subjects = repository.subjects().await?;
        if subjects.is_empty() {
            println!("No personas stored in {}", repository.root().display());
        }
        for subject in subjects {
            println!("{subject}");
        }
        return Ok(());
    };

    let versions = repository.list_versions(id).await?;
    if versions.is_empty() {
        bail!("No persona stored as '{}'", id);
    }
    for record in &versions {
        let analyzed = record.categories_analyzed.values().filter(|v| **v).count();
        println!(
            "{} {}  {}/{} categories  ~{} tokens  {} learned facts",
            format!("v{}", record.version).bold(),
            record.created_at.format("%Y-%m-%d %H:%M"),
            analyzed,
            record.categories_analyzed.len(),
            record.token_count,
            record.learned_facts.len()
        );
    }
    if show_prompt {
        if let Some(latest) = versions.last() {
            println!();
            println!("{}", latest.system_instruction());
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn learn(
    ctx: &AppContext,
    id: &str,
    path: &Path,
    format: ExportFormat,
    subject: Option<&str>,
    user: Option<&str>,
    last: usize,
    model: Option<&str>,
) -> Result<()> {
    let messages = load_export(path, format)?;
    let subject = resolve_subject(&messages, subject, user)?;
    let skip = messages.len().saturating_sub(last);
    let usecase = ctx.usecase(model).await?;

    match usecase.learn(id, &subject, &messages[skip..]).await? {
        Some(record) => {
            // facts of this run share the run id of the last one appended
            let run_id = record
                .learned_facts
                .last()
                .map(|f| f.source_run_id.as_str())
                .unwrap_or_default();
            let new_facts: Vec<_> = record
                .learned_facts
                .iter()
                .filter(|f| f.source_run_id == run_id)
                .collect();
            println!(
                "{} {} v{} with {} new facts:",
                "Saved".green().bold(),
                record.subject_id,
                record.version,
                new_facts.len()
            );
            for fact in new_facts {
                println!("  - {} ({:.0}%)", fact.fact, fact.confidence * 100.0);
            }
        }
        None => println!("Nothing new learned about {}", subject.cyan()),
    }
    Ok(())
}
