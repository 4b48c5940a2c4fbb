use super::{AppContext, load_export};
use anyhow::Result;
use colored::Colorize;
use mimic_core::message::participants;
use mimic_core::parser::ExportFormat;
use mimic_core::sampler::Sampler;
use mimic_core::stats::CorpusStats;
use std::path::Path;

pub fn parse(path: &Path, format: ExportFormat, json: bool) -> Result<()> {
    let messages = load_export(path, format)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    let media = messages.iter().filter(|m| m.has_media).count();
    println!("{} {}", "Messages:".bold(), messages.len());
    println!("{} {}", "Media placeholders:".bold(), media);
    if let (Some(first), Some(last)) = (messages.first(), messages.last()) {
        println!(
            "{} {} → {}",
            "Span:".bold(),
            first.timestamp.format("%Y-%m-%d %H:%M"),
            last.timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    println!("{}", "Participants:".bold());
    for participant in participants(&messages) {
        println!("  {:<24} {}", participant.name.cyan(), participant.message_count);
    }
    Ok(())
}

pub fn stats(path: &Path, format: ExportFormat, json: bool) -> Result<()> {
    let messages = load_export(path, format)?;
    let stats = CorpusStats::compute(&messages);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{} {}", "Messages:".bold(), stats.total_messages);
    for sender in &stats.senders {
        println!();
        println!("{}", sender.sender.cyan().bold());
        println!("  messages        {}", sender.message_count);
        println!("  media           {}", sender.media_count);
        println!("  average length  {:.1} chars", sender.average_length);
        println!("  with emoji      {:.0}%", sender.emoji_ratio * 100.0);
        println!("  questions       {:.0}%", sender.question_ratio * 100.0);
        if let Some(hour) = sender.most_active_hour {
            println!("  busiest hour    {hour:02}:00 UTC");
        }
    }
    Ok(())
}

pub fn sample(
    ctx: &AppContext,
    path: &Path,
    format: ExportFormat,
    target_tokens: Option<usize>,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let messages = load_export(path, format)?;
    let mut config = ctx.config.sampler.clone();
    if let Some(target) = target_tokens {
        config.target_tokens = target;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let sampler = Sampler::new(config);
    let corpus = sampler.sample(&messages);

    if json {
        println!("{}", serde_json::to_string_pretty(&corpus)?);
        return Ok(());
    }

    let stats = &corpus.stats;
    println!(
        "{} {} of {} messages, ~{} of ~{} tokens (target {})",
        "Sampled:".bold(),
        stats.messages_included,
        stats.total_messages,
        stats.estimated_tokens,
        stats.original_tokens,
        corpus.budget.target_tokens
    );
    if !stats.sampled {
        println!("{}", "Corpus fits the budget; nothing was dropped.".green());
    }
    for (strategy, tokens) in &stats.strategy_tokens {
        let allocated = corpus
            .budget
            .strategy_allocations
            .get(strategy)
            .copied()
            .unwrap_or_default();
        println!("  {:<12} {:>7} tokens (allocated {})", strategy.to_string(), tokens, allocated);
    }
    Ok(())
}
