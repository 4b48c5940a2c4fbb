//! Line-oriented export parsing.
//!
//! Each message line looks like
//! `[<bracket?>]<date><sep><time><am/pm?><bracket?><sep><sender>: <content>`.
//! Everything else (continuation lines, encryption notices, group events) is
//! dropped.

use super::media;
use super::timestamp::{self, DateOrder, Meridiem, RawDate};
use crate::message::Message;
use once_cell::sync::Lazy;
use regex::Regex;

static MESSAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[?(?P<date>\d{1,4}[./-]\d{1,2}[./-]\d{1,4}),?\s+(?P<time>\d{1,2}:\d{2}(?::\d{2})?)(?:\s*(?P<meridiem>(?i:[ap]\.?\s?m\b\.?|vorm\.|nachm\.)))?\]?\s*(?:-\s+)?(?P<sender>[^:\[\]]+?):\s(?P<content>.*)$",
    )
    .expect("message line pattern is valid")
});

/// Fields captured from one matching line before the date order is known.
struct RawLine<'a> {
    date: RawDate,
    time: &'a str,
    meridiem: Option<Meridiem>,
    sender: &'a str,
    content: &'a str,
}

fn clean_line(line: &str) -> &str {
    line.trim_start_matches(['\u{feff}', '\u{200e}', '\u{200f}'])
        .trim_end_matches(['\r', '\n'])
}

fn match_line(line: &str) -> Option<RawLine<'_>> {
    let caps = MESSAGE_LINE.captures(line)?;
    let date = RawDate::parse(caps.name("date")?.as_str())?;
    let meridiem = match caps.name("meridiem") {
        Some(marker) => Some(Meridiem::parse(marker.as_str())?),
        None => None,
    };
    Some(RawLine {
        date,
        time: caps.name("time")?.as_str(),
        meridiem,
        sender: caps.name("sender")?.as_str().trim(),
        content: caps.name("content")?.as_str(),
    })
}

/// Decides the day/month order for the whole export.
///
/// The first date that proves an order wins; otherwise the separator of the
/// first date decides.
fn infer_order(lines: &[RawLine<'_>]) -> DateOrder {
    lines
        .iter()
        .find_map(|line| match line.date.decisive_order() {
            Some(DateOrder::YearFirst) | None => None,
            decided => decided,
        })
        .or_else(|| lines.first().map(|line| line.date.separator_order()))
        .unwrap_or(DateOrder::MonthFirst)
}

/// Parses a line-oriented export, keeping input order.
pub fn parse_lines(raw: &str) -> Vec<Message> {
    let matched: Vec<RawLine<'_>> = raw
        .lines()
        .map(clean_line)
        .filter_map(match_line)
        .collect();
    let order = infer_order(&matched);

    let mut skipped = 0usize;
    let messages: Vec<Message> = matched
        .iter()
        .filter_map(|line| {
            let Some(naive) = timestamp::combine(&line.date, order, line.time, line.meridiem)
            else {
                skipped += 1;
                return None;
            };
            let timestamp = naive.and_utc();
            let content = line.content.trim_end();
            Some(if media::is_placeholder(content) {
                Message::media(timestamp, line.sender)
            } else {
                Message::new(timestamp, line.sender, content)
            })
        })
        .collect();

    if skipped > 0 {
        tracing::debug!(target: "parser", "Skipped {} lines with invalid timestamps", skipped);
    }
    messages
}
