//! Date and time field parsing for line-oriented exports.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Order of the day and month fields in a numeric date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
    /// `YYYY-MM-DD` style, detected per field by a four-digit leading year
    YearFirst,
}

/// Numeric date split into its three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDate {
    first: u32,
    second: u32,
    third: u32,
    first_is_year: bool,
    separator: char,
}

impl RawDate {
    pub fn parse(text: &str) -> Option<Self> {
        let separator = text.chars().find(|c| matches!(c, '.' | '/' | '-'))?;
        let mut parts = text.split(['.', '/', '-']);
        let first_text = parts.next()?;
        let first = first_text.parse().ok()?;
        let second = parts.next()?.parse().ok()?;
        let third = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            first,
            second,
            third,
            first_is_year: first_text.len() == 4,
            separator,
        })
    }

    /// The order this date proves on its own, if any.
    pub fn decisive_order(&self) -> Option<DateOrder> {
        if self.first_is_year {
            Some(DateOrder::YearFirst)
        } else if self.first > 12 {
            Some(DateOrder::DayFirst)
        } else if self.second > 12 {
            Some(DateOrder::MonthFirst)
        } else {
            None
        }
    }

    /// Order implied by the separator when nothing else decides.
    pub fn separator_order(&self) -> DateOrder {
        match self.separator {
            '.' => DateOrder::DayFirst,
            _ => DateOrder::MonthFirst,
        }
    }

    pub fn to_date(&self, order: DateOrder) -> Option<NaiveDate> {
        let order = if self.first_is_year {
            DateOrder::YearFirst
        } else {
            order
        };
        let (year, month, day) = match order {
            DateOrder::YearFirst => (self.first, self.second, self.third),
            DateOrder::DayFirst => (expand_year(self.third), self.second, self.first),
            DateOrder::MonthFirst => (expand_year(self.third), self.first, self.second),
        };
        NaiveDate::from_ymd_opt(year as i32, month, day)
    }
}

fn expand_year(year: u32) -> u32 {
    if year < 100 { 2000 + year } else { year }
}

/// Half of the day named by a 12-hour marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    /// Recognizes `AM`, `a.m.`, `a. m.`, `vorm.` and their PM counterparts.
    pub fn parse(marker: &str) -> Option<Self> {
        let compact: String = marker
            .chars()
            .filter(|c| c.is_alphabetic())
            .flat_map(char::to_lowercase)
            .collect();
        match compact.as_str() {
            "am" | "vorm" => Some(Self::Am),
            "pm" | "nachm" => Some(Self::Pm),
            _ => None,
        }
    }
}

/// Parses `H:MM` or `H:MM:SS`, applying an optional 12-hour marker.
pub fn parse_time(text: &str, meridiem: Option<Meridiem>) -> Option<NaiveTime> {
    let mut parts = text.split(':');
    let mut hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    let second: u32 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };

    match meridiem {
        Some(Meridiem::Am) if hour == 12 => hour = 0,
        Some(Meridiem::Pm) if hour < 12 => hour += 12,
        Some(_) if hour > 12 => return None,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Combines raw fields into a timestamp.
pub fn combine(
    date: &RawDate,
    order: DateOrder,
    time: &str,
    meridiem: Option<Meridiem>,
) -> Option<NaiveDateTime> {
    Some(date.to_date(order)?.and_time(parse_time(time, meridiem)?))
}
