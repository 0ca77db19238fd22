//! Expansion of RRULE/EXDATE into concrete occurrence start times.
//!
//! Only the subset used by display calendars is handled: FREQ, INTERVAL, COUNT,
//! UNTIL, BYDAY (plain weekday matching) and BYMONTHDAY.

use super::datetime::{is_all_day, DateTimeResolver};
use super::parser::RawPropertyBlock;
use crate::components::models::Window;
use crate::utils::time::{add_months, days_in_month, localize};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;
use tracing::debug;

/// Reference bound on generated instances for rules without COUNT
pub const DEFAULT_SAFETY_CAP: usize = 365;

/// How far a BYDAY scan looks ahead for the next matching weekday
const BYDAY_SCAN_DAYS: i64 = 14;

/// How many invalid month/day combinations are skipped before giving up
const MAX_MONTH_SKIPS: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Some(Frequency::Daily),
            "WEEKLY" => Some(Frequency::Weekly),
            "MONTHLY" => Some(Frequency::Monthly),
            "YEARLY" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub count: Option<usize>,
    pub until: Option<DateTime<Tz>>,
    pub by_day: Vec<Weekday>,
    pub by_month_day: Vec<u32>,
}

impl RecurrenceRule {
    /// Parse an RRULE value. A rule without a recognised FREQ is not a recurrence.
    ///
    /// `tzid` is the DTSTART zone, used for a floating UNTIL.
    pub fn parse(value: &str, resolver: &DateTimeResolver, tzid: Option<&str>) -> Option<Self> {
        let mut freq = None;
        let mut rule = RecurrenceRule {
            freq: Frequency::Daily,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
        };

        for part in value.trim().split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => freq = Frequency::parse(val),
                "INTERVAL" => rule.interval = val.trim().parse().ok().filter(|i| *i >= 1).unwrap_or(1),
                "COUNT" => rule.count = val.trim().parse().ok(),
                "UNTIL" => rule.until = parse_until(val, resolver, tzid),
                "BYDAY" => rule.by_day = val.split(',').filter_map(parse_weekday).collect(),
                "BYMONTHDAY" => {
                    rule.by_month_day = val
                        .split(',')
                        .filter_map(|d| d.trim().parse::<u32>().ok())
                        .filter(|d| (1..=31).contains(d))
                        .collect()
                }
                _ => {}
            }
        }

        rule.freq = freq?;
        Some(rule)
    }
}

/// UNTIL given as a bare date covers that whole day
fn parse_until(value: &str, resolver: &DateTimeResolver, tzid: Option<&str>) -> Option<DateTime<Tz>> {
    let start = resolver.resolve(value, tzid)?;
    if is_all_day(value) {
        Some(start + Duration::days(1) - Duration::seconds(1))
    } else {
        Some(start)
    }
}

/// `MO`, `1MO`, `-1FR`: ordinals are accepted and ignored
fn parse_weekday(token: &str) -> Option<Weekday> {
    let code = token
        .trim()
        .trim_start_matches(|c: char| c == '+' || c == '-' || c.is_ascii_digit());
    match code.to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Dates removed from a recurring event by its EXDATE properties
pub fn excluded_dates(block: &RawPropertyBlock, resolver: &DateTimeResolver) -> HashSet<NaiveDate> {
    let dtstart_tzid = block.tzid("DTSTART");
    block
        .exdates()
        .iter()
        .flat_map(|(values, tzid)| {
            let tzid = tzid.as_deref().or(dtstart_tzid);
            values
                .split(',')
                .filter_map(move |value| resolver.resolve(value, tzid))
                .map(|instant| instant.date_naive())
        })
        .collect()
}

/// Lazily generated, finite sequence of occurrence starts.
///
/// Generation stops at the first of: the window end, UNTIL, COUNT, the safety
/// cap, a step that cannot be computed, or a step that does not move forward.
/// EXDATE dates and instants before the window start are generated but not
/// yielded. COUNT counts every generated instance; the safety cap applies only
/// to rules without COUNT and counts instances from the window start on.
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: Option<RecurrenceRule>,
    tz: Tz,
    anchor: NaiveDateTime,
    window_start: DateTime<Tz>,
    upper: DateTime<Tz>,
    count: Option<usize>,
    safety_cap: usize,
    exdates: HashSet<NaiveDate>,
    current: Option<NaiveDateTime>,
    generated: usize,
    in_window: usize,
    months_from_anchor: u32,
    done: bool,
}

impl Occurrences {
    pub fn new(
        rule: Option<RecurrenceRule>,
        anchor: DateTime<Tz>,
        window: &Window,
        exdates: HashSet<NaiveDate>,
        safety_cap: usize,
    ) -> Self {
        let upper = match rule.as_ref().and_then(|r| r.until) {
            Some(until) if until < window.end => until,
            _ => window.end,
        };
        let count = rule.as_ref().and_then(|r| r.count);
        let tz = anchor.timezone();

        let mut occurrences = Self {
            rule,
            tz,
            anchor: anchor.naive_local(),
            window_start: window.start,
            upper,
            count,
            safety_cap,
            exdates,
            current: None,
            generated: 0,
            in_window: 0,
            months_from_anchor: 0,
            done: false,
        };
        if count.is_none() {
            occurrences.current = occurrences.skip_ahead(window.start.with_timezone(&tz).naive_local());
        }
        occurrences
    }

    /// Last fixed-length step of the rule that lies well before `target`.
    ///
    /// Only DAILY and plain WEEKLY rules step by a fixed number of days, so only
    /// they can jump over the part of the series before the window.
    fn skip_ahead(&self, target: NaiveDateTime) -> Option<NaiveDateTime> {
        let rule = self.rule.as_ref()?;
        let step_days = match rule.freq {
            Frequency::Daily => rule.interval.max(1) as i64,
            Frequency::Weekly if rule.by_day.is_empty() => rule.interval.max(1) as i64 * 7,
            _ => return None,
        };
        let steps = (target - self.anchor).num_days() / step_days - 1;
        if steps < 1 {
            return None;
        }
        self.anchor.checked_add_signed(Duration::days(steps.checked_mul(step_days)?))
    }

    fn cap_reached(&self) -> bool {
        match self.count {
            Some(count) => self.generated >= count,
            None => self.in_window >= self.safety_cap,
        }
    }

    fn step(&mut self, current: NaiveDateTime) -> Option<NaiveDateTime> {
        let rule = self.rule.as_ref()?;
        let time = self.anchor.time();
        let interval = rule.interval.max(1);

        match rule.freq {
            Frequency::Daily => current.checked_add_signed(Duration::days(interval as i64)),
            Frequency::Weekly if rule.by_day.is_empty() => {
                current.checked_add_signed(Duration::weeks(interval as i64))
            }
            Frequency::Weekly => {
                let by_day = rule.by_day.clone();
                next_weekday_match(current.date(), &by_day, interval).map(|d| d.and_time(time))
            }
            Frequency::Monthly if rule.by_month_day.is_empty() => self.advance_months(interval),
            Frequency::Monthly => {
                let days = rule.by_month_day.clone();
                next_month_day(current.date(), &days, interval).map(|d| d.and_time(time))
            }
            Frequency::Yearly => self.advance_months(interval.saturating_mul(12)),
        }
    }

    /// Same day-of-month as the anchor, `months` further on; months lacking that day are skipped
    fn advance_months(&mut self, months: u32) -> Option<NaiveDateTime> {
        for _ in 0..MAX_MONTH_SKIPS {
            self.months_from_anchor = self.months_from_anchor.checked_add(months)?;
            let (year, month) = add_months(self.anchor.year(), self.anchor.month(), self.months_from_anchor);
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, self.anchor.day()) {
                return Some(date.and_time(self.anchor.time()));
            }
        }
        None
    }
}

impl Iterator for Occurrences {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let candidate = match self.current {
                None => Some(self.anchor),
                Some(current) => self.step(current),
            };

            let Some(candidate) = candidate else {
                self.done = true;
                break;
            };
            if self.current.is_some_and(|current| candidate <= current) {
                debug!(%candidate, "Recurrence did not advance, stopping");
                self.done = true;
                break;
            }
            let Some(instant) = localize(&self.tz, &candidate) else {
                self.done = true;
                break;
            };
            if instant > self.upper || self.cap_reached() {
                self.done = true;
                break;
            }

            self.generated += 1;
            self.current = Some(candidate);

            if instant < self.window_start {
                continue;
            }
            self.in_window += 1;
            if self.exdates.contains(&instant.date_naive()) {
                continue;
            }
            return Some(instant);
        }
        None
    }
}

/// Next date after `from` whose weekday is listed, then `interval - 1` more weeks
fn next_weekday_match(from: NaiveDate, by_day: &[Weekday], interval: u32) -> Option<NaiveDate> {
    let found = (1..=BYDAY_SCAN_DAYS)
        .filter_map(|offset| from.checked_add_signed(Duration::days(offset)))
        .find(|date| by_day.contains(&date.weekday()))?;
    found.checked_add_signed(Duration::weeks(interval as i64 - 1))
}

/// Next listed day-of-month after `from`.
///
/// Within the current month the smallest listed day after `from` wins. Rolling
/// into a later month uses the first listed day, `interval` months on.
fn next_month_day(from: NaiveDate, days: &[u32], interval: u32) -> Option<NaiveDate> {
    let month_len = days_in_month(from.year(), from.month());
    if let Some(day) = days
        .iter()
        .copied()
        .filter(|d| *d > from.day() && *d <= month_len)
        .min()
    {
        return from.with_day(day);
    }

    let first = *days.first()?;
    let mut months = 0u32;
    for _ in 0..MAX_MONTH_SKIPS {
        months = months.checked_add(interval)?;
        let (year, month) = add_months(from.year(), from.month(), months);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, first) {
            return Some(date);
        }
    }
    None
}

/// Occurrence starts of one VEVENT inside `window`.
///
/// Events without a parseable RRULE produce at most their own start.
pub fn expand(
    block: &RawPropertyBlock,
    anchor: DateTime<Tz>,
    window: &Window,
    resolver: &DateTimeResolver,
    safety_cap: usize,
) -> Occurrences {
    let rule = block.non_empty("RRULE").and_then(|value| {
        let rule = RecurrenceRule::parse(value, resolver, block.tzid("DTSTART"));
        if rule.is_none() {
            debug!(rrule = value, "Unparseable RRULE, treating as single occurrence");
        }
        rule
    });
    let exdates = if rule.is_some() {
        excluded_dates(block, resolver)
    } else {
        HashSet::new()
    };
    Occurrences::new(rule, anchor, window, exdates, safety_cap)
}
