use crate::utils::time::{local_midnight, localize};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

/// Converts feed date and date-time values into instants in the display timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeResolver {
    display_tz: Tz,
    source_tz: Tz,
}

impl DateTimeResolver {
    /// `source_tz` applies to floating times without a TZID
    pub fn new(display_tz: Tz, source_tz: Tz) -> Self {
        Self {
            display_tz,
            source_tz,
        }
    }

    pub fn display_tz(&self) -> Tz {
        self.display_tz
    }

    /// Resolve `value` (optionally qualified by a TZID parameter).
    ///
    /// - `YYYYMMDD`: all-day, midnight in the display timezone
    /// - `YYYYMMDDTHHMMSSZ`: UTC
    /// - `YYYYMMDDTHHMMSS±HHMM`: fixed offset, falling back to the TZID or source zone
    /// - `YYYYMMDDTHHMMSS`: the TZID zone, or the default source zone
    ///
    /// Anything else yields `None`.
    pub fn resolve(&self, value: &str, tzid: Option<&str>) -> Option<DateTime<Tz>> {
        let value = value.trim();

        if is_all_day(value) {
            let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
            return local_midnight(&self.display_tz, date);
        }

        if value.len() < 15 || !value.is_char_boundary(15) {
            return None;
        }
        let (stamp, suffix) = value.split_at(15);
        let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S").ok()?;

        match suffix {
            "" => self.resolve_in_source_zone(&naive, tzid),
            "Z" => Some(Utc.from_utc_datetime(&naive).with_timezone(&self.display_tz)),
            offset if offset.starts_with('+') || offset.starts_with('-') => {
                match parse_offset(offset) {
                    Some(fixed) => fixed
                        .from_local_datetime(&naive)
                        .single()
                        .map(|dt| dt.with_timezone(&self.display_tz)),
                    None => {
                        debug!(value, "Unparseable UTC offset, using source timezone");
                        self.resolve_in_source_zone(&naive, tzid)
                    }
                }
            }
            _ => None,
        }
    }

    fn resolve_in_source_zone(
        &self,
        naive: &NaiveDateTime,
        tzid: Option<&str>,
    ) -> Option<DateTime<Tz>> {
        let zone = self.source_zone(tzid);
        let local = localize(&zone, naive)?;
        if zone == self.display_tz {
            Some(local)
        } else {
            Some(local.with_timezone(&self.display_tz))
        }
    }

    /// Zone named by `tzid`, or the default source zone when absent or unknown
    fn source_zone(&self, tzid: Option<&str>) -> Tz {
        match tzid.map(str::trim).filter(|t| !t.is_empty()) {
            Some(name) => name.parse().unwrap_or_else(|_| {
                debug!(tzid = name, "Unknown TZID, using source timezone");
                self.source_tz
            }),
            None => self.source_tz,
        }
    }
}

/// An 8-digit date value with no time component
pub fn is_all_day(value: &str) -> bool {
    let value = value.trim();
    value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parse `+HHMM` / `-HHMM`
fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let (sign, digits) = offset.split_at(1);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes > 59 {
        return None;
    }
    let seconds = hours * 3600 + minutes * 60;
    match sign {
        "+" => FixedOffset::east_opt(seconds),
        _ => FixedOffset::west_opt(seconds),
    }
}
