use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use rust_i18n::t;
use serde::{Deserialize, Serialize};

/// First day of a displayed week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// Days between the week start and `weekday` (0..=6)
    pub fn offset_of(self, weekday: Weekday) -> i64 {
        match self {
            WeekStart::Sunday => weekday.num_days_from_sunday() as i64,
            WeekStart::Monday => weekday.num_days_from_monday() as i64,
        }
    }

    /// The seven weekdays in display order
    pub fn days(self) -> [Weekday; 7] {
        let mut days = [self.weekday(); 7];
        for i in 1..7 {
            days[i] = days[i - 1].succ();
        }
        days
    }
}

impl TryFrom<u8> for WeekStart {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WeekStart::Sunday),
            1 => Ok(WeekStart::Monday),
            other => Err(format!("week start must be 0 (Sunday) or 1 (Monday), got {other}")),
        }
    }
}

impl From<WeekStart> for u8 {
    fn from(value: WeekStart) -> Self {
        match value {
            WeekStart::Sunday => 0,
            WeekStart::Monday => 1,
        }
    }
}

/// Source of "now", injectable so tests can pin the date
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Attach a timezone to a wall-clock time.
///
/// Ambiguous times (DST fall-back) take the earliest instant. Times inside a
/// DST gap are moved forward by one hour.
pub fn localize(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(*naive + Duration::hours(1))).earliest())
}

/// Midnight at the start of `date` in `tz`
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    localize(tz, &date.and_time(NaiveTime::MIN))
}

/// First day of the week containing `date`
pub fn week_start_of(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    date - Duration::days(week_start.offset_of(date.weekday()))
}

/// Last day of the week containing `date`
pub fn week_end_of(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    week_start_of(date, week_start) + Duration::days(6)
}

/// First day of the month containing `date`
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Last day of the month containing `date`
pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(days_in_month(date.year(), date.month()))
        .unwrap_or(date)
}

/// Add whole months to a (year, month) pair
pub fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let index = year as i64 * 12 + (month as i64 - 1) + months as i64;
    ((index.div_euclid(12)) as i32, (index.rem_euclid(12) + 1) as u32)
}

/// Short localized weekday label, e.g. "Mon" or "(月)"
pub fn weekday_label(weekday: Weekday, locale: &str) -> String {
    match weekday {
        Weekday::Sun => t!("weekday.sun", locale = locale).to_string(),
        Weekday::Mon => t!("weekday.mon", locale = locale).to_string(),
        Weekday::Tue => t!("weekday.tue", locale = locale).to_string(),
        Weekday::Wed => t!("weekday.wed", locale = locale).to_string(),
        Weekday::Thu => t!("weekday.thu", locale = locale).to_string(),
        Weekday::Fri => t!("weekday.fri", locale = locale).to_string(),
        Weekday::Sat => t!("weekday.sat", locale = locale).to_string(),
    }
}
