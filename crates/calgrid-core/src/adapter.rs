//! Date adapter seam.
//!
//! Every date computation the calendar performs goes through
//! [`DateAdapter`], so layouts can be computed against a pinned clock or a
//! different backend in tests. [`ChronoAdapter`] is the default
//! implementation backed by `chrono` and `chrono-tz`.

use anyhow::anyhow;
use chrono::{
  Datelike,
  Duration,
  Months,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};

const TIMEZONE_ENV_VAR: &str =
  "CALGRID_TIMEZONE";

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "camelCase")]
pub enum DateFormat {
  MonthAndYear,
  DayOfMonth,
  FullTime24h,
  FullTime12h,
  Hours12h,
  KeyboardDate,
  WeekdayShort
}

impl DateFormat {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::MonthAndYear => {
        "monthAndYear"
      }
      | Self::DayOfMonth => "dayOfMonth",
      | Self::FullTime24h => {
        "fullTime24h"
      }
      | Self::FullTime12h => {
        "fullTime12h"
      }
      | Self::Hours12h => "hours12h",
      | Self::KeyboardDate => {
        "keyboardDate"
      }
      | Self::WeekdayShort => {
        "weekdayShort"
      }
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key.trim() {
      | "monthAndYear" => {
        Some(Self::MonthAndYear)
      }
      | "dayOfMonth" => {
        Some(Self::DayOfMonth)
      }
      | "fullTime24h" => {
        Some(Self::FullTime24h)
      }
      | "fullTime12h" => {
        Some(Self::FullTime12h)
      }
      | "hours12h" => {
        Some(Self::Hours12h)
      }
      | "keyboardDate" => {
        Some(Self::KeyboardDate)
      }
      | "weekdayShort" => {
        Some(Self::WeekdayShort)
      }
      | _ => None
    }
  }

  fn pattern(self) -> &'static str {
    match self {
      | Self::MonthAndYear => "%B %Y",
      | Self::DayOfMonth => "%-d",
      | Self::FullTime24h => "%H:%M",
      | Self::FullTime12h => {
        "%-I:%M %p"
      }
      | Self::Hours12h => "%-I %p",
      | Self::KeyboardDate => {
        "%m/%d/%Y"
      }
      | Self::WeekdayShort => "%a"
    }
  }
}

/// Date operations consumed by the interval bucketizer and the composer.
///
/// Arithmetic that can leave chrono's representable range returns an
/// error; callers propagate it untouched.
pub trait DateAdapter {
  /// Current wall-clock date-time in the adapter's timezone.
  fn date(&self) -> NaiveDateTime;

  fn add_days(
    &self,
    date: NaiveDateTime,
    days: i64
  ) -> anyhow::Result<NaiveDateTime> {
    Duration::try_days(days)
      .and_then(|delta| {
        date.checked_add_signed(delta)
      })
      .ok_or_else(|| {
        anyhow!(
          "adding {days} days to {date} \
           is out of range"
        )
      })
  }

  /// Shifts by whole months, clamping the day to the target month's length.
  fn add_months(
    &self,
    date: NaiveDateTime,
    months: i32
  ) -> anyhow::Result<NaiveDateTime> {
    let magnitude =
      Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
      date.checked_add_months(magnitude)
    } else {
      date.checked_sub_months(magnitude)
    };
    shifted.ok_or_else(|| {
      anyhow!(
        "adding {months} months to \
         {date} is out of range"
      )
    })
  }

  fn add_minutes(
    &self,
    date: NaiveDateTime,
    minutes: i64
  ) -> anyhow::Result<NaiveDateTime> {
    Duration::try_minutes(minutes)
      .and_then(|delta| {
        date.checked_add_signed(delta)
      })
      .ok_or_else(|| {
        anyhow!(
          "adding {minutes} minutes to \
           {date} is out of range"
        )
      })
  }

  fn start_of_day(
    &self,
    date: NaiveDateTime
  ) -> NaiveDateTime {
    date.date().and_time(NaiveTime::MIN)
  }

  fn start_of_week(
    &self,
    date: NaiveDateTime,
    first_day: Weekday
  ) -> anyhow::Result<NaiveDateTime> {
    let day_idx = date
      .weekday()
      .num_days_from_monday()
      as i64;
    let start_idx = first_day
      .num_days_from_monday()
      as i64;
    let diff =
      (7 + day_idx - start_idx) % 7;
    self.add_days(
      self.start_of_day(date),
      -diff
    )
  }

  fn start_of_month(
    &self,
    date: NaiveDateTime
  ) -> NaiveDateTime {
    let day = self.start_of_day(date);
    day.with_day(1).unwrap_or(day)
  }

  fn end_of_month(
    &self,
    date: NaiveDateTime
  ) -> anyhow::Result<NaiveDateTime> {
    let next = self.add_months(
      self.start_of_month(date),
      1
    )?;
    self.add_days(next, -1)
  }

  fn format(
    &self,
    date: NaiveDateTime,
    format: DateFormat
  ) -> String {
    date
      .format(format.pattern())
      .to_string()
  }

  fn weekday_name(
    &self,
    weekday: Weekday
  ) -> String {
    match weekday {
      | Weekday::Sun => "Sun",
      | Weekday::Mon => "Mon",
      | Weekday::Tue => "Tue",
      | Weekday::Wed => "Wed",
      | Weekday::Thu => "Thu",
      | Weekday::Fri => "Fri",
      | Weekday::Sat => "Sat"
    }
    .to_string()
  }

  fn is_same_day(
    &self,
    a: NaiveDateTime,
    b: NaiveDateTime
  ) -> bool {
    a.date() == b.date()
  }

  fn is_same_month(
    &self,
    a: NaiveDateTime,
    b: NaiveDateTime
  ) -> bool {
    a.year() == b.year()
      && a.month() == b.month()
  }

  fn is_equal(
    &self,
    a: NaiveDateTime,
    b: NaiveDateTime
  ) -> bool {
    a == b
  }

  fn is_after(
    &self,
    a: NaiveDateTime,
    b: NaiveDateTime
  ) -> bool {
    a > b
  }

  /// True when `date` lies strictly between the range bounds. Boundary
  /// coincidence is checked separately with [`DateAdapter::is_equal`].
  fn is_within_range(
    &self,
    date: NaiveDateTime,
    range: (NaiveDateTime, NaiveDateTime)
  ) -> bool {
    self.is_after(date, range.0)
      && self.is_after(range.1, date)
  }

  /// Whole weeks covering the month of `month`, each seven days long.
  fn week_array(
    &self,
    month: NaiveDateTime,
    first_day: Weekday
  ) -> anyhow::Result<Vec<Vec<NaiveDateTime>>>
  {
    let first = self.start_of_month(month);
    let last = self.end_of_month(month)?;
    let mut cursor =
      self.start_of_week(first, first_day)?;
    let mut weeks = Vec::new();

    while cursor <= last {
      let mut week = Vec::with_capacity(7);
      for _ in 0..7 {
        week.push(cursor);
        cursor = self.add_days(cursor, 1)?;
      }
      weeks.push(week);
    }

    Ok(weeks)
  }

  fn week_number(
    &self,
    date: NaiveDateTime
  ) -> u32 {
    date.iso_week().week()
  }
}

#[derive(Debug, Clone)]
pub struct ChronoAdapter {
  timezone: Tz,
  now:      Option<NaiveDateTime>
}

impl ChronoAdapter {
  pub fn new(timezone: Tz) -> Self {
    Self {
      timezone,
      now: None
    }
  }

  /// Resolves the timezone from the configured id, then the
  /// `CALGRID_TIMEZONE` environment variable, then UTC.
  pub fn from_timezone_id(
    configured: Option<&str>
  ) -> Self {
    let timezone = configured
      .and_then(|raw| {
        parse_timezone(raw, "config")
      })
      .or_else(|| {
        std::env::var(TIMEZONE_ENV_VAR)
          .ok()
          .and_then(|raw| {
            parse_timezone(
              &raw,
              TIMEZONE_ENV_VAR
            )
          })
      })
      .unwrap_or(chrono_tz::UTC);
    Self::new(timezone)
  }

  /// Pins [`DateAdapter::date`] to a fixed instant.
  #[must_use]
  pub fn with_now(
    mut self,
    now: NaiveDateTime
  ) -> Self {
    self.now = Some(now);
    self
  }

  pub fn timezone(&self) -> Tz {
    self.timezone
  }
}

impl Default for ChronoAdapter {
  fn default() -> Self {
    Self::new(chrono_tz::UTC)
  }
}

impl DateAdapter for ChronoAdapter {
  fn date(&self) -> NaiveDateTime {
    self.now.unwrap_or_else(|| {
      Utc::now()
        .with_timezone(&self.timezone)
        .naive_local()
    })
  }
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD HH:MM[:SS]`.
pub fn parse_date_time(
  raw: &str
) -> anyhow::Result<NaiveDateTime> {
  let trimmed = raw.trim();
  for pattern in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(parsed) =
      NaiveDateTime::parse_from_str(
        trimmed, pattern
      )
    {
      return Ok(parsed);
    }
  }

  NaiveDate::parse_from_str(
    trimmed, "%Y-%m-%d"
  )
  .map(|date| {
    date.and_time(NaiveTime::MIN)
  })
  .map_err(|err| {
    anyhow!(
      "invalid date '{trimmed}': {err}"
    )
  })
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime,
    Weekday
  };

  use super::{
    ChronoAdapter,
    DateAdapter,
    DateFormat,
    parse_date_time
  };

  fn at(
    y: i32,
    m: u32,
    d: u32,
    h: u32,
    min: u32
  ) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
      .and_hms_opt(h, min, 0)
      .expect("valid time")
  }

  #[test]
  fn add_months_clamps_to_month_end() {
    let adapter = ChronoAdapter::default();
    let shifted = adapter
      .add_months(
        at(2026, 1, 31, 8, 0),
        1
      )
      .expect("shift month");
    assert_eq!(
      shifted,
      at(2026, 2, 28, 8, 0)
    );

    let back = adapter
      .add_months(
        at(2026, 3, 31, 8, 0),
        -1
      )
      .expect("shift month back");
    assert_eq!(back, at(2026, 2, 28, 8, 0));
  }

  #[test]
  fn add_days_out_of_range_is_error() {
    let adapter = ChronoAdapter::default();
    let result = adapter
      .add_days(NaiveDateTime::MAX, 1);
    assert!(result.is_err());
  }

  #[test]
  fn within_range_excludes_bounds() {
    let adapter = ChronoAdapter::default();
    let lo = at(2026, 2, 17, 11, 0);
    let hi = at(2026, 2, 17, 11, 59);
    assert!(adapter.is_within_range(
      at(2026, 2, 17, 11, 30),
      (lo, hi)
    ));
    assert!(
      !adapter.is_within_range(lo, (lo, hi))
    );
    assert!(
      !adapter.is_within_range(hi, (lo, hi))
    );
  }

  #[test]
  fn week_array_covers_whole_month() {
    let adapter = ChronoAdapter::default();
    let weeks = adapter
      .week_array(
        at(2026, 2, 10, 0, 0),
        Weekday::Sun
      )
      .expect("week array");

    assert_eq!(weeks.len(), 4);
    assert_eq!(
      weeks[0][0],
      at(2026, 2, 1, 0, 0)
    );
    assert!(
      weeks.iter().all(|week| week.len() == 7)
    );
  }

  #[test]
  fn formats_named_patterns() {
    let adapter = ChronoAdapter::default();
    let date = at(2026, 2, 17, 13, 5);
    assert_eq!(
      adapter.format(
        date,
        DateFormat::MonthAndYear
      ),
      "February 2026"
    );
    assert_eq!(
      adapter.format(date, DateFormat::Hours12h),
      "1 PM"
    );
    assert_eq!(
      adapter
        .format(date, DateFormat::FullTime24h),
      "13:05"
    );
    assert_eq!(
      DateFormat::from_key("fullTime12h"),
      Some(DateFormat::FullTime12h)
    );
  }

  #[test]
  fn pinned_now_is_returned() {
    let now = at(2026, 2, 17, 9, 30);
    let adapter =
      ChronoAdapter::default().with_now(now);
    assert_eq!(adapter.date(), now);
  }

  #[test]
  fn parses_date_only_and_minutes() {
    assert_eq!(
      parse_date_time("2026-02-17")
        .expect("date only"),
      at(2026, 2, 17, 0, 0)
    );
    assert_eq!(
      parse_date_time("2026-02-17T11:30")
        .expect("minute precision"),
      at(2026, 2, 17, 11, 30)
    );
    assert!(parse_date_time("17/02/2026").is_err());
  }
}
