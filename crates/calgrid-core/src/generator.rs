//! Day list generation for month and week grids.

use std::fmt;

use chrono::{
  Datelike,
  NaiveDate,
  NaiveDateTime,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::adapter::{
  DateAdapter,
  DateFormat
};

/// One day as displayed by a grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
  pub date:          NaiveDateTime,
  pub iso_date:      String,
  pub formatted:     String,
  pub localized:     String,
  pub year:          i32,
  pub month:         u32,
  pub weekday:       Weekday,
  pub is_disabled:   bool,
  pub is_week_start: bool,
  pub is_week_end:   bool,
  pub is_today:      bool,
  pub is_adjacent:   bool,
  pub is_hidden:     bool,
  pub is_start:      bool,
  pub is_end:        bool,
  pub is_same:       bool,
  pub is_selected:   bool
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum WeeksInMonth {
  /// Only the weeks that overlap the month.
  #[default]
  Dynamic,
  /// Always six rows, padded with days of the following month.
  Static
}

#[derive(Default)]
pub enum AllowedDates {
  #[default]
  Any,
  List(Vec<NaiveDate>),
  Predicate(Box<dyn Fn(NaiveDate) -> bool>)
}

impl fmt::Debug for AllowedDates {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::Any => f.write_str("Any"),
      | Self::List(dates) => {
        f.debug_tuple("List")
          .field(dates)
          .finish()
      }
      | Self::Predicate(_) => {
        f.write_str("Predicate(..)")
      }
    }
  }
}

#[derive(Debug)]
pub struct GeneratorOptions {
  /// Days shown in each row, in display order.
  pub weekdays:             Vec<Weekday>,
  pub first_day_of_week:    Weekday,
  pub weeks_in_month:       WeeksInMonth,
  pub show_adjacent_months: bool,
  pub min:                  Option<NaiveDateTime>,
  pub max:                  Option<NaiveDateTime>,
  pub allowed_dates:        AllowedDates,
  pub disabled:             bool
}

impl Default for GeneratorOptions {
  fn default() -> Self {
    Self {
      weekdays:             all_weekdays(
        Weekday::Sun
      ),
      first_day_of_week:    Weekday::Sun,
      weeks_in_month:
        WeeksInMonth::Dynamic,
      show_adjacent_months: true,
      min:                  None,
      max:                  None,
      allowed_dates:        AllowedDates::Any,
      disabled:             false
    }
  }
}

/// The seven weekdays starting at `first`.
pub fn all_weekdays(
  first: Weekday
) -> Vec<Weekday> {
  let mut day = first;
  let mut days = Vec::with_capacity(7);
  for _ in 0..7 {
    days.push(day);
    day = day.succ();
  }
  days
}

const STATIC_MONTH_DAYS: usize = 6 * 7;

pub struct DayGenerator<'a, A: DateAdapter> {
  adapter: &'a A,
  options: &'a GeneratorOptions
}

impl<'a, A: DateAdapter> DayGenerator<'a, A> {
  pub fn new(
    adapter: &'a A,
    options: &'a GeneratorOptions
  ) -> Self {
    Self { adapter, options }
  }

  /// Builds day descriptors for `dates`, dropping weekdays that are not
  /// shown. `display` anchors the adjacent-month flags.
  pub fn gen_days(
    &self,
    dates: &[NaiveDateTime],
    display: NaiveDateTime,
    today: NaiveDateTime,
    model: &[NaiveDateTime]
  ) -> anyhow::Result<Vec<CalendarDay>> {
    let adapter = self.adapter;
    let row_len =
      self.options.weekdays.len().max(1);
    let month_start =
      adapter.start_of_month(display);
    let month_end =
      adapter.end_of_month(display)?;

    let days = dates
      .iter()
      .copied()
      .filter(|date| {
        self
          .options
          .weekdays
          .contains(&date.weekday())
      })
      .enumerate()
      .map(|(index, date)| {
        let is_adjacent =
          !adapter.is_same_month(date, display);
        CalendarDay {
          date,
          iso_date: date
            .format("%Y-%m-%d")
            .to_string(),
          formatted: adapter.format(
            date,
            DateFormat::KeyboardDate
          ),
          localized: adapter.format(
            date,
            DateFormat::DayOfMonth
          ),
          year: date.year(),
          month: date.month(),
          weekday: date.weekday(),
          is_disabled: self
            .is_disabled(date),
          is_week_start: index % row_len
            == 0,
          is_week_end: index % row_len
            == row_len - 1,
          is_today: adapter
            .is_same_day(date, today),
          is_adjacent,
          is_hidden: is_adjacent
            && !self
              .options
              .show_adjacent_months,
          is_start: adapter
            .is_same_day(date, month_start),
          is_end: adapter
            .is_same_day(date, month_end),
          is_same: adapter
            .is_same_day(date, display),
          is_selected: model.iter().any(
            |value| {
              adapter
                .is_same_day(date, *value)
            }
          )
        }
      })
      .collect();

    Ok(days)
  }

  /// Week rows for the month of `display`, seven dates each.
  pub fn weeks_in_month(
    &self,
    display: NaiveDateTime
  ) -> anyhow::Result<Vec<Vec<NaiveDateTime>>>
  {
    let mut weeks =
      self.adapter.week_array(
        display,
        self.options.first_day_of_week
      )?;

    let total: usize =
      weeks.iter().map(Vec::len).sum();
    if self.options.weeks_in_month
      == WeeksInMonth::Static
      && total < STATIC_MONTH_DAYS
      && let Some(last) = weeks
        .last()
        .and_then(|week| week.last())
        .copied()
    {
      let mut week = Vec::with_capacity(7);
      for offset in
        1..=(STATIC_MONTH_DAYS - total)
      {
        week.push(
          self
            .adapter
            .add_days(last, offset as i64)?
        );
        if offset % 7 == 0 {
          weeks.push(std::mem::take(
            &mut week
          ));
        }
      }
    }

    Ok(weeks)
  }

  pub fn days_in_month(
    &self,
    month_anchor: NaiveDateTime,
    model: &[NaiveDateTime]
  ) -> anyhow::Result<Vec<CalendarDay>> {
    let dates: Vec<NaiveDateTime> = self
      .weeks_in_month(month_anchor)?
      .into_iter()
      .flatten()
      .collect();
    let days = self.gen_days(
      &dates,
      month_anchor,
      self.adapter.date(),
      model
    )?;
    tracing::debug!(
      month = %month_anchor,
      days = days.len(),
      "generated month days"
    );
    Ok(days)
  }

  pub fn days_in_week(
    &self,
    display: NaiveDateTime,
    model: &[NaiveDateTime]
  ) -> anyhow::Result<Vec<CalendarDay>> {
    let start = self.adapter.start_of_week(
      display,
      self.options.first_day_of_week
    )?;
    let mut week = Vec::with_capacity(7);
    for offset in 0..7 {
      week.push(
        self.adapter.add_days(start, offset)?
      );
    }
    self.gen_days(
      &week,
      display,
      self.adapter.date(),
      model
    )
  }

  /// ISO week number of each week row, aligned with the chunked month rows.
  pub fn week_numbers(
    &self,
    display: NaiveDateTime
  ) -> anyhow::Result<Vec<Option<u32>>> {
    Ok(
      self
        .weeks_in_month(display)?
        .iter()
        .map(|week| {
          week.first().map(|day| {
            self.adapter.week_number(*day)
          })
        })
        .collect()
    )
  }

  pub fn is_disabled(
    &self,
    date: NaiveDateTime
  ) -> bool {
    let options = self.options;
    if options.disabled {
      return true;
    }
    if let Some(min) = options.min
      && self.adapter.is_after(
        self.adapter.start_of_day(min),
        date
      )
    {
      return true;
    }
    if let Some(max) = options.max
      && self.adapter.is_after(
        self.adapter.start_of_day(date),
        max
      )
    {
      return true;
    }

    match &options.allowed_dates {
      | AllowedDates::Any => false,
      | AllowedDates::List(dates) => {
        !dates.is_empty()
          && !dates.contains(&date.date())
      }
      | AllowedDates::Predicate(allowed) => {
        !allowed(date.date())
      }
    }
  }
}
