//! Calendar state, navigation and grid layout.

use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{
  Deserialize,
  Serialize
};

use crate::adapter::{
  DateAdapter,
  DateFormat
};
use crate::event::CalendarEvent;
use crate::generator::{
  AllowedDates,
  CalendarDay,
  DayGenerator,
  GeneratorOptions
};
use crate::interval::{
  CalendarInterval,
  IntervalOptions,
  day_intervals
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  clap::ValueEnum
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  #[default]
  Month,
  Week,
  Day
}

impl ViewMode {
  pub fn all() -> [Self; 3] {
    [Self::Month, Self::Week, Self::Day]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week",
      | Self::Day => "day"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Month => "Month",
      | Self::Week => "Week",
      | Self::Day => "Day"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key.trim() {
      | "month" => Some(Self::Month),
      | "week" => Some(Self::Week),
      | "day" => Some(Self::Day),
      | _ => None
    }
  }
}

/// User intent attached to a rendered control.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize,
)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CalendarAction {
  Next,
  Prev,
  Today,
  Day {
    date: NaiveDateTime
  },
  Interval {
    start: NaiveDateTime,
    end:   NaiveDateTime
  }
}

impl CalendarAction {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Next => "next",
      | Self::Prev => "prev",
      | Self::Today => "today",
      | Self::Day { .. } => "day",
      | Self::Interval { .. } => "interval"
    }
  }
}

/// Notifications emitted back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarNotification {
  Next,
  Prev,
  ModelValueUpdated(Vec<NaiveDateTime>),
  DayClicked(NaiveDateTime),
  IntervalClicked {
    start: NaiveDateTime,
    end:   NaiveDateTime
  }
}

#[derive(Debug, Default)]
pub struct CalendarOptions {
  pub hide_header:      bool,
  pub hide_week_number: bool,
  pub hide_day_header:  bool,
  pub generator:        GeneratorOptions,
  pub intervals:        IntervalOptions
}

#[derive(Debug, Clone)]
pub struct DayCell<'e> {
  pub day:    CalendarDay,
  pub title:  String,
  pub events: Vec<&'e CalendarEvent>
}

#[derive(Debug, Clone)]
pub struct MonthRow<'e> {
  pub week_number: Option<u32>,
  pub days:        Vec<DayCell<'e>>
}

#[derive(Debug, Clone)]
pub struct DayColumn<'e> {
  pub day:        CalendarDay,
  pub day_index:  usize,
  pub show_label: bool,
  pub events:     Vec<&'e CalendarEvent>,
  pub intervals:  Vec<CalendarInterval<'e>>
}

#[derive(Debug, Clone)]
pub enum LayoutBody<'e> {
  Month { rows: Vec<MonthRow<'e>> },
  Days { columns: Vec<DayColumn<'e>> }
}

#[derive(Debug, Clone)]
pub struct CalendarLayout<'e> {
  pub view_mode:      ViewMode,
  pub title:          String,
  pub weekday_labels: Vec<String>,
  pub body:           LayoutBody<'e>
}

/// Whole-day bucketing: the event starts or ends on `day`.
///
/// Coarser than [`crate::interval::event_overlaps_interval`]; an event
/// spanning `day` without starting or ending on it is not included.
pub fn event_touches_day<A>(
  adapter: &A,
  day: NaiveDateTime,
  event: &CalendarEvent
) -> bool
where
  A: DateAdapter + ?Sized
{
  adapter.is_same_day(day, event.start)
    || adapter.is_same_day(day, event.end)
}

/// Splits `items` into rows of `size`; the last row may be shorter.
pub fn chunk_days<T: Clone>(
  items: &[T],
  size: usize
) -> Vec<Vec<T>> {
  items
    .chunks(size.max(1))
    .map(<[T]>::to_vec)
    .collect()
}

pub struct Calendar<A: DateAdapter> {
  adapter:       A,
  view_mode:     ViewMode,
  model:         Vec<NaiveDateTime>,
  display_value: Option<NaiveDateTime>,
  options:       CalendarOptions
}

impl<A: DateAdapter> Calendar<A> {
  pub fn new(
    adapter: A,
    options: CalendarOptions
  ) -> Self {
    Self {
      adapter,
      view_mode: ViewMode::default(),
      model: Vec::new(),
      display_value: None,
      options
    }
  }

  #[must_use]
  pub fn with_view_mode(
    mut self,
    view_mode: ViewMode
  ) -> Self {
    self.view_mode = view_mode;
    self
  }

  #[must_use]
  pub fn with_model(
    mut self,
    model: Vec<NaiveDateTime>
  ) -> Self {
    self.model = model;
    self
  }

  pub fn adapter(&self) -> &A {
    &self.adapter
  }

  pub fn options(&self) -> &CalendarOptions {
    &self.options
  }

  pub fn view_mode(&self) -> ViewMode {
    self.view_mode
  }

  pub fn set_view_mode(
    &mut self,
    view_mode: ViewMode
  ) {
    if self.view_mode != view_mode {
      tracing::debug!(
        from = self.view_mode.as_key(),
        to = view_mode.as_key(),
        "calendar view mode changed"
      );
    }
    self.view_mode = view_mode;
  }

  pub fn model(&self) -> &[NaiveDateTime] {
    &self.model
  }

  pub fn set_model(
    &mut self,
    model: Vec<NaiveDateTime>
  ) {
    self.model = model;
  }

  /// Pins the displayed date independently of the model.
  pub fn set_display_value(
    &mut self,
    display_value: Option<NaiveDateTime>
  ) {
    self.display_value = display_value;
  }

  pub fn display_value(&self) -> NaiveDateTime {
    if let Some(display) = self.display_value {
      return display;
    }
    if let Some(first) = self.model.first() {
      return *first;
    }
    if let Some(min) = self.options.generator.min
    {
      return min;
    }
    if let AllowedDates::List(dates) =
      &self.options.generator.allowed_dates
      && let Some(first) = dates.first()
    {
      return first.and_time(
        chrono::NaiveTime::MIN
      );
    }
    self.adapter.date()
  }

  pub fn generator(
    &self
  ) -> DayGenerator<'_, A> {
    DayGenerator::new(
      &self.adapter,
      &self.options.generator
    )
  }

  pub fn title(&self) -> String {
    self.adapter.format(
      self.display_value(),
      DateFormat::MonthAndYear
    )
  }

  pub fn weekday_labels(&self) -> Vec<String> {
    self
      .options
      .generator
      .weekdays
      .iter()
      .map(|weekday| {
        self.adapter.weekday_name(*weekday)
      })
      .collect()
  }

  fn shift(
    &self,
    step: i32
  ) -> anyhow::Result<NaiveDateTime> {
    let current = self.display_value();
    match self.view_mode {
      | ViewMode::Month => {
        self.adapter.add_months(current, step)
      }
      | ViewMode::Week => {
        self.adapter.add_days(
          current,
          i64::from(step) * 7
        )
      }
      | ViewMode::Day => {
        self
          .adapter
          .add_days(current, i64::from(step))
      }
    }
  }

  fn replace_model(
    &mut self,
    date: NaiveDateTime
  ) -> CalendarNotification {
    self.model = vec![date];
    tracing::debug!(
      view = self.view_mode.as_key(),
      date = %date,
      "calendar model updated"
    );
    CalendarNotification::ModelValueUpdated(
      self.model.clone()
    )
  }

  /// Moves forward one month, week or day depending on the view mode.
  pub fn on_click_next(
    &mut self
  ) -> anyhow::Result<Vec<CalendarNotification>>
  {
    let next = self.shift(1)?;
    let update = self.replace_model(next);
    Ok(vec![CalendarNotification::Next, update])
  }

  pub fn on_click_prev(
    &mut self
  ) -> anyhow::Result<Vec<CalendarNotification>>
  {
    let prev = self.shift(-1)?;
    let update = self.replace_model(prev);
    Ok(vec![CalendarNotification::Prev, update])
  }

  pub fn on_click_today(
    &mut self
  ) -> Vec<CalendarNotification> {
    let today = self.adapter.date();
    vec![self.replace_model(today)]
  }

  pub fn dispatch(
    &mut self,
    action: CalendarAction
  ) -> anyhow::Result<Vec<CalendarNotification>>
  {
    tracing::trace!(
      action = action.as_key(),
      "dispatching calendar action"
    );
    match action {
      | CalendarAction::Next => {
        self.on_click_next()
      }
      | CalendarAction::Prev => {
        self.on_click_prev()
      }
      | CalendarAction::Today => {
        Ok(self.on_click_today())
      }
      | CalendarAction::Day { date } => {
        Ok(vec![
          CalendarNotification::DayClicked(
            date
          ),
        ])
      }
      | CalendarAction::Interval {
        start,
        end
      } => {
        Ok(vec![
          CalendarNotification::IntervalClicked {
            start,
            end
          },
        ])
      }
    }
  }

  /// Computes the grid for the current view mode and reference date.
  #[tracing::instrument(skip_all, fields(view = self.view_mode.as_key()))]
  pub fn layout<'e>(
    &self,
    events: &'e [CalendarEvent]
  ) -> anyhow::Result<CalendarLayout<'e>> {
    let body = match self.view_mode {
      | ViewMode::Month => {
        self.month_body(events)?
      }
      | ViewMode::Week => {
        let days = self
          .generator()
          .days_in_week(
            self.display_value(),
            &self.model
          )?;
        self.days_body(days, events)?
      }
      | ViewMode::Day => {
        let display = self.display_value();
        let day = self
          .generator()
          .gen_days(
            &[display],
            display,
            self.adapter.date(),
            &self.model
          )?
          .into_iter()
          .next()
          .ok_or_else(|| {
            anyhow!(
              "reference date {display} \
               falls on a hidden weekday"
            )
          })?;
        self.days_body(vec![day], events)?
      }
    };

    Ok(CalendarLayout {
      view_mode: self.view_mode,
      title: self.title(),
      weekday_labels: self.weekday_labels(),
      body
    })
  }

  fn day_events<'e>(
    &self,
    day: &CalendarDay,
    events: &'e [CalendarEvent]
  ) -> Vec<&'e CalendarEvent> {
    events
      .iter()
      .filter(|event| {
        event_touches_day(
          &self.adapter,
          day.date,
          event
        )
      })
      .collect()
  }

  fn month_body<'e>(
    &self,
    events: &'e [CalendarEvent]
  ) -> anyhow::Result<LayoutBody<'e>> {
    let row_len =
      self.options.generator.weekdays.len();
    if row_len == 0 {
      return Err(anyhow!(
        "no weekdays configured for the \
         month grid"
      ));
    }

    let display = self.display_value();
    let generator = self.generator();
    let days = generator
      .days_in_month(display, &self.model)?;
    let chunks = chunk_days(&days, row_len);

    let week_numbers =
      if self.options.hide_week_number {
        vec![None; chunks.len()]
      } else {
        let numbers =
          generator.week_numbers(display)?;
        if numbers.len() != chunks.len() {
          return Err(anyhow!(
            "week numbers ({}) do not align \
             with month rows ({})",
            numbers.len(),
            chunks.len()
          ));
        }
        numbers
      };

    let rows = chunks
      .into_iter()
      .zip(week_numbers)
      .map(|(week, week_number)| MonthRow {
        week_number,
        days: week
          .into_iter()
          .map(|day| DayCell {
            title: self.adapter.format(
              day.date,
              DateFormat::DayOfMonth
            ),
            events: self
              .day_events(&day, events),
            day
          })
          .collect()
      })
      .collect::<Vec<_>>();

    tracing::debug!(
      rows = rows.len(),
      row_len,
      "laid out month grid"
    );
    Ok(LayoutBody::Month { rows })
  }

  fn days_body<'e>(
    &self,
    days: Vec<CalendarDay>,
    events: &'e [CalendarEvent]
  ) -> anyhow::Result<LayoutBody<'e>> {
    let columns = days
      .into_iter()
      .enumerate()
      .map(
        |(day_index, day)| -> anyhow::Result<
          DayColumn<'e>
        > {
        let day_events =
          self.day_events(&day, events);
        let intervals = day_intervals(
          &self.adapter,
          &day,
          &self.options.intervals,
          day_events.iter().copied()
        )?;
        Ok(DayColumn {
          day,
          day_index,
          show_label: day_index == 0,
          events: day_events,
          intervals
        })
      }
      )
      .collect::<anyhow::Result<Vec<_>>>()?;

    tracing::debug!(
      columns = columns.len(),
      intervals = self.options.intervals.count,
      "laid out day columns"
    );
    Ok(LayoutBody::Days { columns })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime,
    Weekday
  };

  use super::*;
  use crate::adapter::ChronoAdapter;
  use crate::generator::all_weekdays;

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

  fn calendar(
    view: ViewMode
  ) -> Calendar<ChronoAdapter> {
    let adapter = ChronoAdapter::default()
      .with_now(at(2026, 2, 17, 8, 0));
    Calendar::new(
      adapter,
      CalendarOptions::default()
    )
    .with_view_mode(view)
    .with_model(vec![at(2026, 2, 17, 0, 0)])
  }

  #[test]
  fn next_then_prev_restores_reference() {
    for view in ViewMode::all() {
      let mut cal = calendar(view);
      let original = cal.display_value();
      cal.on_click_next().expect("next");
      cal.on_click_prev().expect("prev");
      assert_eq!(cal.display_value(), original);
    }
  }

  #[test]
  fn month_round_trip_clamps_late_days() {
    let mut cal = calendar(ViewMode::Month)
      .with_model(vec![at(2026, 1, 31, 0, 0)]);
    cal.on_click_next().expect("next");
    assert_eq!(
      cal.model(),
      &[at(2026, 2, 28, 0, 0)]
    );
    cal.on_click_prev().expect("prev");
    assert_eq!(
      cal.model(),
      &[at(2026, 1, 28, 0, 0)]
    );

    let mut week = calendar(ViewMode::Week)
      .with_model(vec![at(2026, 1, 31, 0, 0)]);
    week.on_click_next().expect("next");
    week.on_click_prev().expect("prev");
    assert_eq!(
      week.model(),
      &[at(2026, 1, 31, 0, 0)]
    );
  }

  #[test]
  fn next_steps_by_view_mode() {
    let mut month = calendar(ViewMode::Month);
    let notes =
      month.on_click_next().expect("next");
    assert_eq!(
      month.model(),
      &[at(2026, 3, 17, 0, 0)]
    );
    assert_eq!(
      notes,
      vec![
        CalendarNotification::Next,
        CalendarNotification::ModelValueUpdated(
          vec![at(2026, 3, 17, 0, 0)]
        ),
      ]
    );

    let mut week = calendar(ViewMode::Week);
    week.on_click_prev().expect("prev");
    assert_eq!(
      week.model(),
      &[at(2026, 2, 10, 0, 0)]
    );

    let mut day = calendar(ViewMode::Day);
    day.on_click_next().expect("next");
    assert_eq!(
      day.model(),
      &[at(2026, 2, 18, 0, 0)]
    );
  }

  #[test]
  fn today_discards_prior_reference() {
    let mut cal = calendar(ViewMode::Month)
      .with_model(vec![
        at(2020, 1, 1, 0, 0),
        at(2020, 1, 2, 0, 0),
      ]);
    let notes = cal.on_click_today();
    assert_eq!(
      cal.model(),
      &[at(2026, 2, 17, 8, 0)]
    );
    assert_eq!(notes.len(), 1);
  }

  #[test]
  fn display_value_falls_back_to_adapter_now() {
    let cal = calendar(ViewMode::Month)
      .with_model(Vec::new());
    assert_eq!(
      cal.display_value(),
      at(2026, 2, 17, 8, 0)
    );
    assert_eq!(cal.title(), "February 2026");
  }

  #[test]
  fn chunking_35_days_gives_five_rows() {
    let days: Vec<u32> = (0..35).collect();
    let rows = chunk_days(&days, 7);
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|row| row.len() == 7));

    let partial = chunk_days(&days, 6);
    assert_eq!(partial.len(), 6);
    assert_eq!(partial[5].len(), 5);
  }

  #[test]
  fn month_layout_aligns_week_numbers() {
    let cal = calendar(ViewMode::Month);
    let layout = cal.layout(&[]).expect("layout");
    let LayoutBody::Month { rows } = layout.body
    else {
      panic!("expected month body");
    };

    // February 2026 fills exactly four Sunday-first weeks.
    assert_eq!(rows.len(), 4);
    let numbers: Vec<Option<u32>> = rows
      .iter()
      .map(|row| row.week_number)
      .collect();
    assert_eq!(
      numbers,
      vec![Some(5), Some(6), Some(7), Some(8)]
    );
    assert_eq!(rows[0].days[0].title, "1");
  }

  #[test]
  fn month_layout_with_five_day_weeks() {
    let mut options = CalendarOptions::default();
    options.generator.first_day_of_week =
      Weekday::Mon;
    options.generator.weekdays =
      all_weekdays(Weekday::Mon)
        .into_iter()
        .take(5)
        .collect();
    let cal = Calendar::new(
      ChronoAdapter::default()
        .with_now(at(2026, 2, 17, 8, 0)),
      options
    )
    .with_model(vec![at(2026, 3, 4, 0, 0)]);

    let layout = cal.layout(&[]).expect("layout");
    let LayoutBody::Month { rows } = layout.body
    else {
      panic!("expected month body");
    };
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|row| row.days.len() == 5));
    assert_eq!(
      layout.weekday_labels,
      vec!["Mon", "Tue", "Wed", "Thu", "Fri"]
    );
  }

  #[test]
  fn week_layout_uses_coarse_day_filter() {
    let cal = calendar(ViewMode::Week);
    let events = vec![
      CalendarEvent::new(
        "standup",
        at(2026, 2, 17, 9, 0),
        at(2026, 2, 17, 9, 15)
      ),
      CalendarEvent::new(
        "conference",
        at(2026, 2, 16, 9, 0),
        at(2026, 2, 18, 17, 0)
      ),
    ];

    let layout =
      cal.layout(&events).expect("layout");
    let LayoutBody::Days { columns } = layout.body
    else {
      panic!("expected day columns");
    };
    assert_eq!(columns.len(), 7);
    assert!(columns[0].show_label);
    assert!(!columns[1].show_label);

    // Sunday-first week: Feb 15..21.
    let tuesday = &columns[2];
    assert_eq!(
      tuesday.day.date,
      at(2026, 2, 17, 0, 0)
    );
    assert_eq!(tuesday.events.len(), 1);
    assert_eq!(tuesday.events[0].title, "standup");
    assert!(
      tuesday.intervals[12].events.is_empty()
    );
    assert_eq!(tuesday.intervals[9].events.len(), 1);

    let monday = &columns[1];
    assert_eq!(monday.events.len(), 1);
    assert_eq!(
      monday.intervals[20].events.len(),
      1
    );
    assert!(!monday.intervals[20].events[0].last);
  }

  #[test]
  fn day_layout_builds_single_column() {
    let cal = calendar(ViewMode::Day);
    let layout = cal.layout(&[]).expect("layout");
    let LayoutBody::Days { columns } = layout.body
    else {
      panic!("expected day columns");
    };
    assert_eq!(columns.len(), 1);
    assert!(columns[0].show_label);
    assert_eq!(columns[0].intervals.len(), 24);
    assert!(columns[0].day.is_today);
  }

  #[test]
  fn dispatch_routes_actions() {
    let mut cal = calendar(ViewMode::Day);
    let notes = cal
      .dispatch(CalendarAction::Day {
        date: at(2026, 2, 20, 0, 0)
      })
      .expect("dispatch day");
    assert_eq!(
      notes,
      vec![CalendarNotification::DayClicked(
        at(2026, 2, 20, 0, 0)
      )]
    );
    assert_eq!(
      cal.model(),
      &[at(2026, 2, 17, 0, 0)]
    );

    cal
      .dispatch(CalendarAction::Next)
      .expect("dispatch next");
    assert_eq!(
      cal.model(),
      &[at(2026, 2, 18, 0, 0)]
    );
  }
}
