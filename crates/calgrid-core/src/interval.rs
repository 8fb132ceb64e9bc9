//! Fixed-size time slots within a day and the events that overlap them.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::adapter::{
  DateAdapter,
  DateFormat
};
use crate::event::{
  CalendarEvent,
  IntervalEvent
};
use crate::generator::CalendarDay;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// How a row label is produced for intervals after the first.
pub enum IntervalFormat {
  Named(DateFormat),
  Custom(
    Box<dyn Fn(&CalendarInterval<'_>) -> String>
  )
}

impl Default for IntervalFormat {
  fn default() -> Self {
    Self::Named(DateFormat::Hours12h)
  }
}

impl fmt::Debug for IntervalFormat {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::Named(format) => {
        f.debug_tuple("Named")
          .field(format)
          .finish()
      }
      | Self::Custom(_) => {
        f.write_str("Custom(..)")
      }
    }
  }
}

#[derive(Debug)]
pub struct IntervalOptions {
  /// Visual sub-divisions per slot.
  pub divisions: u32,
  /// Minutes per slot.
  pub duration:  u32,
  /// Row height in pixels.
  pub height:    u32,
  pub format:    IntervalFormat,
  /// Offset, in slots, applied before index 0.
  pub start:     u32,
  /// Slots rendered per day.
  pub count:     u32
}

impl Default for IntervalOptions {
  fn default() -> Self {
    Self {
      divisions: 2,
      duration:  60,
      height:    48,
      format:    IntervalFormat::default(),
      start:     0,
      count:     24
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarInterval<'a> {
  /// Start time in 24-hour form.
  pub label:  String,
  pub start:  NaiveDateTime,
  pub end:    NaiveDateTime,
  pub events: Vec<IntervalEvent<'a>>
}

impl CalendarInterval<'_> {
  /// True when at least one event continues past this slot.
  pub fn has_through_events(&self) -> bool {
    self.events.iter().any(|entry| !entry.last)
  }
}

/// Four-way overlap test used inside intervals.
///
/// Matches when the event starts at or inside the slot, when the slot
/// start falls inside the event, or when both end at the same minute. An
/// event spanning several slots matches each of them.
pub fn event_overlaps_interval<A>(
  adapter: &A,
  event: &CalendarEvent,
  start: NaiveDateTime,
  end: NaiveDateTime
) -> bool
where
  A: DateAdapter + ?Sized
{
  adapter.is_equal(start, event.start)
    || adapter
      .is_within_range(event.start, (start, end))
    || adapter.is_within_range(
      start,
      (event.start, event.end)
    )
    || adapter.is_equal(end, event.end)
}

fn starts_in_interval<A>(
  adapter: &A,
  event: &CalendarEvent,
  start: NaiveDateTime,
  end: NaiveDateTime
) -> bool
where
  A: DateAdapter + ?Sized
{
  adapter.is_equal(start, event.start)
    || adapter
      .is_within_range(event.start, (start, end))
}

fn ends_in_interval<A>(
  adapter: &A,
  event: &CalendarEvent,
  start: NaiveDateTime,
  end: NaiveDateTime
) -> bool
where
  A: DateAdapter + ?Sized
{
  adapter.is_equal(end, event.end)
    || adapter
      .is_within_range(event.end, (start, end))
}

/// Computes slot `index` of `day`.
///
/// The slot spans `duration * (index + start)` minutes after the start of
/// the day up to one minute before the following slot begins. All-day
/// events never land in a slot.
pub fn compute_interval<'a, A, I>(
  adapter: &A,
  day: &CalendarDay,
  index: u32,
  options: &IntervalOptions,
  events: I
) -> anyhow::Result<CalendarInterval<'a>>
where
  A: DateAdapter + ?Sized,
  I: IntoIterator<Item = &'a CalendarEvent>
{
  let day_start =
    adapter.start_of_day(day.date);
  let offset = i64::from(options.duration)
    * (i64::from(index)
      + i64::from(options.start));
  let start =
    adapter.add_minutes(day_start, offset)?;
  let end = adapter.add_minutes(
    day_start,
    offset + i64::from(options.duration) - 1
  )?;

  let events = events
    .into_iter()
    .filter(|event| {
      !event.all_day
        && event_overlaps_interval(
          adapter, event, start, end
        )
    })
    .map(|event| IntervalEvent {
      event,
      first: starts_in_interval(
        adapter, event, start, end
      ),
      last: ends_in_interval(
        adapter, event, start, end
      )
    })
    .collect::<Vec<_>>();

  tracing::trace!(
    day = %day.iso_date,
    index,
    start = %start,
    end = %end,
    events = events.len(),
    "computed interval"
  );

  Ok(CalendarInterval {
    label: adapter
      .format(start, DateFormat::FullTime24h),
    start,
    end,
    events
  })
}

/// All `options.count` slots of `day`, in order.
pub fn day_intervals<'a, A, I>(
  adapter: &A,
  day: &CalendarDay,
  options: &IntervalOptions,
  events: I
) -> anyhow::Result<Vec<CalendarInterval<'a>>>
where
  A: DateAdapter + ?Sized,
  I: IntoIterator<Item = &'a CalendarEvent>
    + Clone
{
  (0..options.count)
    .map(|index| {
      compute_interval(
        adapter,
        day,
        index,
        options,
        events.clone()
      )
    })
    .collect()
}

/// Row label for slot `index`. The first row carries no label.
pub fn interval_label<A>(
  adapter: &A,
  interval: &CalendarInterval<'_>,
  index: u32,
  options: &IntervalOptions
) -> String
where
  A: DateAdapter + ?Sized
{
  if index == 0 {
    return String::new();
  }

  match &options.format {
    | IntervalFormat::Named(format) => {
      adapter.format(interval.start, *format)
    }
    | IntervalFormat::Custom(format) => {
      format(interval)
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveDateTime
  };

  use super::*;
  use crate::adapter::ChronoAdapter;
  use crate::generator::{
    DayGenerator,
    GeneratorOptions
  };

  fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, 17)
      .expect("valid date")
      .and_hms_opt(h, m, 0)
      .expect("valid time")
  }

  fn sample_day(
    adapter: &ChronoAdapter
  ) -> CalendarDay {
    let options = GeneratorOptions::default();
    DayGenerator::new(adapter, &options)
      .gen_days(
        &[at(0, 0)],
        at(0, 0),
        at(0, 0),
        &[]
      )
      .expect("gen day")
      .remove(0)
  }

  #[test]
  fn slot_bounds_follow_duration_and_offset() {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    let options = IntervalOptions {
      start: 9,
      ..IntervalOptions::default()
    };

    let interval = compute_interval(
      &adapter, &day, 2, &options, &[]
    )
    .expect("interval");
    assert_eq!(interval.start, at(11, 0));
    assert_eq!(interval.end, at(11, 59));
    assert_eq!(interval.label, "11:00");
  }

  #[test]
  fn consecutive_slots_are_one_minute_apart() {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    for duration in [15, 30, 45, 60, 90] {
      let options = IntervalOptions {
        duration,
        count: MINUTES_PER_DAY / duration,
        ..IntervalOptions::default()
      };
      let intervals = day_intervals(
        &adapter, &day, &options, &[]
      )
      .expect("intervals");

      for pair in intervals.windows(2) {
        assert_eq!(
          adapter
            .add_minutes(pair[0].end, 1)
            .expect("add minute"),
          pair[1].start
        );
      }
    }
  }

  #[test]
  fn event_starting_inside_slot_is_first_not_last()
  {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    let options = IntervalOptions {
      start: 9,
      ..IntervalOptions::default()
    };
    let events = vec![CalendarEvent::new(
      "review",
      at(11, 30),
      at(12, 15)
    )];

    let interval = compute_interval(
      &adapter, &day, 2, &options, &events
    )
    .expect("interval");
    assert_eq!(interval.events.len(), 1);
    assert!(interval.events[0].first);
    assert!(!interval.events[0].last);
    assert!(interval.has_through_events());

    let next = compute_interval(
      &adapter, &day, 3, &options, &events
    )
    .expect("next interval");
    assert_eq!(next.events.len(), 1);
    assert!(!next.events[0].first);
    assert!(next.events[0].last);
    assert!(!next.has_through_events());
  }

  #[test]
  fn spanning_event_is_neither_first_nor_last() {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    let events = vec![CalendarEvent::new(
      "offsite",
      at(8, 0),
      at(17, 0)
    )];

    let interval = compute_interval(
      &adapter,
      &day,
      12,
      &IntervalOptions::default(),
      &events
    )
    .expect("interval");
    assert_eq!(interval.events.len(), 1);
    assert!(!interval.events[0].first);
    assert!(!interval.events[0].last);
    assert!(!events[0].extra.contains_key("first"));
  }

  #[test]
  fn all_day_events_never_land_in_slots() {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    let events = vec![
      CalendarEvent::new(
        "holiday",
        at(0, 0),
        at(23, 59)
      )
      .all_day(),
    ];

    let intervals = day_intervals(
      &adapter,
      &day,
      &IntervalOptions::default(),
      &events
    )
    .expect("intervals");
    assert!(
      intervals
        .iter()
        .all(|interval| interval.events.is_empty())
    );
  }

  #[test]
  fn event_ending_at_slot_start_is_excluded() {
    let adapter = ChronoAdapter::default();
    let event =
      CalendarEvent::new("sync", at(10, 0), at(11, 0));
    assert!(!event_overlaps_interval(
      &adapter,
      &event,
      at(11, 0),
      at(11, 59)
    ));
    assert!(event_overlaps_interval(
      &adapter,
      &event,
      at(10, 0),
      at(10, 59)
    ));
  }

  #[test]
  fn instant_event_at_slot_end_is_last_only() {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    let events = vec![CalendarEvent::new(
      "alarm",
      at(10, 59),
      at(10, 59)
    )];

    assert!(event_overlaps_interval(
      &adapter,
      &events[0],
      at(10, 0),
      at(10, 59)
    ));
    let interval = compute_interval(
      &adapter,
      &day,
      10,
      &IntervalOptions::default(),
      &events
    )
    .expect("interval");
    assert_eq!(interval.end, at(10, 59));
    assert_eq!(interval.events.len(), 1);
    assert!(!interval.events[0].first);
    assert!(interval.events[0].last);
    assert!(!interval.has_through_events());
  }

  #[test]
  fn event_ending_at_slot_end_closes_in_that_slot() {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    let events = vec![CalendarEvent::new(
      "focus",
      at(10, 30),
      at(10, 59)
    )];

    let intervals = day_intervals(
      &adapter,
      &day,
      &IntervalOptions::default(),
      &events
    )
    .expect("intervals");
    let slot = &intervals[10];
    assert_eq!(slot.events.len(), 1);
    assert!(slot.events[0].first);
    assert!(slot.events[0].last);
    assert!(intervals[11].events.is_empty());
  }

  #[test]
  fn labels_skip_first_row_and_honor_format() {
    let adapter = ChronoAdapter::default();
    let day = sample_day(&adapter);
    let mut options = IntervalOptions::default();
    let first = compute_interval(
      &adapter, &day, 0, &options, &[]
    )
    .expect("first");
    let afternoon = compute_interval(
      &adapter, &day, 13, &options, &[]
    )
    .expect("afternoon");

    assert_eq!(
      interval_label(&adapter, &first, 0, &options),
      ""
    );
    assert_eq!(
      interval_label(
        &adapter, &afternoon, 13, &options
      ),
      "1 PM"
    );

    options.format = IntervalFormat::Custom(
      Box::new(
        |interval: &CalendarInterval<'_>| {
          format!("@{}", interval.label)
        }
      )
    );
    assert_eq!(
      interval_label(
        &adapter, &afternoon, 13, &options
      ),
      "@13:00"
    );
  }
}
