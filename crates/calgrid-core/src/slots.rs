//! Override points for calendar rendering.
//!
//! Each extension point is a trait taking its own context record and
//! returning an [`Element`]. [`CalendarSlots`] starts out with the built-in
//! renderers; replace any of them to customise that part of the tree.
//! Closures with the matching signature implement the traits directly.

use chrono::Timelike;

use crate::adapter::{
  DateAdapter,
  DateFormat
};
use crate::composer::{
  CalendarAction,
  ViewMode
};
use crate::event::{
  CalendarEvent,
  IntervalEvent
};
use crate::generator::CalendarDay;
use crate::interval::{
  CalendarInterval,
  IntervalOptions,
  interval_label
};
use crate::view::Element;

pub struct HeaderContext<'c> {
  pub title:     &'c str,
  pub view_mode: ViewMode
}

/// A month grid cell.
pub struct DayContext<'c> {
  pub day:    &'c CalendarDay,
  pub title:  &'c str,
  pub events: &'c [&'c CalendarEvent]
}

pub struct MonthDayTitleContext<'c> {
  pub day:   &'c CalendarDay,
  pub title: &'c str
}

pub struct MonthDayEventContext<'c> {
  pub day:     &'c CalendarDay,
  pub event:   &'c CalendarEvent,
  pub all_day: bool
}

/// Extra content appended below a month cell's events.
pub struct MonthDayBodyContext<'c> {
  pub day:    &'c CalendarDay,
  pub events: &'c [&'c CalendarEvent]
}

/// A day column in the week or day view.
pub struct IntervalDayContext<'c> {
  pub adapter:         &'c dyn DateAdapter,
  pub day:             &'c CalendarDay,
  pub day_index:       usize,
  pub show_label:      bool,
  pub hide_day_header: bool,
  pub events:          &'c [&'c CalendarEvent],
  pub intervals:       &'c [CalendarInterval<'c>],
  pub options:         &'c IntervalOptions
}

pub struct IntervalEventContext<'c> {
  pub event:     &'c IntervalEvent<'c>,
  pub day:       &'c CalendarDay,
  pub interval:  &'c CalendarInterval<'c>,
  pub divisions: u32,
  pub duration:  u32,
  pub height:    u32
}

pub struct IntervalBodyContext<'c> {
  pub day:      &'c CalendarDay,
  pub interval: &'c CalendarInterval<'c>,
  pub options:  &'c IntervalOptions
}

pub struct IntervalFormatContext<'c> {
  pub interval: &'c CalendarInterval<'c>,
  pub index:    u32,
  /// Label produced by the configured interval format.
  pub label:    &'c str
}

pub trait HeaderSlot {
  fn render(&self, ctx: &HeaderContext<'_>) -> Element;
}

pub trait DaySlot {
  fn render(
    &self,
    ctx: &DayContext<'_>,
    slots: &CalendarSlots
  ) -> Element;
}

pub trait MonthDayTitleSlot {
  fn render(
    &self,
    ctx: &MonthDayTitleContext<'_>
  ) -> Element;
}

pub trait MonthDayEventSlot {
  fn render(
    &self,
    ctx: &MonthDayEventContext<'_>
  ) -> Element;
}

/// `None` leaves the cell without a body.
pub trait MonthDayBodySlot {
  fn render(
    &self,
    ctx: &MonthDayBodyContext<'_>
  ) -> Option<Element>;
}

pub trait IntervalDaySlot {
  fn render(
    &self,
    ctx: &IntervalDayContext<'_>,
    slots: &CalendarSlots
  ) -> Element;
}

pub trait IntervalEventSlot {
  fn render(
    &self,
    ctx: &IntervalEventContext<'_>
  ) -> Element;
}

pub trait IntervalBodySlot {
  fn render(
    &self,
    ctx: &IntervalBodyContext<'_>,
    slots: &CalendarSlots
  ) -> Element;
}

pub trait IntervalFormatSlot {
  fn render(
    &self,
    ctx: &IntervalFormatContext<'_>
  ) -> Element;
}

impl<F> HeaderSlot for F
where
  F: Fn(&HeaderContext<'_>) -> Element
{
  fn render(&self, ctx: &HeaderContext<'_>) -> Element {
    self(ctx)
  }
}

impl<F> DaySlot for F
where
  F: Fn(&DayContext<'_>, &CalendarSlots) -> Element
{
  fn render(
    &self,
    ctx: &DayContext<'_>,
    slots: &CalendarSlots
  ) -> Element {
    self(ctx, slots)
  }
}

impl<F> MonthDayTitleSlot for F
where
  F: Fn(&MonthDayTitleContext<'_>) -> Element
{
  fn render(
    &self,
    ctx: &MonthDayTitleContext<'_>
  ) -> Element {
    self(ctx)
  }
}

impl<F> MonthDayEventSlot for F
where
  F: Fn(&MonthDayEventContext<'_>) -> Element
{
  fn render(
    &self,
    ctx: &MonthDayEventContext<'_>
  ) -> Element {
    self(ctx)
  }
}

impl<F> MonthDayBodySlot for F
where
  F: Fn(&MonthDayBodyContext<'_>) -> Option<Element>
{
  fn render(
    &self,
    ctx: &MonthDayBodyContext<'_>
  ) -> Option<Element> {
    self(ctx)
  }
}

impl<F> IntervalDaySlot for F
where
  F: Fn(
    &IntervalDayContext<'_>,
    &CalendarSlots
  ) -> Element
{
  fn render(
    &self,
    ctx: &IntervalDayContext<'_>,
    slots: &CalendarSlots
  ) -> Element {
    self(ctx, slots)
  }
}

impl<F> IntervalEventSlot for F
where
  F: Fn(&IntervalEventContext<'_>) -> Element
{
  fn render(
    &self,
    ctx: &IntervalEventContext<'_>
  ) -> Element {
    self(ctx)
  }
}

impl<F> IntervalBodySlot for F
where
  F: Fn(
    &IntervalBodyContext<'_>,
    &CalendarSlots
  ) -> Element
{
  fn render(
    &self,
    ctx: &IntervalBodyContext<'_>,
    slots: &CalendarSlots
  ) -> Element {
    self(ctx, slots)
  }
}

impl<F> IntervalFormatSlot for F
where
  F: Fn(&IntervalFormatContext<'_>) -> Element
{
  fn render(
    &self,
    ctx: &IntervalFormatContext<'_>
  ) -> Element {
    self(ctx)
  }
}

pub struct CalendarSlots {
  pub header:          Box<dyn HeaderSlot>,
  pub day:             Box<dyn DaySlot>,
  pub month_day_title: Box<dyn MonthDayTitleSlot>,
  pub month_day_event: Box<dyn MonthDayEventSlot>,
  pub month_day_body:  Box<dyn MonthDayBodySlot>,
  pub interval_day:    Box<dyn IntervalDaySlot>,
  pub interval_event:  Box<dyn IntervalEventSlot>,
  pub interval_body:   Box<dyn IntervalBodySlot>,
  pub interval_format: Box<dyn IntervalFormatSlot>
}

impl Default for CalendarSlots {
  fn default() -> Self {
    Self {
      header:          Box::new(DefaultHeader),
      day:             Box::new(DefaultMonthDay),
      month_day_title: Box::new(
        DefaultMonthDayTitle
      ),
      month_day_event: Box::new(
        DefaultMonthDayEvent
      ),
      month_day_body:  Box::new(NoMonthDayBody),
      interval_day:    Box::new(DefaultIntervalDay),
      interval_event:  Box::new(
        DefaultIntervalEvent
      ),
      interval_body:   Box::new(DefaultIntervalBody),
      interval_format: Box::new(
        DefaultIntervalFormat
      )
    }
  }
}

impl CalendarSlots {
  #[must_use]
  pub fn with_header(
    mut self,
    slot: impl HeaderSlot + 'static
  ) -> Self {
    self.header = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_day(
    mut self,
    slot: impl DaySlot + 'static
  ) -> Self {
    self.day = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_month_day_title(
    mut self,
    slot: impl MonthDayTitleSlot + 'static
  ) -> Self {
    self.month_day_title = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_month_day_event(
    mut self,
    slot: impl MonthDayEventSlot + 'static
  ) -> Self {
    self.month_day_event = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_month_day_body(
    mut self,
    slot: impl MonthDayBodySlot + 'static
  ) -> Self {
    self.month_day_body = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_interval_day(
    mut self,
    slot: impl IntervalDaySlot + 'static
  ) -> Self {
    self.interval_day = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_interval_event(
    mut self,
    slot: impl IntervalEventSlot + 'static
  ) -> Self {
    self.interval_event = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_interval_body(
    mut self,
    slot: impl IntervalBodySlot + 'static
  ) -> Self {
    self.interval_body = Box::new(slot);
    self
  }

  #[must_use]
  pub fn with_interval_format(
    mut self,
    slot: impl IntervalFormatSlot + 'static
  ) -> Self {
    self.interval_format = Box::new(slot);
    self
  }
}

/// Title with previous, next and today controls.
pub struct DefaultHeader;

impl HeaderSlot for DefaultHeader {
  fn render(&self, ctx: &HeaderContext<'_>) -> Element {
    Element::div()
      .key("calendar-header")
      .class("calendar-header")
      .child(
        Element::button()
          .class("calendar-header__today")
          .action(CalendarAction::Today)
          .text("Today")
      )
      .child(
        Element::button()
          .class("calendar-header__prev")
          .action(CalendarAction::Prev)
          .text("\u{2039}")
      )
      .child(
        Element::button()
          .class("calendar-header__next")
          .action(CalendarAction::Next)
          .text("\u{203a}")
      )
      .child(
        Element::div()
          .class("calendar-header__title")
          .text(ctx.title)
      )
  }
}

/// Month cell: title, then all-day and timed event rows, then the
/// optional body.
pub struct DefaultMonthDay;

impl DaySlot for DefaultMonthDay {
  fn render(
    &self,
    ctx: &DayContext<'_>,
    slots: &CalendarSlots
  ) -> Element {
    let day = ctx.day;
    let cell = Element::div()
      .key(day.iso_date.clone())
      .class("calendar-month__day")
      .class_if(
        day.is_adjacent,
        "calendar-month__day--adjacent"
      )
      .class_if(
        day.is_today,
        "calendar-month__day--today"
      )
      .class_if(
        day.is_disabled,
        "calendar-month__day--disabled"
      )
      .class_if(
        day.is_selected,
        "calendar-month__day--selected"
      );

    if day.is_hidden {
      return cell
        .class("calendar-month__day--hidden");
    }

    let events_row = |all_day: bool| {
      ctx
        .events
        .iter()
        .copied()
        .filter(|event| event.all_day == all_day)
        .map(|event| {
          slots.month_day_event.render(
            &MonthDayEventContext {
              day,
              event,
              all_day
            }
          )
        })
        .collect::<Vec<_>>()
    };

    cell
      .action(CalendarAction::Day { date: day.date })
      .child(
        Element::div()
          .key("title")
          .class("calendar-weekly__day-label")
          .child(slots.month_day_title.render(
            &MonthDayTitleContext {
              day,
              title: ctx.title
            }
          ))
      )
      .child(
        Element::div()
          .key("content")
          .class("calendar-weekly__day-content")
          .child(
            Element::div()
              .class(
                "calendar-weekly__day-alldayevents-container"
              )
              .children(events_row(true))
          )
          .child(
            Element::div()
              .class(
                "calendar-weekly__day-events-container"
              )
              .children(events_row(false))
          )
      )
      .children(slots.month_day_body.render(
        &MonthDayBodyContext {
          day,
          events: ctx.events
        }
      ))
  }
}

pub struct DefaultMonthDayTitle;

impl MonthDayTitleSlot for DefaultMonthDayTitle {
  fn render(
    &self,
    ctx: &MonthDayTitleContext<'_>
  ) -> Element {
    Element::new("span")
      .class("calendar-month__day-title")
      .text(ctx.title)
  }
}

pub struct DefaultMonthDayEvent;

impl MonthDayEventSlot for DefaultMonthDayEvent {
  fn render(
    &self,
    ctx: &MonthDayEventContext<'_>
  ) -> Element {
    let event = ctx.event;
    let chip = Element::div()
      .key(event.id.to_string())
      .class("calendar-month__event")
      .class_if(
        ctx.all_day,
        "calendar-month__event--all-day"
      )
      .text(event.title.clone());
    match &event.color {
      | Some(color) => {
        chip.style(format!("background: {color}"))
      }
      | None => chip
    }
  }
}

pub struct NoMonthDayBody;

impl MonthDayBodySlot for NoMonthDayBody {
  fn render(
    &self,
    _ctx: &MonthDayBodyContext<'_>
  ) -> Option<Element> {
    None
  }
}

/// Day column: optional day head followed by one row per interval.
pub struct DefaultIntervalDay;

impl IntervalDaySlot for DefaultIntervalDay {
  fn render(
    &self,
    ctx: &IntervalDayContext<'_>,
    slots: &CalendarSlots
  ) -> Element {
    let mut column = Element::div()
      .key(ctx.day.iso_date.clone())
      .class("calendar-day")
      .class_if(ctx.day.is_today, "calendar-day--today");

    if !ctx.hide_day_header {
      column = column.child(
        Element::div()
          .class("calendar-day__head")
          .action(CalendarAction::Day {
            date: ctx.day.date
          })
          .child(
            Element::div()
              .class("calendar-day__weekday")
              .text(ctx.adapter.format(
                ctx.day.date,
                DateFormat::WeekdayShort
              ))
          )
          .child(
            Element::div()
              .class("calendar-day__day-label")
              .text(ctx.day.localized.clone())
          )
      );
    }

    let height = ctx.options.height;
    let rows = ctx.intervals.iter().enumerate().map(
      |(index, interval)| {
        let index = index as u32;
        let content = Element::div()
          .class("calendar-day__row-content")
          .class_if(
            interval.has_through_events(),
            "calendar-day__row-content-through"
          )
          .child(slots.interval_body.render(
            &IntervalBodyContext {
              day: ctx.day,
              interval,
              options: ctx.options
            },
            slots
          ));

        if ctx.show_label {
          let label = interval_label(
            ctx.adapter,
            interval,
            index,
            ctx.options
          );
          Element::div()
            .class("calendar-day__row-with-label")
            .style(format!("height: {height}px"))
            .child(
              Element::div()
                .class("calendar-day__row-label")
                .child(slots.interval_format.render(
                  &IntervalFormatContext {
                    interval,
                    index,
                    label: &label
                  }
                ))
            )
            .child(
              Element::div()
                .class("calendar-day__row-hairline")
            )
            .child(content)
        } else {
          Element::div()
            .class("calendar-day__row-without-label")
            .style(format!("height: {height}px"))
            .child(content)
        }
      }
    );

    column.children(rows.collect::<Vec<_>>())
  }
}

pub struct DefaultIntervalBody;

impl IntervalBodySlot for DefaultIntervalBody {
  fn render(
    &self,
    ctx: &IntervalBodyContext<'_>,
    slots: &CalendarSlots
  ) -> Element {
    let interval = ctx.interval;
    Element::div()
      .class("calendar-day__interval")
      .action(CalendarAction::Interval {
        start: interval.start,
        end:   interval.end
      })
      .children(
        interval
          .events
          .iter()
          .map(|event| {
            slots.interval_event.render(
              &IntervalEventContext {
                event,
                day: ctx.day,
                interval,
                divisions: ctx.options.divisions,
                duration: ctx.options.duration,
                height: ctx.options.height
              }
            )
          })
          .collect::<Vec<_>>()
      )
  }
}

pub struct DefaultIntervalFormat;

impl IntervalFormatSlot for DefaultIntervalFormat {
  fn render(
    &self,
    ctx: &IntervalFormatContext<'_>
  ) -> Element {
    Element::new("span")
      .class("calendar-day__row-label-text")
      .text(ctx.label)
  }
}

/// Offset from the top of the row and visible height, in pixels.
pub fn event_geometry(
  interval: &CalendarInterval<'_>,
  event: &IntervalEvent<'_>,
  duration: u32,
  height: u32
) -> (u32, u32) {
  let duration = duration.max(1);
  let minute_of =
    |time: chrono::NaiveDateTime| {
      time.hour() * 60 + time.minute()
    };
  let slot_start = minute_of(interval.start);
  let slot_minutes = duration;

  let top = if event.first
    && event.event.start > interval.start
  {
    minute_of(event.event.start)
      .saturating_sub(slot_start)
  } else {
    0
  };
  let bottom = if event.last
    && event.event.end < interval.end
  {
    minute_of(event.event.end)
      .saturating_sub(slot_start)
  } else {
    slot_minutes
  };
  let visible = bottom.saturating_sub(top).max(1);

  let to_pixels = |minutes: u32| {
    let pixels = u64::from(minutes)
      * u64::from(height)
      / u64::from(duration);
    u32::try_from(pixels).unwrap_or(u32::MAX)
  };

  (to_pixels(top), to_pixels(visible))
}

/// Event chip sized to the part of the slot it covers.
pub struct DefaultIntervalEvent;

impl IntervalEventSlot for DefaultIntervalEvent {
  fn render(
    &self,
    ctx: &IntervalEventContext<'_>
  ) -> Element {
    let entry = ctx.event;
    let (top, height) = event_geometry(
      ctx.interval,
      entry,
      ctx.duration,
      ctx.height
    );
    let mut style = format!(
      "margin-top: {top}px; height: {height}px"
    );
    if let Some(color) = &entry.event.color {
      style.push_str(&format!(
        "; background: {color}"
      ));
    }

    let chip = Element::div()
      .key(entry.event.id.to_string())
      .class("calendar-interval-event")
      .class_if(
        entry.first,
        "calendar-interval-event--first"
      )
      .class_if(
        entry.last,
        "calendar-interval-event--last"
      )
      .style(style);

    if entry.first {
      chip.text(entry.event.title.clone())
    } else {
      chip
    }
  }
}
