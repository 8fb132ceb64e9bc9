//! Render tree produced by the calendar and its slots.

use std::fmt::Write as _;

use serde::Serialize;

use crate::adapter::DateAdapter;
use crate::composer::{
  Calendar,
  CalendarAction,
  CalendarLayout,
  LayoutBody,
  ViewMode
};
use crate::slots::{
  CalendarSlots,
  DayContext,
  HeaderContext,
  IntervalDayContext
};

#[derive(
  Debug, Clone, PartialEq, Eq, Default, Serialize,
)]
pub struct Element {
  pub tag:      String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub key:      Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub classes:  Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub style:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub text:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub action:   Option<CalendarAction>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<Element>
}

impl Element {
  pub fn new(tag: impl Into<String>) -> Self {
    Self {
      tag: tag.into(),
      ..Self::default()
    }
  }

  pub fn div() -> Self {
    Self::new("div")
  }

  pub fn button() -> Self {
    Self::new("button")
  }

  #[must_use]
  pub fn class(
    mut self,
    class: impl Into<String>
  ) -> Self {
    let class = class.into();
    if !class.is_empty() {
      self.classes.push(class);
    }
    self
  }

  #[must_use]
  pub fn class_if(
    self,
    enabled: bool,
    class: impl Into<String>
  ) -> Self {
    if enabled { self.class(class) } else { self }
  }

  #[must_use]
  pub fn key(
    mut self,
    key: impl Into<String>
  ) -> Self {
    self.key = Some(key.into());
    self
  }

  #[must_use]
  pub fn style(
    mut self,
    style: impl Into<String>
  ) -> Self {
    self.style = Some(style.into());
    self
  }

  #[must_use]
  pub fn text(
    mut self,
    text: impl Into<String>
  ) -> Self {
    self.text = Some(text.into());
    self
  }

  #[must_use]
  pub fn action(
    mut self,
    action: CalendarAction
  ) -> Self {
    self.action = Some(action);
    self
  }

  #[must_use]
  pub fn child(mut self, child: Element) -> Self {
    self.children.push(child);
    self
  }

  #[must_use]
  pub fn children<I>(mut self, children: I) -> Self
  where
    I: IntoIterator<Item = Element>
  {
    self.children.extend(children);
    self
  }

  pub fn has_class(&self, class: &str) -> bool {
    self.classes.iter().any(|c| c == class)
  }

  /// Depth-first search for elements carrying `class`.
  pub fn find_all<'s>(
    &'s self,
    class: &str
  ) -> Vec<&'s Element> {
    let mut found = Vec::new();
    self.collect_class(class, &mut found);
    found
  }

  fn collect_class<'s>(
    &'s self,
    class: &str,
    found: &mut Vec<&'s Element>
  ) {
    if self.has_class(class) {
      found.push(self);
    }
    for child in &self.children {
      child.collect_class(class, found);
    }
  }

  /// Concatenated text of this element and its descendants.
  pub fn text_content(&self) -> String {
    let mut out =
      self.text.clone().unwrap_or_default();
    for child in &self.children {
      out.push_str(&child.text_content());
    }
    out
  }

  pub fn to_html(&self) -> String {
    let mut out = String::new();
    self.write_html(&mut out);
    out
  }

  fn write_html(&self, out: &mut String) {
    let _ = write!(out, "<{}", self.tag);
    if !self.classes.is_empty() {
      let _ = write!(
        out,
        " class=\"{}\"",
        escape_html(&self.classes.join(" "))
      );
    }
    if let Some(style) = &self.style {
      let _ = write!(
        out,
        " style=\"{}\"",
        escape_html(style)
      );
    }
    if let Some(key) = &self.key {
      let _ = write!(
        out,
        " data-key=\"{}\"",
        escape_html(key)
      );
    }
    if let Some(action) = self.action {
      let _ = write!(
        out,
        " data-action=\"{}\"",
        action.as_key()
      );
    }
    out.push('>');
    if let Some(text) = &self.text {
      out.push_str(&escape_html(text));
    }
    for child in &self.children {
      child.write_html(out);
    }
    let _ = write!(out, "</{}>", self.tag);
  }
}

fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for ch in raw.chars() {
    match ch {
      | '&' => out.push_str("&amp;"),
      | '<' => out.push_str("&lt;"),
      | '>' => out.push_str("&gt;"),
      | '"' => out.push_str("&quot;"),
      | '\'' => out.push_str("&#39;"),
      | other => out.push(other)
    }
  }
  out
}

fn view_class(view: ViewMode) -> &'static str {
  match view {
    | ViewMode::Month => "calendar-monthly",
    | ViewMode::Week => "calendar-weekly",
    | ViewMode::Day => "calendar-daily"
  }
}

/// Builds the full element tree for `layout`, delegating cells to `slots`.
#[tracing::instrument(skip_all, fields(view = layout.view_mode.as_key()))]
pub fn render_calendar<A: DateAdapter>(
  calendar: &Calendar<A>,
  layout: &CalendarLayout<'_>,
  slots: &CalendarSlots
) -> Element {
  let options = calendar.options();
  let row_len = layout.weekday_labels.len();
  let show_week_numbers = !options.hide_week_number;

  let mut header = Element::div();
  if !options.hide_header {
    header = header.child(slots.header.render(
      &HeaderContext {
        title:     &layout.title,
        view_mode: layout.view_mode
      }
    ));
  }

  let mut container = Element::div()
    .class("calendar__container")
    .class(format!("days__{row_len}"));

  match &layout.body {
    | LayoutBody::Month { rows } => {
      if !options.hide_day_header {
        let suffix = if show_week_numbers {
          "-with-weeknumber"
        } else {
          ""
        };
        let head = Element::div()
          .key("calendar-weekly-head")
          .class("calendar-weekly__head")
          .class(format!("days__{row_len}"))
          .class_if(
            show_week_numbers,
            "calendar-weekly__head-weeknumbers"
          )
          .children(show_week_numbers.then(|| {
            Element::div()
              .key("week-number-0")
              .class(
                "calendar-weekly__head-weeknumber"
              )
          }))
          .children(
            layout.weekday_labels.iter().map(
              |label| {
                Element::div()
                  .class(format!(
                    "calendar-weekly__head-weekday{suffix}"
                  ))
                  .text(label.clone())
              }
            )
          );
        container = container.child(head);
      }

      let days_class = if show_week_numbers {
        format!("days-with-weeknumbers__{row_len}")
      } else {
        format!("days__{row_len}")
      };
      let mut month = Element::div()
        .key("calendar-month")
        .class("calendar-month__days")
        .class(days_class)
        .class_if(
          show_week_numbers,
          "calendar-month__weeknumbers"
        );

      for row in rows {
        if show_week_numbers {
          month = month.child(
            Element::div()
              .class("calendar-month__weeknumber")
              .text(
                row
                  .week_number
                  .map(|n| n.to_string())
                  .unwrap_or_default()
              )
          );
        }
        for cell in &row.days {
          month = month.child(slots.day.render(
            &DayContext {
              day:    &cell.day,
              title:  &cell.title,
              events: &cell.events
            },
            slots
          ));
        }
      }
      container = container.child(month);
    }
    | LayoutBody::Days { columns } => {
      for column in columns {
        container = container.child(
          slots.interval_day.render(
            &IntervalDayContext {
              adapter:         calendar.adapter(),
              day:             &column.day,
              day_index:       column.day_index,
              show_label:      column.show_label,
              hide_day_header: options
                .hide_day_header,
              events:          &column.events,
              intervals:       &column.intervals,
              options:         &options.intervals
            },
            slots
          )
        );
      }
    }
  }

  Element::div()
    .class("calendar")
    .class(view_class(layout.view_mode))
    .child(header)
    .child(container)
}
