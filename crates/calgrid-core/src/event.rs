use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDateTime;
use serde::{
  Deserialize,
  Serialize
};
use serde_json::{
  Map,
  Value
};
use uuid::Uuid;

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
pub struct CalendarEvent {
  #[serde(default = "Uuid::new_v4")]
  pub id: Uuid,

  #[serde(default)]
  pub title: String,

  #[serde(with = "calendar_date_serde")]
  pub start: NaiveDateTime,

  #[serde(with = "calendar_date_serde")]
  pub end: NaiveDateTime,

  #[serde(default, rename = "allDay")]
  pub all_day: bool,

  #[serde(default)]
  pub color: Option<String>,

  /// Caller fields the calendar carries through without reading.
  #[serde(default, flatten)]
  pub extra: Map<String, Value>
}

impl CalendarEvent {
  pub fn new(
    title: impl Into<String>,
    start: NaiveDateTime,
    end: NaiveDateTime
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      title: title.into(),
      start,
      end,
      all_day: false,
      color: None,
      extra: Map::new()
    }
  }

  #[must_use]
  pub fn all_day(mut self) -> Self {
    self.all_day = true;
    self
  }
}

/// An event as seen from one interval.
///
/// `first` and `last` describe whether the event's span starts or ends
/// inside that interval; they belong to the interval, not the event.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IntervalEvent<'a> {
  pub event: &'a CalendarEvent,
  pub first: bool,
  pub last:  bool
}

#[tracing::instrument]
pub fn load_events(
  path: &Path
) -> anyhow::Result<Vec<CalendarEvent>> {
  let raw = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read events file {}",
        path.display()
      )
    })?;
  let events: Vec<CalendarEvent> =
    serde_json::from_str(&raw)
      .with_context(|| {
        format!(
          "failed to parse events file \
           {}",
          path.display()
        )
      })?;
  tracing::info!(
    file = %path.display(),
    count = events.len(),
    "loaded calendar events"
  );
  Ok(events)
}

pub mod calendar_date_serde {
  use chrono::NaiveDateTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    dt: &NaiveDateTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDateTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    crate::adapter::parse_date_time(&raw)
      .map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn deserializes_minimal_event_with_extras() {
    let raw = r#"{
      "title": "standup",
      "start": "2026-02-17T09:00",
      "end": "2026-02-17 09:15",
      "room": "B2"
    }"#;
    let event: CalendarEvent =
      serde_json::from_str(raw)
        .expect("parse event");

    assert_eq!(event.title, "standup");
    assert!(!event.all_day);
    assert_eq!(
      event.start,
      NaiveDate::from_ymd_opt(2026, 2, 17)
        .expect("valid date")
        .and_hms_opt(9, 0, 0)
        .expect("valid time")
    );
    assert_eq!(
      event.extra.get("room"),
      Some(&Value::String("B2".to_string()))
    );
  }

  #[test]
  fn load_events_reads_json_array() {
    let mut file = tempfile::NamedTempFile::new()
      .expect("temp file");
    write!(
      file,
      r#"[{{"title":"holiday","start":"2026-02-16","end":"2026-02-16","allDay":true}}]"#
    )
    .expect("write events");

    let events = load_events(file.path())
      .expect("load events");
    assert_eq!(events.len(), 1);
    assert!(events[0].all_day);
  }

  #[test]
  fn load_events_reports_bad_json() {
    let mut file = tempfile::NamedTempFile::new()
      .expect("temp file");
    write!(file, "not json")
      .expect("write events");

    let err = load_events(file.path())
      .expect_err("invalid json");
    assert!(
      format!("{err:#}")
        .contains("failed to parse events file")
    );
  }
}
