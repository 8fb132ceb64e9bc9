use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::adapter::DateFormat;
use crate::composer::{
  CalendarOptions,
  ViewMode
};
use crate::generator::{
  GeneratorOptions,
  WeeksInMonth,
  all_weekdays
};
use crate::interval::{
  IntervalFormat,
  IntervalOptions,
  MINUTES_PER_DAY
};

const CONFIG_ENV_VAR: &str =
  "CALGRID_CONFIG";
const CONFIG_DIR_NAME: &str = "calgrid";
const CONFIG_FILE_NAME: &str =
  "calgrid.toml";

fn default_true() -> bool {
  true
}

fn default_version() -> u32 {
  1
}

fn default_first_day_of_week() -> String {
  "sunday".to_string()
}

fn default_interval_format() -> String {
  DateFormat::Hours12h.as_key().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
  pub divisions: u32,
  pub duration:  u32,
  pub height:    u32,
  pub format:    String,
  pub start:     u32,
  pub count:     u32
}

impl Default for IntervalConfig {
  fn default() -> Self {
    let defaults = IntervalOptions::default();
    Self {
      divisions: defaults.divisions,
      duration:  defaults.duration,
      height:    defaults.height,
      format:    default_interval_format(),
      start:     defaults.start,
      count:     defaults.count
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
  #[serde(default = "default_version")]
  pub version:              u32,
  #[serde(default)]
  pub timezone:             Option<String>,
  #[serde(default)]
  pub view_mode:            ViewMode,
  #[serde(default = "default_true")]
  pub color:                bool,
  #[serde(default)]
  pub hide_header:          bool,
  #[serde(default)]
  pub hide_week_number:     bool,
  #[serde(default)]
  pub hide_day_header:      bool,
  #[serde(
    default = "default_first_day_of_week"
  )]
  pub first_day_of_week:    String,
  /// Shown weekdays; empty means all seven.
  #[serde(default)]
  pub weekdays:             Vec<String>,
  #[serde(default)]
  pub weeks_in_month:       WeeksInMonth,
  #[serde(default = "default_true")]
  pub show_adjacent_months: bool,
  #[serde(default)]
  pub interval:             IntervalConfig,
  #[serde(skip)]
  pub loaded_file:          Option<PathBuf>
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      version:              default_version(),
      timezone:             None,
      view_mode:            ViewMode::default(),
      color:                true,
      hide_header:          false,
      hide_week_number:     false,
      hide_day_header:      false,
      first_day_of_week:
        default_first_day_of_week(),
      weekdays:             Vec::new(),
      weeks_in_month:
        WeeksInMonth::default(),
      show_adjacent_months: true,
      interval:
        IntervalConfig::default(),
      loaded_file:          None
    }
  }
}

impl CalendarConfig {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(config_override)
    else {
      warn!(
        "no calendar config found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading calendar config");
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let mut cfg = Self::from_toml_str(&text)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    cfg.loaded_file = Some(path);
    Ok(cfg)
  }

  pub fn from_toml_str(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Self = toml::from_str(text)?;
    cfg.sanitize();
    info!(
      version = cfg.version,
      view = cfg.view_mode.as_key(),
      timezone = ?cfg.timezone,
      "loaded calendar config"
    );
    Ok(cfg)
  }

  /// Applies `key=value` overrides; an `rc.` prefix is accepted.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .trim()
        .to_string();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");

      match key.as_str() {
        | "timezone" => {
          self.timezone =
            Some(value.to_string());
        }
        | "view_mode" => {
          self.view_mode =
            ViewMode::from_key(value)
              .ok_or_else(|| {
                anyhow!(
                  "invalid view mode: \
                   {value}"
                )
              })?;
        }
        | "color" => {
          self.color = parse_bool(value)
        }
        | "hide_header" => {
          self.hide_header =
            parse_bool(value)
        }
        | "hide_week_number" => {
          self.hide_week_number =
            parse_bool(value)
        }
        | "hide_day_header" => {
          self.hide_day_header =
            parse_bool(value)
        }
        | "first_day_of_week" => {
          self.first_day_of_week =
            value.to_string();
        }
        | "weekdays" => {
          self.weekdays = value
            .split(',')
            .map(|day| day.trim().to_string())
            .filter(|day| !day.is_empty())
            .collect();
        }
        | "weeks_in_month" => {
          self.weeks_in_month =
            match value {
              | "static" => {
                WeeksInMonth::Static
              }
              | "dynamic" => {
                WeeksInMonth::Dynamic
              }
              | other => {
                return Err(anyhow!(
                  "invalid weeks_in_month: \
                   {other}"
                ));
              }
            };
        }
        | "show_adjacent_months" => {
          self.show_adjacent_months =
            parse_bool(value)
        }
        | "interval.divisions" => {
          self.interval.divisions =
            parse_u32(&key, value)?
        }
        | "interval.duration" => {
          self.interval.duration =
            parse_u32(&key, value)?
        }
        | "interval.height" => {
          self.interval.height =
            parse_u32(&key, value)?
        }
        | "interval.format" => {
          self.interval.format =
            value.to_string();
        }
        | "interval.start" => {
          self.interval.start =
            parse_u32(&key, value)?
        }
        | "interval.count" => {
          self.interval.count =
            parse_u32(&key, value)?
        }
        | other => {
          warn!(key = %other, "ignoring unknown config override");
        }
      }
    }

    self.sanitize();
    Ok(())
  }

  fn sanitize(&mut self) {
    if parse_weekday(&self.first_day_of_week)
      .is_none()
    {
      warn!(
        value = %self.first_day_of_week,
        "invalid first_day_of_week; using sunday"
      );
      self.first_day_of_week =
        default_first_day_of_week();
    }

    let before = self.weekdays.len();
    self.weekdays.retain(|day| {
      parse_weekday(day).is_some()
    });
    if self.weekdays.len() != before {
      warn!(
        dropped = before - self.weekdays.len(),
        "ignoring unknown weekday names"
      );
    }

    let interval = &mut self.interval;
    if interval.duration == 0
      || interval.duration > MINUTES_PER_DAY
    {
      warn!(
        duration = interval.duration,
        "interval duration out of range; using 60"
      );
      interval.duration = 60;
    }
    let per_day =
      MINUTES_PER_DAY / interval.duration;
    if interval.start >= per_day {
      warn!(
        start = interval.start,
        "interval start past end of day; using 0"
      );
      interval.start = 0;
    }
    let remaining = per_day - interval.start;
    if interval.count == 0 {
      interval.count = remaining;
    } else if interval.count > remaining {
      warn!(
        count = interval.count,
        remaining,
        "interval count runs past end of day; clamping"
      );
      interval.count = remaining;
    }
    if interval.divisions == 0 {
      interval.divisions = 1;
    }
    if interval.height == 0 {
      interval.height =
        IntervalOptions::default().height;
    }
    if DateFormat::from_key(&interval.format)
      .is_none()
    {
      warn!(
        format = %interval.format,
        "unknown interval format; using hours12h"
      );
      interval.format =
        default_interval_format();
    }
  }

  pub fn first_day_of_week(&self) -> Weekday {
    parse_weekday(&self.first_day_of_week)
      .unwrap_or(Weekday::Sun)
  }

  /// Shown weekdays in display order, starting at the first day of week.
  pub fn weekdays(&self) -> Vec<Weekday> {
    let order =
      all_weekdays(self.first_day_of_week());
    if self.weekdays.is_empty() {
      return order;
    }

    let wanted: Vec<Weekday> = self
      .weekdays
      .iter()
      .filter_map(|day| parse_weekday(day))
      .collect();
    order
      .into_iter()
      .filter(|day| wanted.contains(day))
      .collect()
  }

  pub fn calendar_options(
    &self
  ) -> CalendarOptions {
    let format = DateFormat::from_key(
      &self.interval.format
    )
    .unwrap_or(DateFormat::Hours12h);

    CalendarOptions {
      hide_header:      self.hide_header,
      hide_week_number: self
        .hide_week_number,
      hide_day_header:  self.hide_day_header,
      generator:        GeneratorOptions {
        weekdays: self.weekdays(),
        first_day_of_week: self
          .first_day_of_week(),
        weeks_in_month: self.weeks_in_month,
        show_adjacent_months: self
          .show_adjacent_months,
        ..GeneratorOptions::default()
      },
      intervals:        IntervalOptions {
        divisions: self.interval.divisions,
        duration:  self.interval.duration,
        height:    self.interval.height,
        format:    IntervalFormat::Named(
          format
        ),
        start:     self.interval.start,
        count:     self.interval.count
      }
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(trimmed));
    }
  }

  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  candidate.exists().then_some(candidate)
}

pub fn parse_weekday(
  raw: &str
) -> Option<Weekday> {
  raw.trim().parse::<Weekday>().ok()
}

fn parse_u32(
  key: &str,
  value: &str
) -> anyhow::Result<u32> {
  value.parse::<u32>().map_err(|err| {
    anyhow!(
      "invalid value for {key}: {value} \
       ({err})"
    )
  })
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use chrono::Weekday;

  use super::*;

  #[test]
  fn missing_fields_take_defaults() {
    let cfg = CalendarConfig::from_toml_str(
      "view_mode = \"week\"\n"
    )
    .expect("parse config");

    assert_eq!(cfg.view_mode, ViewMode::Week);
    assert!(cfg.color);
    assert_eq!(cfg.interval.duration, 60);
    assert_eq!(cfg.interval.count, 24);
    assert_eq!(cfg.weekdays().len(), 7);
    assert_eq!(
      cfg.first_day_of_week(),
      Weekday::Sun
    );
  }

  #[test]
  fn sanitize_repairs_bad_values() {
    let cfg = CalendarConfig::from_toml_str(
      r#"
first_day_of_week = "someday"
weekdays = ["mon", "funday", "fri"]

[interval]
duration = 0
count = 0
start = 40
format = "nonsense"
"#
    )
    .expect("parse config");

    assert_eq!(cfg.first_day_of_week, "sunday");
    assert_eq!(
      cfg.weekdays(),
      vec![Weekday::Mon, Weekday::Fri]
    );
    assert_eq!(cfg.interval.duration, 60);
    assert_eq!(cfg.interval.start, 0);
    assert_eq!(cfg.interval.count, 24);
    assert_eq!(cfg.interval.format, "hours12h");
  }

  #[test]
  fn interval_count_stops_at_end_of_day() {
    let cfg = CalendarConfig::from_toml_str(
      r#"
[interval]
duration = 30
start = 40
count = 4000000000
"#
    )
    .expect("parse config");
    assert_eq!(cfg.interval.count, 8);

    let mut cfg = CalendarConfig::default();
    cfg
      .apply_overrides(vec![(
        "interval.count".to_string(),
        "100".to_string()
      )])
      .expect("apply overrides");
    assert_eq!(cfg.interval.count, 24);
  }

  #[test]
  fn overrides_update_and_validate() {
    let mut cfg = CalendarConfig::default();
    cfg
      .apply_overrides(vec![
        (
          "rc.view_mode".to_string(),
          "day".to_string()
        ),
        (
          "interval.duration".to_string(),
          "30".to_string()
        ),
        (
          "interval.count".to_string(),
          "0".to_string()
        ),
        (
          "hide_header".to_string(),
          "yes".to_string()
        ),
        (
          "weekdays".to_string(),
          "sat, sun".to_string()
        ),
      ])
      .expect("apply overrides");

    assert_eq!(cfg.view_mode, ViewMode::Day);
    assert_eq!(cfg.interval.count, 48);
    assert!(cfg.hide_header);
    assert_eq!(
      cfg.weekdays(),
      vec![Weekday::Sun, Weekday::Sat]
    );

    let err = cfg
      .apply_overrides(vec![(
        "interval.height".to_string(),
        "tall".to_string()
      )])
      .expect_err("non-numeric height");
    assert!(
      err.to_string().contains("interval.height")
    );
  }

  #[test]
  fn calendar_options_follow_config() {
    let cfg = CalendarConfig::from_toml_str(
      r#"
first_day_of_week = "monday"
hide_week_number = true
weeks_in_month = "static"

[interval]
duration = 15
start = 32
count = 40
format = "fullTime24h"
"#
    )
    .expect("parse config");
    let options = cfg.calendar_options();

    assert!(options.hide_week_number);
    assert_eq!(
      options.generator.first_day_of_week,
      Weekday::Mon
    );
    assert_eq!(
      options.generator.weekdays[0],
      Weekday::Mon
    );
    assert_eq!(
      options.generator.weeks_in_month,
      WeeksInMonth::Static
    );
    assert_eq!(options.intervals.duration, 15);
    assert_eq!(options.intervals.start, 32);
    assert!(matches!(
      options.intervals.format,
      IntervalFormat::Named(
        DateFormat::FullTime24h
      )
    ));
  }

  #[test]
  fn load_reads_explicit_path() {
    let mut file = tempfile::NamedTempFile::new()
      .expect("temp file");
    writeln!(file, "timezone = \"Europe/Berlin\"")
      .expect("write config");

    let cfg = CalendarConfig::load(Some(file.path()))
      .expect("load config");
    assert_eq!(
      cfg.timezone.as_deref(),
      Some("Europe/Berlin")
    );
    assert_eq!(
      cfg.loaded_file.as_deref(),
      Some(file.path())
    );
  }

  #[test]
  fn load_reports_parse_errors_with_path() {
    let mut file = tempfile::NamedTempFile::new()
      .expect("temp file");
    writeln!(file, "view_mode = \"year\"")
      .expect("write config");

    let err = CalendarConfig::load(Some(file.path()))
      .expect_err("invalid view mode");
    assert!(
      format!("{err:#}").contains("failed to parse")
    );
  }
}
