pub mod adapter;
pub mod cli;
pub mod composer;
pub mod config;
pub mod event;
pub mod generator;
pub mod interval;
pub mod render;
pub mod slots;
pub mod view;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::adapter::ChronoAdapter;
use crate::cli::{
  GlobalCli,
  OutputFormat
};
use crate::composer::Calendar;
use crate::config::CalendarConfig;
use crate::render::TextRenderer;
use crate::slots::CalendarSlots;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli = GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting calgrid"
  );

  let color = io::stdout().is_terminal();
  let stdout = io::stdout().lock();
  execute(&cli, stdout, color)
}

/// Builds the calendar described by `cli` and writes it to `out`.
///
/// `color_capable` gates ANSI output in text mode on top of the
/// config's `color` flag.
#[tracing::instrument(skip_all, fields(format = ?cli.format))]
pub fn execute<W: Write>(
  cli: &GlobalCli,
  mut out: W,
  color_capable: bool
) -> anyhow::Result<()> {
  let mut cfg = CalendarConfig::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .iter()
      .map(|kv| (kv.key.clone(), kv.value.clone()))
  )?;

  let mut adapter =
    ChronoAdapter::from_timezone_id(
      cfg.timezone.as_deref()
    );
  if let Some(now) = cli.now {
    adapter = adapter.with_now(now);
  }
  debug!(timezone = %adapter.timezone(), "resolved calendar timezone");

  let events = match cli.events.as_deref() {
    | Some(path) => {
      event::load_events(path)?
    }
    | None => Vec::new()
  };

  let view_mode =
    cli.view.unwrap_or(cfg.view_mode);
  let mut calendar = Calendar::new(
    adapter,
    cfg.calendar_options()
  )
  .with_view_mode(view_mode);

  if let Some(date) = cli.date {
    calendar.set_model(vec![date]);
  }
  if cli.today {
    let notifications =
      calendar.on_click_today();
    debug!(?notifications, "jumped to today");
  }

  for _ in 0..cli.shift.unsigned_abs() {
    let notifications = if cli.shift > 0 {
      calendar.on_click_next()?
    } else {
      calendar.on_click_prev()?
    };
    debug!(?notifications, "navigated calendar");
  }

  let layout = calendar
    .layout(&events)
    .context("failed to compute calendar layout")?;
  info!(
    view = view_mode.as_key(),
    title = %layout.title,
    events = events.len(),
    "calendar layout ready"
  );

  match cli.format {
    | OutputFormat::Text => {
      TextRenderer::new(
        cfg.color && color_capable
      )
      .write_layout(&mut out, &calendar, &layout)?;
    }
    | OutputFormat::Html => {
      let tree = view::render_calendar(
        &calendar,
        &layout,
        &CalendarSlots::default()
      );
      writeln!(out, "{}", tree.to_html())?;
    }
    | OutputFormat::Json => {
      let tree = view::render_calendar(
        &calendar,
        &layout,
        &CalendarSlots::default()
      );
      let json =
        serde_json::to_string_pretty(&tree)
          .context(
            "failed to serialize calendar \
             tree"
          )?;
      writeln!(out, "{json}")?;
    }
  }

  Ok(())
}
