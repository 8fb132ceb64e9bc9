use std::io::Write;

use unicode_width::UnicodeWidthStr;

use crate::adapter::{DateAdapter, DateFormat};
use crate::composer::{Calendar, CalendarLayout, DayCell, DayColumn, LayoutBody, MonthRow};
use crate::interval::interval_label;

const CONTINUES: &str = "|";

#[derive(Debug, Clone)]
pub struct TextRenderer {
    color: bool,
}

impl TextRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    #[tracing::instrument(skip_all)]
    pub fn write_layout<W: Write, A: DateAdapter>(
        &self,
        mut writer: W,
        calendar: &Calendar<A>,
        layout: &CalendarLayout<'_>,
    ) -> anyhow::Result<()> {
        if !calendar.options().hide_header {
            writeln!(writer, "{}", self.paint(&layout.title, "1"))?;
            writeln!(writer)?;
        }

        match &layout.body {
            LayoutBody::Month { rows } => self.write_month(&mut writer, calendar, layout, rows),
            LayoutBody::Days { columns } => self.write_days(&mut writer, calendar, columns),
        }
    }

    fn write_month<W: Write, A: DateAdapter>(
        &self,
        writer: &mut W,
        calendar: &Calendar<A>,
        layout: &CalendarLayout<'_>,
        rows: &[MonthRow<'_>],
    ) -> anyhow::Result<()> {
        let show_week_numbers = !calendar.options().hide_week_number;

        let mut headers = Vec::with_capacity(layout.weekday_labels.len() + 1);
        if show_week_numbers {
            headers.push("Wk".to_string());
        }
        if !calendar.options().hide_day_header {
            headers.extend(layout.weekday_labels.iter().cloned());
        }

        let table_rows = rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(row.days.len() + 1);
                if show_week_numbers {
                    cells.push(
                        row.week_number
                            .map(|n| self.paint(&n.to_string(), "2"))
                            .unwrap_or_default(),
                    );
                }
                cells.extend(row.days.iter().map(|cell| self.month_cell(cell)));
                cells
            })
            .collect();

        write_table(writer, headers, table_rows)
    }

    fn month_cell(&self, cell: &DayCell<'_>) -> String {
        if cell.day.is_hidden {
            return String::new();
        }

        let mut text = cell.title.clone();
        if !cell.events.is_empty() {
            text.push_str(&format!(" ({})", cell.events.len()));
        }

        if cell.day.is_today {
            self.paint(&text, "1;33")
        } else if cell.day.is_adjacent || cell.day.is_disabled {
            self.paint(&text, "2")
        } else {
            text
        }
    }

    fn write_days<W: Write, A: DateAdapter>(
        &self,
        writer: &mut W,
        calendar: &Calendar<A>,
        columns: &[DayColumn<'_>],
    ) -> anyhow::Result<()> {
        let adapter = calendar.adapter();
        let options = &calendar.options().intervals;

        let mut headers = vec![String::new()];
        headers.extend(columns.iter().map(|column| {
            let head = format!(
                "{} {}",
                adapter.format(column.day.date, DateFormat::WeekdayShort),
                column.day.localized
            );
            if column.day.is_today {
                self.paint(&head, "1;33")
            } else {
                head
            }
        }));

        let slot_count = columns
            .iter()
            .map(|column| column.intervals.len())
            .max()
            .unwrap_or(0);

        let mut rows = Vec::with_capacity(slot_count);
        for index in 0..slot_count {
            let label = columns
                .first()
                .and_then(|column| column.intervals.get(index))
                .map(|interval| {
                    let label = interval_label(adapter, interval, index as u32, options);
                    if label.is_empty() {
                        interval.label.clone()
                    } else {
                        label
                    }
                })
                .unwrap_or_default();

            let mut cells = vec![self.paint(&label, "2")];
            cells.extend(columns.iter().map(|column| {
                column
                    .intervals
                    .get(index)
                    .map(|interval| {
                        interval
                            .events
                            .iter()
                            .map(|entry| {
                                if entry.first {
                                    entry.event.title.clone()
                                } else {
                                    CONTINUES.to_string()
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default()
            }));
            rows.push(cells);
        }

        write_table(&mut *writer, headers, rows)?;

        let all_day: Vec<String> = columns
            .iter()
            .flat_map(|column| {
                column
                    .events
                    .iter()
                    .filter(|event| event.all_day)
                    .map(move |event| format!("{} {}", column.day.iso_date, event.title))
            })
            .collect();
        if !all_day.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "All day:")?;
            for line in all_day {
                writeln!(writer, "  {line}")?;
            }
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    if !headers.is_empty() {
        write_row(&mut writer, &headers, &widths)?;
        for width in &widths {
            write!(writer, "{:-<width$} ", "", width = *width)?;
        }
        writeln!(writer)?;
    }

    for row in &rows {
        write_row(&mut writer, row, &widths)?;
    }

    Ok(())
}

fn write_row<W: Write>(writer: &mut W, cells: &[String], widths: &[usize]) -> anyhow::Result<()> {
    for (idx, width) in widths.iter().enumerate() {
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
        let padding = width.saturating_sub(visible_width);
        write!(writer, "{}{} ", cell, " ".repeat(padding))?;
    }
    writeln!(writer)?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
