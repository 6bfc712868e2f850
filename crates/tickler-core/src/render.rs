use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_project_datetime;
use crate::stats::Stats;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&mut self, tasks: &[&Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Category".to_string(),
            "Done".to_string(),
            "Text".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = short_id(task);
            let id = self.paint(&id, "33");

            let due = format_project_datetime(task.due_at);
            let due = if task.due_at <= now && !task.done {
                self.paint(&due, "31")
            } else {
                due
            };

            let done = if task.done { "x" } else { "" }.to_string();

            rows.push(vec![
                id,
                due,
                task.category.label().to_string(),
                done,
                task.text.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, stats: &Stats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "total      {}", stats.total)?;
        writeln!(
            out,
            "progress   {} / {} ({}%)",
            stats.completed,
            stats.total,
            stats.completion_percent()
        )?;
        writeln!(out, "incomplete {}", stats.incomplete)?;

        for bucket in &stats.per_category {
            writeln!(
                out,
                "{:<11}{} total, {} completed",
                bucket.category.label().to_ascii_lowercase(),
                bucket.total,
                bucket.completed
            )?;
        }

        writeln!(out, "today      {}", stats.due_today)?;
        writeln!(out, "tomorrow   {}", stats.due_tomorrow)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// First uuid group; enough to disambiguate interactively.
pub fn short_id(task: &Task) -> String {
    task.id.to_string().chars().take(8).collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

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
