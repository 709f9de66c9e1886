use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_deadline;
use crate::session::{Notice, NoticeKind, TaskRow};
use crate::task::{Priority, Task};
use crate::view::DashboardCounts;

/// Width of the id prefix shown in tables; any unique prefix is accepted back.
pub const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    timezone: Tz,
}

impl Renderer {
    pub fn new(cfg: &Config, timezone: Tz) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color, timezone })
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_task_table(&self, rows: &[TaskRow<'_>]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if rows.is_empty() {
            writeln!(out, "No tasks to show.")?;
            return Ok(());
        }

        let (headers, rows) = self.task_table(rows);
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn task_table(&self, rows: &[TaskRow<'_>]) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = ["ID", "Done", "Deadline", "Priority", "Name", "Description"]
            .into_iter()
            .map(str::to_string)
            .collect();

        let rows = rows
            .iter()
            .map(|row| {
                let task = row.task;
                let deadline = task
                    .deadline
                    .map(|date| format_deadline(date, &self.timezone))
                    .unwrap_or_else(|| "N/A".to_string());
                let deadline = if row.deadline_near {
                    self.paint(&format!("{deadline} !"), "1;31")
                } else {
                    deadline
                };

                let done = if task.completed { "[x]" } else { "[ ]" };
                let name = if task.completed {
                    self.paint(&task.name, "9")
                } else {
                    task.name.clone()
                };

                vec![
                    self.paint(short_id(task), "33"),
                    done.to_string(),
                    deadline,
                    self.paint_priority(task.priority),
                    name,
                    first_line(&task.description).to_string(),
                ]
            })
            .collect();

        (headers, rows)
    }

    pub fn print_task_added(&self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Created task {} ({}).", self.paint(short_id(task), "33"), task.name)?;
        Ok(())
    }

    pub fn print_counts(&self, counts: DashboardCounts) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Total tasks      {}", self.paint(&counts.total.to_string(), "34"))?;
        writeln!(out, "Completed tasks  {}", self.paint(&counts.completed.to_string(), "32"))?;
        writeln!(out, "Pending tasks    {}", self.paint(&counts.pending.to_string(), "33"))?;
        Ok(())
    }

    pub fn print_notice(&self, notice: &Notice) -> anyhow::Result<()> {
        let mut err = io::stderr().lock();
        let label = match notice.kind {
            NoticeKind::Validation => "invalid input",
            NoticeKind::StorageRead | NoticeKind::StorageWrite => "warning",
            NoticeKind::Failure => "error",
        };
        writeln!(err, "{label}: {}", notice.message)?;
        Ok(())
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "32",
        };
        self.paint(priority.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(task: &Task) -> &str {
    match task.id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &task.id[..idx],
        None => &task.id,
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Renderer, short_id, strip_ansi, write_table};
    use crate::config::Config;
    use crate::session::TaskRow;
    use crate::task::{Priority, Task};

    fn task(id: &str, name: &str) -> Task {
        Task {
            id: id.to_string(),
            name: name.to_string(),
            description: "first\nsecond".to_string(),
            deadline: Some(Utc.with_ymd_and_hms(2026, 2, 17, 23, 59, 59).unwrap()),
            priority: Priority::High,
            completed: false,
            created_at: Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap(),
        }
    }

    #[test]
    fn table_aligns_wide_characters() {
        let mut out = Vec::new();
        write_table(
            &mut out,
            vec!["A".to_string(), "B".to_string()],
            vec![
                vec!["牛乳".to_string(), "x".to_string()],
                vec!["\x1b[31mab\x1b[0m".to_string(), "y".to_string()],
            ],
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A    B ");
        assert_eq!(lines[1], "---- - ");
        assert_eq!(lines[2], "牛乳 x ");
        assert_eq!(strip_ansi(lines[3]), "ab   y ");
    }

    #[test]
    fn rows_show_deadline_flag_and_first_description_line() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        let renderer = Renderer::new(&cfg, chrono_tz::UTC).unwrap();

        let near = task("0123456789abcdef", "Buy milk");
        let mut done = task("short", "Done");
        done.completed = true;
        let rows = [
            TaskRow { task: &near, deadline_near: true },
            TaskRow { task: &done, deadline_near: false },
        ];

        let (headers, cells) = renderer.task_table(&rows);
        assert_eq!(headers.len(), 6);
        assert_eq!(cells[0][0], "01234567");
        assert_eq!(cells[0][2], "2026-02-17 23:59 !");
        assert_eq!(cells[0][3], "High");
        assert_eq!(cells[0][5], "first");
        assert_eq!(cells[1][1], "[x]");
        assert_eq!(cells[1][2], "2026-02-17 23:59");
        assert_eq!(short_id(&done), "short");
    }

    #[test]
    fn rejects_unknown_color_setting() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "sometimes".to_string())]);
        assert!(Renderer::new(&cfg, chrono_tz::UTC).is_err());
    }
}
