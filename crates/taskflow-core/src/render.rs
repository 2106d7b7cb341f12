use std::io::{self, IsTerminal, Write};

use taskflow_shared::{Task, TaskInput, TaskStatus, User};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::display_local;
use crate::filter::TaskFilter;

const DESCRIPTION_COLUMN_MAX: usize = 48;
pub const DELETE_WARNING: &str =
    "Are you sure? This action cannot be undone. This will permanently delete the task.";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.get_bool("color").unwrap_or(true),
        }
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn print_task_table(&mut self, tasks: &[&Task]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Title".to_string(),
            "Description".to_string(),
            "Updated".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.id, "33");
            let status = self.paint(task.status.as_str(), status_color(task.status));
            rows.push(vec![
                id,
                status,
                task.title.clone(),
                truncate(&task.description, DESCRIPTION_COLUMN_MAX),
                display_local(&task.updated_at),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(out, "description {}", task.description)?;
        writeln!(out, "status      {}", task.status)?;
        writeln!(out, "created     {}", task.created_at)?;
        writeln!(out, "updated     {}", task.updated_at)?;

        Ok(())
    }

    pub fn print_empty(&mut self, filter: TaskFilter) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", empty_message(filter))?;
        Ok(())
    }

    pub fn print_loading(&mut self) {
        if io::stderr().is_terminal() {
            eprintln!("{}", self.paint("Loading tasks...", "2"));
        }
    }

    /// The exact values an edit is about to write.
    pub fn print_pending_changes(&mut self, changes: &TaskInput) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "Are you sure you want to update this task with the following changes?"
        )?;
        writeln!(out, "  Title:       {}", changes.title)?;
        writeln!(out, "  Description: {}", changes.description)?;
        writeln!(out, "  Status:      {}", changes.status.label())?;
        Ok(())
    }

    pub fn print_delete_warning(&mut self) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{DELETE_WARNING}")?;
        Ok(())
    }

    pub fn print_user(&mut self, user: &User) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{} (id {})", user.username, user.id)?;
        Ok(())
    }

    pub fn notify_success(&self, message: &str) {
        eprintln!("{}", self.paint(message, "32"));
    }

    pub fn notify_error(&self, message: &str) {
        eprintln!("{}", self.paint(message, "31"));
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn empty_message(filter: TaskFilter) -> String {
    match filter {
        TaskFilter::All => {
            "No tasks yet. Create your first task with `taskflow add`.".to_string()
        }
        TaskFilter::Status(status) => format!("No {} tasks found", status.label()),
    }
}

fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "33",
        TaskStatus::InProgress => "36",
        TaskStatus::Completed => "32",
    }
}

fn truncate(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
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
    use super::*;

    #[test]
    fn empty_messages_name_the_filter() {
        assert_eq!(
            empty_message(TaskFilter::Status(TaskStatus::InProgress)),
            "No in progress tasks found"
        );
        assert!(empty_message(TaskFilter::All).starts_with("No tasks yet"));
    }

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["ID".to_string(), "Title".to_string()],
            vec![
                vec!["\x1b[33m1\x1b[0m".to_string(), "naïve".to_string()],
                vec!["1700000000000".to_string(), "x".to_string()],
            ],
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID            Title ");
        assert_eq!(strip_ansi(lines[2]), "1             naïve ");
    }

    #[test]
    fn delete_warning_says_it_cannot_be_undone() {
        assert!(DELETE_WARNING.contains("This action cannot be undone."));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let text = "a".repeat(60);
        let cut = truncate(&text, 10);
        assert_eq!(UnicodeWidthStr::width(cut.as_str()), 10);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short", 10), "short");
    }
}
