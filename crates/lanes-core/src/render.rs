use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;
use uuid::Uuid;

use crate::board::{Board, BoardState};
use crate::config::Config;
use crate::datetime::{format_board_date, format_board_datetime};
use crate::stats::BoardStats;
use crate::task::{Priority, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = match cfg.color.to_ascii_lowercase().as_str() {
            "auto" | "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, state, visible, now))]
    pub fn print_board(
        &mut self,
        state: &BoardState,
        visible: &HashMap<Uuid, Task>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let board = &state.board;

        let total = board.tasks.len();
        let mut summary = format!(
            "{} columns, {} tasks",
            board.column_order.len(),
            total
        );
        if visible.len() != total {
            summary.push_str(&format!(" ({} shown)", visible.len()));
        }
        if !state.search_query.is_empty() {
            summary.push_str(&format!(", search: \"{}\"", state.search_query));
        }
        if !state.filters.is_empty() {
            summary.push_str(", filters active");
        }
        writeln!(out, "{summary}")?;
        writeln!(out)?;

        for column in board.ordered_columns() {
            let members: Vec<&Task> = column
                .task_ids
                .iter()
                .filter_map(|id| visible.get(id))
                .collect();

            let mut header = column.title.clone();
            if state.settings.show_task_count {
                if members.len() == column.task_ids.len() {
                    header.push_str(&format!(" ({})", column.task_ids.len()));
                } else {
                    header.push_str(&format!(" ({}/{})", members.len(), column.task_ids.len()));
                }
            }
            if let Some(limit) = column.limit {
                header.push_str(&format!(" [limit {limit}]"));
            }

            let code = column.color.as_deref().and_then(color_code).unwrap_or("1");
            let over_limit = column
                .limit
                .is_some_and(|limit| column.task_ids.len() > limit);
            if over_limit {
                writeln!(out, "{} {}", self.paint(&header, code), self.paint("!", "31"))?;
            } else {
                writeln!(out, "{}", self.paint(&header, code))?;
            }

            if members.is_empty() {
                writeln!(out, "  (empty)")?;
            }
            for task in members {
                writeln!(out, "  {}", self.task_line(state, task, now))?;
                if !state.settings.compact_mode && !task.description.is_empty() {
                    writeln!(out, "      {}", task.description)?;
                }
            }
            writeln!(out)?;
        }

        Ok(())
    }

    fn task_line(&self, state: &BoardState, task: &Task, now: DateTime<Utc>) -> String {
        let marker = if state.selected_tasks.contains(&task.id) {
            self.paint("*", "36")
        } else {
            " ".to_string()
        };
        let checkbox = if task.completed { "[x]" } else { "[ ]" };

        let mut parts = vec![
            format!("{marker}{}", self.paint(&task.short_id(), "33")),
            checkbox.to_string(),
            task.title.clone(),
            format!(
                "({})",
                self.paint(task.priority.label(), priority_code(task.priority))
            ),
        ];
        if let Some(due) = task.due_date {
            let text = format!("due {}", format_board_date(due));
            parts.push(if task.is_overdue(now) {
                self.paint(&text, "31")
            } else {
                text
            });
        }
        for tag in &task.tags {
            parts.push(format!("+{tag}"));
        }
        if task.archived {
            parts.push("(archived)".to_string());
        }
        parts.join(" ")
    }

    #[tracing::instrument(skip(self, rows, now))]
    pub fn print_task_table(
        &mut self,
        rows: &[(String, Task)],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Column".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];

        let mut table_rows = Vec::with_capacity(rows.len());
        for (column_title, task) in rows {
            let id = self.paint(&task.short_id(), "33");
            let pri = self.paint(task.priority.label(), priority_code(task.priority));
            let due = task.due_date.map(format_board_date).unwrap_or_default();
            let due = if task.is_overdue(now) {
                self.paint(&due, "31")
            } else {
                due
            };

            let mut title = task.title.clone();
            if task.completed {
                title.push_str(" [x]");
            }
            if task.archived {
                title.push_str(" (archived)");
            }

            let tags = task
                .tags
                .iter()
                .map(|tag| format!("+{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            table_rows.push(vec![id, column_title.clone(), pri, due, title, tags]);
        }

        write_table(&mut out, headers, table_rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task, column_title: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "column    {column_title}")?;
        writeln!(
            out,
            "status    {}{}",
            if task.completed { "done" } else { "open" },
            if task.archived { " (archived)" } else { "" }
        )?;
        writeln!(out, "priority  {}", task.priority.label())?;
        if let Some(due) = task.due_date {
            writeln!(out, "due       {}", format_board_datetime(due))?;
        }
        if let Some(assignee) = &task.assignee {
            writeln!(out, "assignee  {assignee}")?;
        }
        if !task.tags.is_empty() {
            writeln!(out, "tags      {}", task.tags.join(", "))?;
        }
        writeln!(out, "created   {}", format_board_datetime(task.created_at))?;
        writeln!(out, "updated   {}", format_board_datetime(task.updated_at))?;
        if !task.description.is_empty() {
            writeln!(out, "desc      {}", task.description)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, board))]
    pub fn print_columns(&mut self, board: &Board) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Column".to_string(),
            "Tasks".to_string(),
            "Limit".to_string(),
            "Color".to_string(),
        ];

        let mut rows = Vec::new();
        for column in board.ordered_columns() {
            let id: String = column.id.to_string().chars().take(8).collect();
            rows.push(vec![
                self.paint(&id, "33"),
                column.title.clone(),
                column.task_ids.len().to_string(),
                column
                    .limit
                    .map(|limit| limit.to_string())
                    .unwrap_or_default(),
                column.color.clone().unwrap_or_default(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, stats: &BoardStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "tasks       {}", stats.total)?;
        let overdue = stats.overdue.to_string();
        let overdue = if stats.overdue > 0 {
            self.paint(&overdue, "31")
        } else {
            overdue
        };
        writeln!(out, "overdue     {overdue}")?;
        writeln!(out, "new (7d)    {}", stats.recent)?;
        writeln!(out, "completion  {}%", stats.completion)?;

        writeln!(out)?;
        writeln!(out, "by priority")?;
        for (priority, count) in &stats.by_priority {
            let label = format!("{:<8}", priority.label());
            writeln!(out, "  {}  {count}", self.paint(&label, priority_code(*priority)))?;
        }

        writeln!(out)?;
        writeln!(out, "by column")?;
        for stat in &stats.by_column {
            writeln!(out, "  {:<16}  {} ({}%)", stat.title, stat.count, stat.percent)?;
        }

        Ok(())
    }

    pub fn print_onboarding_hint(&mut self) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "Welcome to lanes. Add a task with `lanes add \"To Do\" Ship the demo`,"
        )?;
        writeln!(
            out,
            "then `lanes board` to see it. This hint is only shown once."
        )?;
        writeln!(out)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

fn color_code(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "red" => Some("31"),
        "green" => Some("32"),
        "yellow" => Some("33"),
        "blue" => Some("34"),
        "magenta" | "purple" => Some("35"),
        "cyan" => Some("36"),
        _ => None,
    }
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
