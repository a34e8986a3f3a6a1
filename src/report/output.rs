//! Rendering report rows for the terminal or for other tools.

use super::{CompletionReport, InactiveUser, LatestTodo, StatusCount, TodoCount};
use crate::error::SeedError;
use crate::model::{Todo, User};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Widest a table cell may grow before it is truncated
const MAX_CELL_WIDTH: usize = 50;

/// Output format for report rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Box-drawn table (default)
    #[default]
    Table,
    /// JSON array
    Json,
    /// One JSON object per line
    JsonLines,
    Csv,
    Tsv,
}

impl std::str::FromStr for OutputFormat {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            _ => Err(SeedError::Validation(format!(
                "unknown format: {}. Valid: table, json, jsonl, csv, tsv",
                s
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Tsv => write!(f, "tsv"),
        }
    }
}

/// A report row that can be laid out as named text cells
pub trait ReportRow: Serialize {
    const COLUMNS: &'static [&'static str];

    /// One cell per entry in `COLUMNS`, in the same order
    fn cells(&self) -> Vec<String>;
}

fn timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn optional_timestamp(value: &Option<NaiveDateTime>) -> String {
    value.as_ref().map_or_else(|| "NULL".to_string(), timestamp)
}

impl ReportRow for TodoCount {
    const COLUMNS: &'static [&'static str] = &["user_id", "name", "count"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.user_id.to_string(),
            self.name.clone(),
            self.count.to_string(),
        ]
    }
}

impl ReportRow for CompletionReport {
    const COLUMNS: &'static [&'static str] = &[
        "user_id",
        "name",
        "email",
        "completed",
        "not_completed",
        "total",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.user_id.to_string(),
            self.name.clone(),
            self.email.clone(),
            self.completed.to_string(),
            self.not_completed.to_string(),
            self.total.to_string(),
        ]
    }
}

impl ReportRow for LatestTodo {
    const COLUMNS: &'static [&'static str] =
        &["user_id", "name", "title", "created_at", "due_date"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.user_id.to_string(),
            self.name.clone(),
            self.title.clone(),
            timestamp(&self.created_at),
            optional_timestamp(&self.due_date),
        ]
    }
}

impl ReportRow for InactiveUser {
    const COLUMNS: &'static [&'static str] = &["user_id", "name", "total", "completed"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.user_id.to_string(),
            self.name.clone(),
            self.total.to_string(),
            self.completed.to_string(),
        ]
    }
}

impl ReportRow for StatusCount {
    const COLUMNS: &'static [&'static str] = &["status", "count"];

    fn cells(&self) -> Vec<String> {
        vec![self.status.to_string(), self.count.to_string()]
    }
}

impl ReportRow for User {
    const COLUMNS: &'static [&'static str] = &["id", "name", "email", "created_at"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.email.clone(),
            timestamp(&self.created_at),
        ]
    }
}

impl ReportRow for Todo {
    const COLUMNS: &'static [&'static str] =
        &["id", "title", "status", "created_at", "due_date", "user_id"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.status.to_string(),
            timestamp(&self.created_at),
            optional_timestamp(&self.due_date),
            self.user_id.to_string(),
        ]
    }
}

/// Formats collected report rows
pub struct ReportFormatter;

impl ReportFormatter {
    pub fn format<R: ReportRow>(rows: &[R], format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(rows),
            OutputFormat::Json => Self::format_json(rows),
            OutputFormat::JsonLines => Self::format_jsonl(rows),
            OutputFormat::Csv => Self::format_delimited(rows, ',', Self::csv_escape),
            OutputFormat::Tsv => Self::format_delimited(rows, '\t', Self::tsv_escape),
        }
    }

    fn format_table<R: ReportRow>(rows: &[R]) -> String {
        let cells: Vec<Vec<String>> = rows.iter().map(<R as ReportRow>::cells).collect();

        let mut widths: Vec<usize> = R::COLUMNS.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (width, val) in widths.iter_mut().zip(row) {
                *width = (*width).max(val.chars().count());
            }
        }
        widths.iter_mut().for_each(|w| *w = (*w).min(MAX_CELL_WIDTH));

        let mut output = Self::border(&widths, '┌', '┬', '┐');
        output.push_str(&Self::line(&widths, R::COLUMNS.iter().copied()));
        output.push_str(&Self::border(&widths, '├', '┼', '┤'));
        for row in &cells {
            output.push_str(&Self::line(&widths, row.iter().map(String::as_str)));
        }
        output.push_str(&Self::border(&widths, '└', '┴', '┘'));
        output.push_str(&format!(
            "{} row{}\n",
            rows.len(),
            if rows.len() == 1 { "" } else { "s" }
        ));
        output
    }

    fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}\n", left, segments.join(&mid.to_string()), right)
    }

    fn line<'a>(widths: &[usize], values: impl Iterator<Item = &'a str>) -> String {
        let mut out = String::from("│");
        for (val, width) in values.zip(widths) {
            out.push_str(&format!(
                " {:width$} │",
                Self::truncate(val, *width),
                width = *width
            ));
        }
        out.push('\n');
        out
    }

    /// Truncate to `max_len` characters, marking the cut with an ellipsis
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
            format!("{}…", kept)
        }
    }

    fn format_json<R: ReportRow>(rows: &[R]) -> String {
        let mut out = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());
        out.push('\n');
        out
    }

    fn format_jsonl<R: ReportRow>(rows: &[R]) -> String {
        rows.iter()
            .map(|row| serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string()) + "\n")
            .collect()
    }

    fn format_delimited<R: ReportRow>(rows: &[R], sep: char, escape: fn(&str) -> String) -> String {
        let sep = sep.to_string();
        let mut output = R::COLUMNS.join(&sep);
        output.push('\n');
        for row in rows {
            let escaped: Vec<String> = row.cells().iter().map(|v| escape(v)).collect();
            output.push_str(&escaped.join(&sep));
            output.push('\n');
        }
        output
    }

    fn csv_escape(val: &str) -> String {
        if val.contains(',') || val.contains('"') || val.contains('\n') || val.contains('\r') {
            format!("\"{}\"", val.replace('"', "\"\""))
        } else {
            val.to_string()
        }
    }

    fn tsv_escape(val: &str) -> String {
        val.replace('\t', "\\t").replace('\n', "\\n")
    }
}
