// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Column-aligned tables for list output

use std::io::Write;

use crate::color::{self, Tone};

/// Coloring rule for a column's cells
#[derive(Clone, Copy)]
enum Paint {
    None,
    Fixed(Tone),
    ByStatus,
}

pub struct Column {
    title: &'static str,
    paint: Paint,
    max_width: Option<usize>,
}

impl Column {
    pub fn left(title: &'static str) -> Self {
        Self {
            title,
            paint: Paint::None,
            max_width: None,
        }
    }

    pub fn muted(title: &'static str) -> Self {
        Self {
            paint: Paint::Fixed(Tone::Muted),
            ..Self::left(title)
        }
    }

    /// Cells colored by their status word
    pub fn status(title: &'static str) -> Self {
        Self {
            paint: Paint::ByStatus,
            ..Self::left(title)
        }
    }

    /// Cut longer values to `max` characters
    pub fn with_max(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }

    fn fit<'a>(&self, value: &'a str) -> &'a str {
        let Some(max) = self.max_width else {
            return value;
        };
        match value.char_indices().nth(max) {
            Some((end, _)) => &value[..end],
            None => value,
        }
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    colorize: bool,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize: color::should_colorize(),
        }
    }

    #[cfg(test)]
    pub fn plain(columns: Vec<Column>) -> Self {
        Self {
            colorize: false,
            ..Self::new(columns)
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Write the header and rows; nothing at all for an empty table.
    ///
    /// Cells are padded before painting so escape codes never count toward
    /// a column's width. The last column is left unpadded.
    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                self.rows
                    .iter()
                    .map(|row| col.fit(cell(row, i)).chars().count())
                    .fold(col.title.len(), usize::max)
            })
            .collect();

        let header = self.line(|i, col| {
            let text = pad(col.title, widths[i], self.is_last(i));
            if self.colorize {
                color::paint(Tone::Header, &text)
            } else {
                text
            }
        });
        let _ = writeln!(out, "{}", header);

        for row in &self.rows {
            let line = self.line(|i, col| {
                let text = pad(col.fit(cell(row, i)), widths[i], self.is_last(i));
                if !self.colorize {
                    return text;
                }
                match col.paint {
                    Paint::None => text,
                    Paint::Fixed(tone) => color::paint(tone, &text),
                    Paint::ByStatus => color::paint_status(&text),
                }
            });
            let _ = writeln!(out, "{}", line);
        }
    }

    fn line(&self, render: impl Fn(usize, &Column) -> String) -> String {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| render(i, col))
            .collect::<Vec<_>>()
            .join("  ")
    }

    fn is_last(&self, index: usize) -> bool {
        index + 1 == self.columns.len()
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

fn pad(text: &str, width: usize, is_last: bool) -> String {
    if is_last {
        text.to_string()
    } else {
        format!("{:<width$}", text)
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
