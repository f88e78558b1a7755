// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal colors for CLI output

use std::io::IsTerminal;

/// Semantic color of a piece of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Labels and table headers (256-color steel blue)
    Header,
    /// Secondary detail (256-color dark grey)
    Muted,
    Good,
    Pending,
    Bad,
}

impl Tone {
    fn escape(self) -> &'static str {
        match self {
            Tone::Header => "\x1b[38;5;74m",
            Tone::Muted => "\x1b[38;5;240m",
            Tone::Good => "\x1b[32m",
            Tone::Pending => "\x1b[33m",
            Tone::Bad => "\x1b[31m",
        }
    }

    /// Tone for a phase or state word; `None` leaves it uncolored.
    ///
    /// Only the first word counts, so "failed: reason" reads as failed.
    pub fn of_status(text: &str) -> Option<Tone> {
        let word = text
            .trim_start()
            .split(|c: char| !c.is_alphabetic())
            .next()
            .unwrap_or("")
            .to_lowercase();
        match word.as_str() {
            "running" | "connected" | "ready" | "started" | "yes" => Some(Tone::Good),
            "starting" | "stopping" | "stopped" | "waiting" | "opening" | "closing" | "no" => {
                Some(Tone::Pending)
            }
            "failed" | "failing" | "error" | "closed" => Some(Tone::Bad),
            _ => None,
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Color is on unless `NO_COLOR=1`; `COLOR=1` forces it without a TTY.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    crate::env::force_color() || std::io::stdout().is_terminal()
}

/// Wrap `text` in `tone` unconditionally.
pub fn paint(tone: Tone, text: &str) -> String {
    format!("{}{}{}", tone.escape(), text, RESET)
}

/// Paint a status word when it has a tone.
pub fn paint_status(text: &str) -> String {
    match Tone::of_status(text) {
        Some(tone) => paint(tone, text),
        None => text.to_string(),
    }
}

fn paint_if_enabled(tone: Tone, text: &str) -> String {
    if should_colorize() {
        paint(tone, text)
    } else {
        text.to_string()
    }
}

pub fn header(text: &str) -> String {
    paint_if_enabled(Tone::Header, text)
}

pub fn muted(text: &str) -> String {
    paint_if_enabled(Tone::Muted, text)
}

pub fn status(text: &str) -> String {
    if should_colorize() {
        paint_status(text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
