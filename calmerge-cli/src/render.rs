//! Terminal output for merged bookings.
//!
//! Events carry a dot in their source's color; cross-source overlaps print
//! red and same-source overlaps yellow.

use calmerge_core::{BookingEvent, ConflictPair, MergeResult, Source, SourceFailure};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

/// Parse a `#rrggbb` tag. Anything else renders uncolored.
fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// A dot in the source's color.
fn color_dot(color: &str) -> String {
    match parse_hex(color) {
        Some((r, g, b)) => "●".truecolor(r, g, b).to_string(),
        None => "●".to_string(),
    }
}

impl Render for BookingEvent {
    fn render(&self) -> String {
        format!(
            "{} {} {} {}",
            color_dot(self.color()),
            self.title(),
            self.render_time_range().dimmed(),
            format!("({})", self.source_name()).dimmed()
        )
    }
}

impl Render for ConflictPair<'_> {
    fn render(&self) -> String {
        let (from, to) = self.overlap();
        let scope = if self.is_cross_source() {
            "double-booked".red().to_string()
        } else {
            "overlap within one source".yellow().to_string()
        };

        format!(
            "{} {} {}\n   {}\n   {}",
            "!".red().bold(),
            scope,
            format!("{} → {}", from.format("%Y-%m-%d %H:%M"), to.format("%Y-%m-%d %H:%M")).dimmed(),
            self.earlier.render(),
            self.later.render()
        )
    }
}

impl Render for SourceFailure {
    fn render(&self) -> String {
        format!("{} {}", "✗".red(), self.to_string().red())
    }
}

impl Render for Source {
    fn render(&self) -> String {
        let locator = self.locator.as_deref().unwrap_or("-");
        format!(
            "{} {} {} {}",
            color_dot(self.color_tag()),
            self.name.bold(),
            format!("[{}]", self.kind.as_str()).dimmed(),
            locator.dimmed()
        )
    }
}

impl Render for MergeResult {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        if self.events.is_empty() {
            lines.push("No events".dimmed().to_string());
        }
        for event in &self.events {
            lines.push(event.render());
        }

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "{} {} could not be merged:",
                self.failures.len(),
                pluralize("source", self.failures.len())
            ));
            for failure in &self.failures {
                lines.push(format!("   {}", failure.render()));
            }
        }

        lines.join("\n")
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
