//! Terminal emitter.
//!
//! Renders a [`Diagnostic`] as:
//!
//! ```text
//! compile error: variable $x not found
//!  --> [interactive]:1:5
//!   |
//! 1 | put $x
//!   |     ^^
//! ```

use std::io::{self, Write};

use crate::span_utils::LineOffsetTable;
use crate::{Diagnostic, Severity};

mod colors {
    pub const ERROR: &str = "\x1b[1;31m"; // Bold red
    pub const WARNING: &str = "\x1b[1;33m"; // Bold yellow
    pub const NOTE: &str = "\x1b[1;36m"; // Bold cyan
    pub const SECONDARY: &str = "\x1b[1;34m"; // Bold blue
    pub const RESET: &str = "\x1b[0m";
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Colors only when writing to a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn paint(&mut self, color: &str, text: &str) -> io::Result<()> {
        if self.colors {
            write!(self.writer, "{color}{text}{}", colors::RESET)
        } else {
            write!(self.writer, "{text}")
        }
    }

    pub fn emit(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        let title_color = match diagnostic.severity {
            Severity::Warning => colors::WARNING,
            _ => colors::ERROR,
        };
        self.paint(title_color, diagnostic.severity.title())?;
        writeln!(self.writer, ": {}", diagnostic.message)?;

        if let Some(source) = &diagnostic.source {
            let code = source.code.as_str();
            let table = LineOffsetTable::build(code);
            let (line, col) = table.offset_to_line_col(code, diagnostic.span.start);
            let gutter = line.to_string().len();
            let pad = " ".repeat(gutter);

            self.paint(colors::SECONDARY, &format!("{pad}--> "))?;
            writeln!(self.writer, "{}:{line}:{col}", source.name)?;
            self.paint(colors::SECONDARY, &format!("{pad} |"))?;
            writeln!(self.writer)?;

            let text = table.line_text(code, line);
            self.paint(colors::SECONDARY, &format!("{line} | "))?;
            writeln!(self.writer, "{text}")?;

            // Underline the part of the span on its first line; a zero-width
            // span still gets one caret.
            let line_chars = text.chars().count();
            let start_col = (col as usize).saturating_sub(1).min(line_chars);
            let (_, end_col) = if table.line_from_offset(diagnostic.span.end) == line {
                table.offset_to_line_col(code, diagnostic.span.end)
            } else {
                (line, u32::try_from(line_chars + 1).unwrap_or(u32::MAX))
            };
            let width = ((end_col as usize).saturating_sub(1))
                .saturating_sub(start_col)
                .max(1);
            self.paint(colors::SECONDARY, &format!("{pad} | "))?;
            write!(self.writer, "{}", " ".repeat(start_col))?;
            self.paint(title_color, &"^".repeat(width))?;
            writeln!(self.writer)?;
        }

        for note in &diagnostic.notes {
            self.paint(colors::NOTE, "  = note")?;
            writeln!(self.writer, ": {note}")?;
        }
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests;
