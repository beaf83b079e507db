//! Parser for the vesh shell.
//!
//! Turns source text into the syntax tree defined in `vesh_ir::ast`. There
//! is no separate token stream: shell syntax decides what a byte means from
//! where it appears, so the parser reads the source through a byte
//! [`cursor`] and backtracks (by copying the cursor) when a form turns out
//! not to be an assignment.

mod cursor;
mod error;
mod parser;

use tracing::trace;
use vesh_ir::Chunk;

pub use error::ParseError;

/// Parse a whole source text into a chunk.
///
/// `name` only labels trace output; errors carry spans, and the caller
/// pairs them with the source.
pub fn parse(name: &str, code: &str) -> Result<Chunk, ParseError> {
    trace!(name, len = code.len(), "parsing");
    let chunk = parser::Parser::new(code).parse_source()?;
    trace!(name, pipelines = chunk.pipelines.len(), "parsed");
    Ok(chunk)
}
