//! Vesh IR - shared syntax types.
//!
//! This crate contains the data structures that sit between the parser and
//! the evaluator:
//! - `Span` for source positions (byte offsets, `[start, end)`)
//! - `Source` describing where a piece of code came from
//! - The syntax tree (`ast`) produced by `vesh_parse` and consumed by the
//!   compilers in `vesh_eval`
//!
//! The tree is owned (`Vec`/`Box`) rather than arena-allocated: every chunk
//! is walked exactly once by the compiler and then dropped.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-copied types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
mod source;
mod span;

pub use ast::{
    Assignment, Chunk, Compound, Form, FormKind, IndexArray, Indexing, Lambda, MapPair, Param,
    Pipeline, Primary, PrimaryKind,
};
pub use source::{Source, SourceKind, SourceRef};
pub use span::Span;
