//! Source descriptors.
//!
//! Every compiled unit remembers where its code came from. The kind matters
//! to evaluation: only code loaded as a module may `use` relative paths, and
//! those paths resolve against the module's own name.

use std::fmt;
use std::sync::Arc;

/// Where a piece of source code came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Typed at a prompt, or passed with `-c`.
    Interactive,
    /// A script file given on the command line.
    File,
    /// A module loaded by `use`. The source name is the resolved module path.
    Module,
}

/// A named piece of source code.
#[derive(Clone, PartialEq, Eq)]
pub struct Source {
    /// Display name. For modules this is the resolved module path (`a/b`).
    pub name: String,
    /// Where the code physically lives: a file path, or a pseudo-path such
    /// as `<builtin module>` for bundled modules.
    pub path: String,
    pub code: String,
    pub kind: SourceKind,
}

/// Shared handle to a source. Frames and errors hold onto these.
pub type SourceRef = Arc<Source>;

impl Source {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        code: impl Into<String>,
        kind: SourceKind,
    ) -> Self {
        Source {
            name: name.into(),
            path: path.into(),
            code: code.into(),
            kind,
        }
    }

    /// Source typed interactively (or given with `-c`).
    pub fn interactive(code: impl Into<String>) -> Self {
        Source::new("[interactive]", "", code, SourceKind::Interactive)
    }

    /// Source read from a script file.
    pub fn file(path: impl Into<String>, code: impl Into<String>) -> Self {
        let path = path.into();
        Source::new(path.clone(), path, code, SourceKind::File)
    }

    /// Source of a module, named by its resolved module path.
    pub fn module(
        name: impl Into<String>,
        path: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Source::new(name, path, code, SourceKind::Module)
    }

    pub fn is_module(&self) -> bool {
        self.kind == SourceKind::Module
    }

    /// Length of the code as a span offset.
    pub fn end(&self) -> u32 {
        u32::try_from(self.code.len()).unwrap_or(u32::MAX)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Code is omitted; it can be large and is never interesting in a dump.
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
