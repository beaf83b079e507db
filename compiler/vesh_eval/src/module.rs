//! Module loading for `use`.
//!
//! A module path such as `a/b` names `<lib>/a/b.vesh`, or failing that a
//! bundled module registered with [`crate::EvalerConfig::with_bundled`].
//! Paths starting with `./` or `../` are relative to the module doing the
//! `use` and are only allowed inside a module.
//!
//! # Caching
//!
//! Each resolved path is loaded at most once per evaluator. Before the
//! module runs, its cache entry is marked as loading and holds an empty
//! namespace that the module's top level fills in. Consequences:
//!
//! - A second `use` of the same path, from anywhere, gets the same
//!   namespace.
//! - A module that (directly or not) uses itself sees its own namespace as
//!   it is at that point, possibly empty, instead of recursing.
//! - A `use` from another pipeline stage while the module is loading waits
//!   for the load to finish, and then gets the finished namespace or
//!   retries the load if it failed.
//!
//! Waiting cannot deadlock. Every loading entry records the paths its load
//! is waiting on, and a `use` that would wait on its own load (through any
//! chain of such waits) takes the partial namespace instead, as if the
//! cycle had happened on one thread.
//!
//! A module that fails to load is dropped from the cache so a later `use`
//! can retry.

use std::io;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use vesh_ir::{Source, SourceRef};

use crate::compiler;
use crate::evaler::{escaped, EvalerState};
use crate::exception::{ErrorKind, EvalResult, Unwind};
use crate::frame::Frame;
use crate::ns::Ns;

/// File extension of module sources.
pub const EXTENSION: &str = "vesh";

/// Pseudo-path recorded for bundled modules.
pub const BUNDLED_PATH: &str = "<builtin module>";

/// A module cache entry.
pub(crate) enum ModuleEntry {
    /// The module's top level is running and filling in `ns`.
    Loading {
        ns: Ns,
        /// Paths some part of this load is blocked on, one per waiter.
        waiting_on: Vec<String>,
    },
    Loaded(Ns),
}

pub(crate) type ModuleCache = FxHashMap<String, ModuleEntry>;

/// Load (or fetch from the cache) the module `target` as seen from `frame`.
#[tracing::instrument(level = "debug", skip(frame), fields(from = %frame.src.name))]
pub(crate) fn use_module(frame: &Frame, target: &str) -> EvalResult<Ns> {
    let path = resolve_path(&frame.src, target)?;
    let state = &frame.evaler;

    let mut modules = state.modules.lock();
    loop {
        let partial = match modules.get(&path) {
            None => break,
            Some(ModuleEntry::Loaded(ns)) => {
                debug!(%path, "module cache hit");
                return Ok(ns.clone());
            }
            Some(ModuleEntry::Loading { ns, .. }) => ns.clone(),
        };
        if waits_on_self(&modules, &path, &frame.loading) {
            debug!(%path, "module cycle, using partial namespace");
            return Ok(partial);
        }
        debug!(%path, "waiting for module");
        set_waiting(&mut modules, &frame.loading, &path, true);
        state.module_ready.wait(&mut modules);
        set_waiting(&mut modules, &frame.loading, &path, false);
    }
    let ns = Ns::new();
    modules.insert(
        path.clone(),
        ModuleEntry::Loading {
            ns: ns.clone(),
            waiting_on: Vec::new(),
        },
    );
    drop(modules);

    debug!(%path, "loading module");
    let result = load(frame, &path, &ns);

    let mut modules = state.modules.lock();
    match &result {
        Ok(()) => {
            modules.insert(path.clone(), ModuleEntry::Loaded(ns.clone()));
        }
        Err(err) => {
            modules.remove(&path);
            debug!(%path, error = %err, "module failed to load");
        }
    }
    drop(modules);
    state.module_ready.notify_all();
    result.map(|()| ns)
}

/// Whether waiting for `path` would wait for one of the `loading` modules,
/// which cannot finish before this `use` returns.
fn waits_on_self(modules: &ModuleCache, path: &str, loading: &[String]) -> bool {
    let mut seen = FxHashSet::default();
    let mut pending = vec![path];
    while let Some(next) = pending.pop() {
        if loading.iter().any(|module| module == next) {
            return true;
        }
        if let Some(ModuleEntry::Loading { waiting_on, .. }) = modules.get(next) {
            pending.extend(
                waiting_on
                    .iter()
                    .map(String::as_str)
                    .filter(|waited| seen.insert(*waited)),
            );
        }
    }
    false
}

/// Record (or clear) that each of the `loading` modules is blocked on
/// `path`.
fn set_waiting(modules: &mut ModuleCache, loading: &[String], path: &str, waiting: bool) {
    for module in loading {
        let Some(ModuleEntry::Loading { waiting_on, .. }) = modules.get_mut(module) else {
            continue;
        };
        if waiting {
            waiting_on.push(path.to_owned());
        } else if let Some(i) = waiting_on.iter().position(|waited| waited == path) {
            waiting_on.swap_remove(i);
        }
    }
}

/// The cache key for `target`: a clean path relative to the library root.
pub(crate) fn resolve_path(from: &Source, target: &str) -> Result<String, ErrorKind> {
    let joined = if target.starts_with("./") || target.starts_with("../") {
        if !from.is_module() {
            return Err(ErrorKind::RelativeUseNotFromModule);
        }
        let dir = from.name.rsplit_once('/').map_or(".", |(dir, _)| dir);
        format!("{dir}/{target}")
    } else {
        target.to_owned()
    };

    let path = clean_path(&joined);
    if path == ".." || path.starts_with("../") || path.starts_with('/') {
        return Err(ErrorKind::ModuleOutsideLib);
    }
    Ok(path)
}

/// Lexically normalize a slash-separated path: drop empty and `.`
/// segments, fold `x/..`, and drop `..` at the root. An empty result is
/// `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_owned(),
        (false, false) => joined,
    }
}

fn load(frame: &Frame, path: &str, ns: &Ns) -> EvalResult {
    let source: SourceRef = Arc::new(find_source(&frame.evaler, path)?);
    let chunk = vesh_parse::parse(&source.name, &source.code).map_err(|err| {
        ErrorKind::LoadFailed(format!("{}: parse error: {}", source.path, err.message))
    })?;
    let op = compiler::compile(&chunk, &source, &frame.evaler.builtin, &[]).map_err(|err| {
        ErrorKind::LoadFailed(format!("{}: compile error: {}", source.path, err.message))
    })?;

    let module_frame = frame.module(source, ns.clone(), path);
    op.exec(&module_frame)
        .map_err(|unwind| Unwind::from(escaped(unwind, &module_frame, op.span)))
}

fn find_source(state: &EvalerState, path: &str) -> Result<Source, ErrorKind> {
    let bundled = || {
        state
            .bundled
            .get(path)
            .map(|code| Source::module(path, BUNDLED_PATH, code.clone()))
    };
    let Some(lib_dir) = &state.lib_dir else {
        return bundled().ok_or(ErrorKind::NoLibDir);
    };

    let file = lib_dir.join(format!("{path}.{EXTENSION}"));
    let file_name = file.display().to_string();
    match std::fs::read_to_string(&file) {
        Ok(code) => Ok(Source::module(path, file_name, code)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            bundled().ok_or_else(|| ErrorKind::ModuleNotFound {
                name: path.to_owned(),
                path: file_name,
            })
        }
        Err(err) => Err(ErrorKind::Io {
            path: file_name,
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests;
