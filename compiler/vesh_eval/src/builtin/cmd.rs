//! External commands: lookup on `PATH` and execution.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::trace;

use super::base::{require_args, require_string};
use crate::callable::Callable;
use crate::exception::{ErrorKind, EvalResult};
use crate::frame::Frame;
use crate::ports::ByteSink;
use crate::value::{format_number, Value};

/// Full path of the command `name`. A name containing `/` is taken as a
/// path and only checked.
pub fn search_path(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = Path::new(name);
        return is_executable(path).then(|| path.to_path_buf());
    }
    let dirs = std::env::var_os("PATH")?;
    std::env::split_paths(&dirs)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Run `name` with `args`. Byte output goes to the frame's byte sink;
/// stdin and stderr are the process's own.
pub(crate) fn run_external(frame: &Frame, name: &str, args: &[Value]) -> EvalResult {
    let program = search_path(name).ok_or_else(|| ErrorKind::CommandNotFound(name.to_owned()))?;
    let args = args
        .iter()
        .map(|arg| match arg {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(format_number(*n)),
            other => Err(ErrorKind::WrongArgType {
                want: "string",
                got: other.kind().to_owned(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    trace!(program = %program.display(), ?args, "spawning");

    let spawn_failed = |err: io::Error| ErrorKind::SpawnFailed {
        cmd: name.to_owned(),
        reason: err.to_string(),
    };
    let mut command = Command::new(&program);
    command
        .args(&args)
        .stdin(Stdio::inherit())
        .stderr(Stdio::inherit());
    let status = match &frame.ports.bytes {
        ByteSink::Stdout => command.stdout(Stdio::inherit()).status().map_err(spawn_failed)?,
        ByteSink::Buffer(_) => {
            let output = command
                .stdout(Stdio::piped())
                .output()
                .map_err(spawn_failed)?;
            frame.ports.write_bytes(&output.stdout);
            output.status
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(ErrorKind::ExternalFailed {
            cmd: name.to_owned(),
            status: status.to_string(),
        }
        .into())
    }
}

/// `external cmd`: the external command `cmd` as a value.
pub(super) fn external(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let [name] = require_args::<1>(args)?;
    let name = require_string(&name)?;
    frame
        .ports
        .put(Value::Fn(Callable::External(Arc::from(name.as_str()))));
    Ok(())
}

pub(super) fn has_external(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let [name] = require_args::<1>(args)?;
    let found = search_path(&require_string(&name)?).is_some();
    frame.ports.put(Value::Bool(found));
    Ok(())
}

pub(super) fn search_external(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let [name] = require_args::<1>(args)?;
    let name = require_string(&name)?;
    let path = search_path(&name).ok_or(ErrorKind::CommandNotFound(name))?;
    frame.ports.put(Value::String(path.display().to_string()));
    Ok(())
}
