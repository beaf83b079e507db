//! The `vesh` command: run a script, a `-c` snippet, or stdin.

mod config;

use std::io::{IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Once;

use tracing::debug;
use vesh_diagnostic::{ColorMode, Diagnostic, TerminalEmitter};
use vesh_eval::{Evaler, Value, Variable};
use vesh_ir::Source;

use config::{Action, Config, Input, USAGE};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Only does anything when `RUST_LOG` is set, e.g.
/// `RUST_LOG=vesh_eval=debug`. With `VESH_LOG_TREE` also set, spans are
/// printed as an indented tree instead of flat lines.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var_os("VESH_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .init();
        }
    });
}

fn main() -> ExitCode {
    init_tracing();

    let config = match Config::from_args(std::env::args().skip(1), |name| std::env::var(name).ok()) {
        Ok(Action::Run(config)) => config,
        Ok(Action::Help) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!();
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    debug!(?config, "starting");

    let source = match read_source(&config.input) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let evaler = Evaler::new(config.evaler_config());
    if let Input::Script { args, .. } = &config.input {
        let args = args.iter().map(|arg| Value::from(arg.as_str())).collect();
        evaler.global().insert("args", Variable::new(Value::list(args)));
    }

    match evaler.eval(source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err.to_diagnostic(), config.color);
            ExitCode::FAILURE
        }
    }
}

fn read_source(input: &Input) -> Result<Source, String> {
    match input {
        Input::Script { path, .. } => {
            let name = path.display().to_string();
            match std::fs::read_to_string(path) {
                Ok(code) => Ok(Source::file(name, code)),
                Err(err) => Err(match err.kind() {
                    std::io::ErrorKind::NotFound => format!("cannot find file '{name}'"),
                    std::io::ErrorKind::PermissionDenied => {
                        format!("permission denied reading '{name}'")
                    }
                    std::io::ErrorKind::InvalidData => {
                        format!("'{name}' contains invalid UTF-8 data")
                    }
                    _ => format!("error reading '{name}': {err}"),
                }),
            }
        }
        Input::Code(code) => Ok(Source::interactive(code.clone())),
        Input::Stdin => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .map_err(|err| format!("error reading stdin: {err}"))?;
            Ok(Source::interactive(code))
        }
    }
}

fn report(diagnostic: &Diagnostic, color: ColorMode) {
    let stderr = std::io::stderr();
    let is_tty = stderr.is_terminal();
    let mut emitter = TerminalEmitter::with_color_mode(stderr.lock(), color, is_tty);
    if let Err(err) = emitter.emit(diagnostic) {
        debug!(%err, "cannot write diagnostic");
    }
}
