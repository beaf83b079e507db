//! Command-line configuration.
//!
//! Settings come from, highest priority first: command-line flags, the
//! environment, built-in defaults. The library directory, for instance, is
//! `--lib=<dir>`, else `$VESH_LIB`, else `$HOME/.vesh/lib`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use vesh_diagnostic::ColorMode;
use vesh_eval::EvalerConfig;

pub const USAGE: &str = "\
Usage: vesh [options] [script [args...]]
       vesh [options] -c <code>

Options:
  --lib=<dir>      Library directory for `use`
                   (default: $VESH_LIB, then ~/.vesh/lib)
  --color=<when>   Color diagnostics: auto, always, never
  -c <code>        Run <code> instead of a script
  -h, --help       Show this message

With neither a script nor -c, code is read from stdin.";

/// Where the code to run comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// A script file; `args` are bound to `$args`.
    Script { path: PathBuf, args: Vec<String> },
    Code(String),
    Stdin,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub lib_dir: Option<PathBuf>,
    pub color: ColorMode,
    pub input: Input,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lib_dir: None,
            color: ColorMode::Auto,
            input: Input::Stdin,
        }
    }
}

/// What the command line asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Run(Config),
    Help,
}

impl Config {
    #[must_use]
    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    /// Parse `args` (without the program name). `env` reads environment
    /// variables, so tests can supply their own.
    pub fn from_args<I>(args: I, env: impl Fn(&str) -> Option<String>) -> Result<Action, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut lib_flag = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if let Some(dir) = arg.strip_prefix("--lib=") {
                lib_flag = Some(PathBuf::from(dir));
            } else if let Some(when) = arg.strip_prefix("--color=") {
                config = config.with_color(parse_color(when)?);
            } else if arg == "-h" || arg == "--help" {
                return Ok(Action::Help);
            } else if arg == "-c" {
                let code = args.next().ok_or("-c needs an argument")?;
                if let Some(extra) = args.next() {
                    return Err(format!("unexpected argument '{extra}' after -c"));
                }
                config = config.with_input(Input::Code(code));
            } else if arg.starts_with('-') {
                return Err(format!("unknown option '{arg}'"));
            } else {
                // Everything after the script belongs to the script.
                config = config.with_input(Input::Script {
                    path: PathBuf::from(arg),
                    args: args.by_ref().collect(),
                });
            }
        }

        let lib_dir = lib_flag
            .or_else(|| env("VESH_LIB").filter(|dir| !dir.is_empty()).map(PathBuf::from))
            .or_else(|| env("HOME").map(|home| PathBuf::from(home).join(".vesh").join("lib")));
        if let Some(dir) = lib_dir {
            config = config.with_lib_dir(dir);
        }
        Ok(Action::Run(config))
    }

    /// Evaluator settings: the library directory, and a shutdown hook that
    /// flushes stdout before `exit` ends the process.
    pub fn evaler_config(&self) -> EvalerConfig {
        let config = EvalerConfig::default()
            .with_shutdown(Arc::new(|| std::io::stdout().flush().map_err(|err| err.to_string())));
        match &self.lib_dir {
            Some(dir) => config.with_lib_dir(dir.clone()),
            None => config,
        }
    }
}

fn parse_color(when: &str) -> Result<ColorMode, String> {
    match when {
        "auto" => Ok(ColorMode::Auto),
        "always" => Ok(ColorMode::Always),
        "never" => Ok(ColorMode::Never),
        other => Err(format!("invalid --color value '{other}' (expected auto, always or never)")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str], env: &[(&str, &str)]) -> Result<Action, String> {
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_args(args.iter().map(|s| (*s).to_owned()), |name| {
            env.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
        })
    }

    fn config(args: &[&str], env: &[(&str, &str)]) -> Config {
        match parse(args, env) {
            Ok(Action::Run(config)) => config,
            other => panic!("{args:?}: {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[], &[]), Config::default());
        assert_eq!(
            config(&[], &[("HOME", "/home/u")]),
            Config::default().with_lib_dir("/home/u/.vesh/lib")
        );
    }

    #[test]
    fn test_lib_dir_priority() {
        let env = [("HOME", "/home/u"), ("VESH_LIB", "/env/lib")];
        assert_eq!(config(&[], &env).lib_dir, Some(PathBuf::from("/env/lib")));
        assert_eq!(
            config(&["--lib=/flag/lib"], &env).lib_dir,
            Some(PathBuf::from("/flag/lib"))
        );
        // An empty VESH_LIB counts as unset.
        assert_eq!(
            config(&[], &[("HOME", "/h"), ("VESH_LIB", "")]).lib_dir,
            Some(PathBuf::from("/h/.vesh/lib"))
        );
    }

    #[test]
    fn test_inputs() {
        assert_eq!(
            config(&["-c", "put x"], &[]).input,
            Input::Code("put x".to_owned())
        );
        assert_eq!(
            config(&["--color=never", "s.vesh", "a", "-c"], &[]),
            Config::default()
                .with_color(ColorMode::Never)
                .with_input(Input::Script {
                    path: PathBuf::from("s.vesh"),
                    args: vec!["a".to_owned(), "-c".to_owned()],
                })
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(&["--help"], &[]), Ok(Action::Help));
        assert!(parse(&["-c"], &[]).is_err());
        assert!(parse(&["-c", "a", "b"], &[]).is_err());
        assert!(parse(&["--color=sometimes"], &[]).is_err());
        assert_eq!(parse(&["-x"], &[]), Err("unknown option '-x'".to_owned()));
    }
}
