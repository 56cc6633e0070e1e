//! Command-line arguments and the settings derived from them and the environment.

use crate::env::Environment;
use crate::usage::Accounting;
use anyhow::{Context, Result};
use argh::FromArgs;
use log::LevelFilter;

pub const DEFAULT_PROMPT: &str = "doit> ";
pub const PROMPT_VAR: &str = "DOIT_PROMPT";
pub const LOG_VAR: &str = "DOIT_LOG";

#[derive(FromArgs, Debug, Default, PartialEq)]
/// Run commands as child processes and report their resource usage.
/// Without a command, start an interactive shell with background jobs.
pub struct Args {
    #[argh(switch, short = 'v')]
    /// log spawns and reaps to stderr.
    pub verbose: bool,

    #[argh(switch)]
    /// report the usage of all children reaped so far instead of each job alone.
    pub cumulative: bool,

    #[argh(option)]
    /// prompt shown before each command line. Defaults to $DOIT_PROMPT or "doit> ".
    pub prompt: Option<String>,

    #[argh(positional, greedy)]
    /// command to run once, followed by its arguments.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub prompt: String,
    pub accounting: Accounting,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            accounting: Accounting::default(),
            log_level: LevelFilter::Warn,
        }
    }
}

impl Config {
    /// Merge command-line arguments with the environment. Arguments win.
    pub fn resolve(args: &Args, env: &Environment) -> Result<Self> {
        let prompt = match &args.prompt {
            Some(prompt) => prompt.clone(),
            None => env
                .get_var(PROMPT_VAR)
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        };

        let log_level = if args.verbose {
            LevelFilter::Debug
        } else {
            match env.get_var(LOG_VAR) {
                Some(level) => level
                    .parse()
                    .with_context(|| format!("invalid {LOG_VAR} value: {level:?}"))?,
                None => LevelFilter::Warn,
            }
        };

        let accounting = if args.cumulative {
            Accounting::Cumulative
        } else {
            Accounting::PerChild
        };

        Ok(Self {
            prompt,
            accounting,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        Environment {
            vars: vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            current_dir: std::env::current_dir().unwrap(),
            should_exit: false,
            exit_code: 0,
        }
    }

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["doit"], args).unwrap()
    }

    #[test]
    fn no_arguments_means_interactive() {
        let args = parse(&[]);
        assert!(args.command.is_empty());
        assert!(!args.verbose);
    }

    #[test]
    fn flags_after_the_command_belong_to_it() {
        let args = parse(&["-v", "ls", "-l", "--cumulative"]);
        assert!(args.verbose);
        assert!(!args.cumulative);
        assert_eq!(args.command, vec!["ls", "-l", "--cumulative"]);
    }

    #[test]
    fn defaults() {
        let config = Config::resolve(&Args::default(), &env(&[])).unwrap();
        assert_eq!(config.log_level, LevelFilter::Warn);
        assert_eq!(config.accounting, Accounting::PerChild);
    }

    #[test]
    fn environment_supplies_prompt_and_level() {
        let config = Config::resolve(
            &Args::default(),
            &env(&[(PROMPT_VAR, "==> "), (LOG_VAR, "debug")]),
        )
        .unwrap();
        assert_eq!(config.prompt, "==> ");
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn arguments_override_environment() {
        let args = parse(&["--prompt", "$ ", "--cumulative", "-v"]);
        let env = env(&[(PROMPT_VAR, "==> "), (LOG_VAR, "off")]);
        let config = Config::resolve(&args, &env).unwrap();
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.accounting, Accounting::Cumulative);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn bad_log_level_is_an_error() {
        let err = Config::resolve(&Args::default(), &env(&[(LOG_VAR, "loud")])).unwrap_err();
        assert!(err.to_string().contains(LOG_VAR));
    }
}
