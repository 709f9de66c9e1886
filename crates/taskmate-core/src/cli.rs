use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::Priority;
use crate::view::{FilterStatus, SortBy};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskmate",
    version,
    about = "TaskMate: a personal task list with deadlines and priorities",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task.
    Add {
        name: String,

        /// YYYY-MM-DD (end of that day), YYYY-MM-DDTHH:MM, or RFC 3339.
        #[arg(short = 'd', long = "deadline")]
        deadline: Option<String>,

        #[arg(short = 'D', long = "description", default_value = "")]
        description: String,

        #[arg(
            short = 'p',
            long = "priority",
            default_value = "low",
            value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Priority>())
        )]
        priority: Priority,
    },

    /// List tasks.
    #[command(alias = "ls")]
    List {
        #[arg(
            short = 'f',
            long = "filter",
            value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<FilterStatus>())
        )]
        filter: Option<FilterStatus>,

        #[arg(
            short = 's',
            long = "sort",
            value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<SortBy>())
        )]
        sort: Option<SortBy>,
    },

    /// Flip a task between pending and completed.
    #[command(alias = "done")]
    Toggle { id: String },

    /// Delete a task after confirmation.
    #[command(alias = "rm")]
    Delete {
        id: String,

        /// Skip the confirmation prompt.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Show total, completed and pending counts.
    Stats,
}

impl Command {
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Add { .. } | Command::Toggle { .. } | Command::Delete { .. }
        )
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::List {
            filter: None,
            sort: None,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};
    use crate::task::Priority;
    use crate::view::{FilterStatus, SortBy};

    #[test]
    fn parses_add_with_options() {
        let cli = GlobalCli::try_parse_from([
            "taskmate",
            "--rc",
            "color=off",
            "add",
            "Buy milk",
            "--deadline",
            "2026-02-17",
            "-p",
            "Medium",
        ])
        .unwrap();

        assert_eq!(cli.rc_overrides[0].key, "color");
        match cli.command {
            Some(Command::Add {
                name,
                deadline,
                description,
                priority,
            }) => {
                assert_eq!(name, "Buy milk");
                assert_eq!(deadline.as_deref(), Some("2026-02-17"));
                assert!(description.is_empty());
                assert_eq!(priority, Priority::Medium);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_selectors_and_default_command() {
        let cli =
            GlobalCli::try_parse_from(["taskmate", "ls", "-f", "done", "-s", "priority", "-v"])
                .unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Some(Command::List {
                filter: Some(FilterStatus::Completed),
                sort: Some(SortBy::Priority)
            })
        ));

        let cli = GlobalCli::try_parse_from(["taskmate"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!Command::default().mutates());
    }

    #[test]
    fn rejects_bad_selector_values() {
        assert!(GlobalCli::try_parse_from(["taskmate", "list", "--sort", "newest"]).is_err());
        assert!(GlobalCli::try_parse_from(["taskmate", "add", "x", "-p", "urgent"]).is_err());
        assert!(GlobalCli::try_parse_from(["taskmate", "--rc", "novalue", "stats"]).is_err());
    }
}
