//! CLI argument definitions using clap
//!
//! Commands:
//! - redex validate --config <path>
//! - redex explain --config <path> [--namespace <ns>] [--query <json>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// redex - secondary indexes and atomic record writes over a key-value store
#[derive(Parser, Debug)]
#[command(name = "redex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the configuration and register every schema it names
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./redex.json")]
        config: PathBuf,
    },

    /// Compile a JSON query and print its plan
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./redex.json")]
        config: PathBuf,

        /// Namespace to query; overrides the query's own namespace
        #[arg(long)]
        namespace: Option<String>,

        /// Query as JSON; read from stdin when absent
        #[arg(long)]
        query: Option<String>,

        /// Print the plan as JSON instead of numbered steps
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explain() {
        let cli = Cli::try_parse_from([
            "redex",
            "explain",
            "--config",
            "conf.json",
            "--namespace",
            "User",
            "--query",
            "{}",
        ])
        .unwrap();
        match cli.command {
            Command::Explain {
                config,
                namespace,
                query,
                json,
            } => {
                assert_eq!(config, PathBuf::from("conf.json"));
                assert_eq!(namespace.as_deref(), Some("User"));
                assert_eq!(query.as_deref(), Some("{}"));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let cli = Cli::try_parse_from(["redex", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Validate { config } if config == PathBuf::from("./redex.json")
        ));
    }
}
