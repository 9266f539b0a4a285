//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Self-verifying email aliases.
#[derive(Debug, Parser)]
#[command(name = "aliasguard", version)]
#[command(about = "Mint self-verifying email aliases and file inbound mail by them")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, short, global = true, env = "ALIASGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mint a new alias for a correspondent's domain
    Generate {
        /// Domain of the correspondent, e.g. `shop.example`
        domain: String,

        /// Own domain to issue the alias under (defaults to the first configured)
        #[arg(long)]
        own_domain: Option<String>,
    },

    /// Check an alias and print the result as JSON
    Verify {
        /// Alias address to check
        alias: String,
    },

    /// Let a sender domain through for an alias regardless of other checks
    Allow {
        /// Alias address
        alias: String,
        /// Sender domain; its subdomains up to three levels are included
        domain: String,
    },

    /// List the sender domains allowed for an alias
    Allowed {
        /// Alias address
        alias: String,
    },

    /// Classify a message from its headers and print the target folder
    Classify {
        /// File holding the message or its headers (reads stdin if omitted)
        file: Option<PathBuf>,

        /// Print every check as JSON instead of the folder name
        #[arg(long)]
        json: bool,
    },

    /// Watch the spool mailbox and file new messages until interrupted
    Watch,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from(["aliasguard", "generate", "shop.example"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Generate { ref domain, own_domain: None } if domain == "shop.example"
        ));
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "aliasguard",
            "classify",
            "--json",
            "--log-format",
            "json",
            "--config",
            "/etc/aliasguard.toml",
        ])
        .unwrap();

        assert!(matches!(cli.command, Command::Classify { file: None, json: true }));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/aliasguard.toml")));
    }

    #[test]
    fn test_allow_needs_both_arguments() {
        assert!(Cli::try_parse_from(["aliasguard", "allow", "a@mine.example"]).is_err());
    }
}
