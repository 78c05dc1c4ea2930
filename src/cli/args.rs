//! CLI argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

/// notebot - capture ideas, tasks and links into Notion from a chat
#[derive(Parser, Debug, Clone)]
#[command(name = "notebot")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Settings file (default: ~/.notebot/settings.toml)
    #[arg(short = 'c', long, env = "NOTEBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Talk to the bot in this terminal instead of Telegram
    #[arg(long)]
    pub console: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    /// Default log directive for the crate.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "notebot_lib=debug"
        } else {
            "notebot_lib=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_values() {
        let args = Args::parse_from(["notebot"]);
        assert!(!args.console);
        assert!(!args.verbose);
        assert_eq!(args.log_directive(), "notebot_lib=info");
    }

    #[test]
    fn test_args_config_path() {
        let args = Args::parse_from(["notebot", "--config", "/tmp/bot.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/bot.toml")));
    }

    #[test]
    fn test_args_console_and_verbose() {
        let args = Args::parse_from(["notebot", "--console", "-v"]);
        assert!(args.console);
        assert!(args.verbose);
        assert_eq!(args.log_directive(), "notebot_lib=debug");
    }

    #[test]
    fn test_args_reject_positional() {
        assert!(Args::try_parse_from(["notebot", "extra"]).is_err());
    }
}
