//! Code related to CLI things
//!

use clap::{Parser, Subcommand};
use flexi_logger::LoggerHandle;

/// Default root configuration file, relative to the working directory.
pub const DEFAULT_CONF: &str = "rookd.conf";

#[derive(Parser, Clone)]
pub struct SharedOpts {
    #[clap(short, long, help = "Root configuration file")]
    config: Option<String>,
    #[clap(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon.
    Server {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
    /// Load and validate the configuration, dump it, and exit.
    ConfigCheck {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Server {
            sopt: SharedOpts {
                config: None,
                debug: false,
            },
        }
    }
}

#[derive(Parser)]
#[command(arg_required_else_help(false))]
/// An IRC server daemon. But with rook references.
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    fn sopt(&self) -> Option<&SharedOpts> {
        match &self.command {
            Some(Commands::Server { sopt }) | Some(Commands::ConfigCheck { sopt }) => Some(sopt),
            None => None,
        }
    }

    /// The root configuration path, `~` expanded.
    pub fn config(&self) -> String {
        let path = self
            .sopt()
            .and_then(|s| s.config.clone())
            .unwrap_or_else(|| DEFAULT_CONF.to_string());
        shellexpand::tilde(&path).into_owned()
    }

    pub fn debug(&self) -> bool {
        self.sopt().map(|s| s.debug).unwrap_or(false)
    }

    pub fn config_check(&self) -> bool {
        matches!(self.command, Some(Commands::ConfigCheck { .. }))
    }
}

/// Starts the logger. Config-check runs always log at info so the dump is
/// visible whatever the configured level.
pub fn setup_logging(cli: &Cli) -> Result<LoggerHandle, std::io::Error> {
    let log_level = if cli.config_check() {
        "info"
    } else if cli.debug() {
        "debug"
    } else {
        "info"
    };

    flexi_logger::Logger::try_with_str(log_level)
        .map_err(|e| std::io::Error::other(format!("Failed to start logger! {e:?}")))?
        .write_mode(flexi_logger::WriteMode::Async)
        .start()
        .map_err(|e| std::io::Error::other(format!("Failed to start logger! {e:?}")))
}
