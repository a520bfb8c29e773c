use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

#[cfg(unix)]
pub mod send;
#[cfg(unix)]
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a dispatcher with echo handlers on a Unix socket.
    Serve(ServeArgs),
    /// Send a single frame and print the reply.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        #[cfg(unix)]
        Command::Serve(args) => serve::run(args, format),
        #[cfg(unix)]
        Command::Send(args) => send::run(args, format),
        #[cfg(not(unix))]
        Command::Serve(_) | Command::Send(_) => Err(crate::exit::CliError::new(
            crate::exit::USAGE,
            "Unix domain sockets are not available on this platform",
        )),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Identifiers to echo without duplicate suppression (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub echo: Vec<u8>,
    /// Identifiers to echo over the alternating-bit channel (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub reliable_echo: Vec<u8>,
    /// Exit after dispatching N frames.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Frame identifier.
    #[arg(long)]
    pub id: u8,
    /// Raw string payload.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Hex-encoded payload (e.g. 03ff).
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
    /// Use the alternating-bit protocol and retransmit until acknowledged.
    #[arg(long)]
    pub reliable: bool,
    /// How long to wait for a reply (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
    /// Transmissions before giving up on a reliable send.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
