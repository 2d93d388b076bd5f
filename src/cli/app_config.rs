use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// The target url, like https://example.com (the scheme defaults to https)
    pub url: Option<String>,
    /// TLS server name to verify instead of the url host
    #[arg(long = "servername", value_name = "name")]
    pub server_name_option: Option<String>,
    /// Metric key prefix
    #[arg(global = true, short = 'p', long = "prefix", value_name = "prefix")]
    pub prefix_option: Option<String>,
    /// PEM bundle of trusted root certificates, replaces the bundled roots
    #[arg(global = true, long = "cacert", value_name = "file")]
    pub certificate_path_option: Option<PathBuf>,
    /// Give up on the attempt after this many seconds
    #[arg(global = true, long = "timeout", value_name = "seconds")]
    pub timeout_option: Option<u64>,
    ///  Make the operation more talkative
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Time a raw TCP+TLS dial and report it in seconds
    Handshake {
        /// Host name or address to dial
        #[arg(long = "host")]
        host: String,
        /// Port to dial
        #[arg(long = "port", default_value_t = 443)]
        port: u16,
        /// TLS server name, defaults to the host
        #[arg(long = "servername", value_name = "name")]
        server_name: Option<String>,
    },
}
