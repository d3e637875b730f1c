use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tandem",
    about = "Blog post API with best-effort mirroring to a second service",
    version = crate::version::VERSION,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    #[arg(
        long,
        env = "TANDEM_DATA_DIR",
        value_name = "PATH",
        default_value = "./data"
    )]
    pub data_dir: PathBuf,

    /// Base URL of the mirror service that receives a best-effort copy of
    /// every blog operation.
    #[arg(long = "mirror-api", env = "TANDEM_MIRROR_API", value_name = "URL")]
    pub mirror_api: String,
}
