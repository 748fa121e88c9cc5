//! btd: blind token issuance and redemption server
//!
//! Usage:
//!   btd --key <file> --comm <file> [--addr <addr>] [-p <port>] [-m <port>] [--maxtokens <n>]
//!   btd --config <file>

use std::process::ExitCode;

use btd::{
    common::errors::StartupError,
    config::{Args, Config},
    service,
};
use clap::Parser;
use tracing::{error, info};

async fn start(args: &Args) -> Result<(), StartupError> {
    let config = Config::from_args(args)?;
    let keys = config.load_key_material()?;
    info!(
        key_file = %config.key_file_path.display(),
        comm_file = %config.comm_file_path.display(),
        keys = keys.len(),
        "loaded key material"
    );
    service::serve(&config, keys).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    match start(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "btd failed to start");
            ExitCode::FAILURE
        }
    }
}
