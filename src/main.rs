use anyhow::Result;

mod cli;
mod client;
mod config;
mod credentials;
mod display;
mod sql;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::try_parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());
    init_logging(cli.verbose);
    cli.run().await
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
