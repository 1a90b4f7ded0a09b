mod cli;

use anyhow::Result;
use clap::Parser;
use seglabels::GroupStore;

fn main() -> Result<()> {
    let cli_opts = cli::Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli_opts.log_filter())
        .parse_env("RUST_LOG")
        .init();

    let store = GroupStore::open(&cli_opts.store_config());
    cli::run(cli_opts.command, &store)
}
