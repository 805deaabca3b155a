use anyhow::Result;
use clap::Parser;
use musicwiki::{
    check::check_wiki,
    cli::{Cli, Commands},
    config::{WikiConfig, cfg, init_config},
    dump::dump_thing,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WikiConfig::load(&cli)?;
    config.validate()?;
    init_config(config);

    let config = cfg();
    match &cli.command {
        Commands::Check { .. } => check_wiki(&config),
        Commands::Dump { reference, property } => dump_thing(&config, reference, property.as_deref()),
    }
}
