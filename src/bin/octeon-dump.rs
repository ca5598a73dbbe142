use clap::Parser;
use log::{debug, LevelFilter};
use miette::Result;

use octeon_dump::cli::{self, DumpArgs};

#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
    #[command(flatten)]
    args: DumpArgs,
}

fn main() -> Result<()> {
    miette::set_panic_hook();

    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    debug!("{:#?}", cli);

    cli::dump(cli.args)
}
