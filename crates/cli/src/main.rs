use clap::Parser;
use tracing::error;

mod cli;

fn main() {
    let args = cli::Args::parse();
    if let Err(err) = cli::init_logging(args.log_level.as_deref()) {
        eprintln!("{:#}", err);
    }
    if let Err(err) = cli::dispatch(args) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
