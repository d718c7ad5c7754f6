use clap::{CommandFactory, Parser};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use snp_matrix::cli::{self, Cli};
use snp_matrix::pipeline::CancelFlag;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("snp_matrix=debug,info")
    } else {
        EnvFilter::new("snp_matrix=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if cli.args.reference.is_none() {
        eprintln!("error: the --reference <REFERENCE> argument is required\n");
        eprintln!("{}", Cli::command().render_usage());
        std::process::exit(1);
    }

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("interrupt received; flushing what has been written");
        on_interrupt.cancel();
    })?;

    cli::analyze::run(cli.args, cli.format, &cancel)
}
