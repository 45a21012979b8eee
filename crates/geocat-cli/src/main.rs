//! geocat - inspect and edit a catalog of geospatial configuration.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geocat_cli::{create_formatter, execute, Args, CliError};
use geocat_core::Catalog;

fn main() {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geocat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = args.into_config();
    tracing::debug!(
        data_path = %config.path.display(),
        cache_capacity = config.cache_capacity,
        "configuration loaded"
    );

    let catalog = Catalog::open(&config)?;
    let formatter = create_formatter(args.format);
    let output = execute(&catalog, &args.command, &*formatter)?;
    catalog.flush()?;

    println!("{}", output);
    Ok(())
}
