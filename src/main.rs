use clap::Parser;
use linkedread_tools::cli;
use linkedread_tools::commands;
use linkedread_tools::commands::molecules::MoleculeOptions;
use linkedread_tools::config::Config;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Warnings by default; each `-v` lowers the threshold one level.
fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_logging(verbose: u8) {
    let level = log_level(verbose);

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init(),
    };
}

fn main() {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let result = match args.command {
        cli::Commands::Molecules(molecule_args) => {
            let options = MoleculeOptions::resolve(molecule_args, &Config::load());
            commands::molecules::run(&options).map(|_| ())
        }
        cli::Commands::Config { save } => commands::config::run(save),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
