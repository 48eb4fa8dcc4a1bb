use clap::Parser;
use sharpline::cli::{self, Cli, Commands};

mod main_runtime;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Scan(_) | Commands::Market { .. } => {
            let logging = cli::load_config(&cli.global)
                .map(|c| c.logging)
                .unwrap_or_default();
            main_runtime::init_logging(&logging);
        }
        _ => main_runtime::init_logging_simple(),
    }

    if let Err(e) = cli::run(cli) {
        match e.downcast_ref::<sharpline::SharplineError>() {
            Some(err) => {
                let report = err.report();
                cli::output::print_error(&format!("{}: {}", report.error, report.message));
            }
            None => cli::output::print_error(&format!("{e:#}")),
        }
        std::process::exit(1);
    }
    Ok(())
}
