use clap::Parser;
use std::process::ExitCode;
use wa_bulk_lib::config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = wa_bulk_lib::logging::init_logging(&cli.log_level, cli.log_format) {
        eprintln!("{}", e);
    }

    match wa_bulk_lib::run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
