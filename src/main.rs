use anyhow::Result;
use clap::Parser;
use doppler_bootstrap::cli::{check_secrets, run_command, Cli, Commands};
use doppler_bootstrap::config::Config;
use doppler_bootstrap::logging;
use std::path::PathBuf;

// Single-threaded scheduler: no other task runs while secrets are written
// into the process environment.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match cli.command {
        Commands::Run(opts) => {
            let config = load_config(opts.fallback_file);
            let code = run_command(&config, &opts.command).await?;
            std::process::exit(code);
        }
        Commands::Check(opts) => {
            let config = load_config(opts.fallback_file);
            let report = check_secrets(&config).await?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.to_text());
            }
        }
        Commands::Version => {
            println!("doppler-bootstrap {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load_config(fallback_file: Option<PathBuf>) -> Config {
    let config = Config::from_env();
    match fallback_file {
        Some(path) => config.with_fallback_file_path(path),
        None => config,
    }
}
