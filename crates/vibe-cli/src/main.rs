use std::path::PathBuf;
use std::process::ExitCode;
use vibe_cli::config::DEFAULT_CONFIG_PATH;
use vibe_cli::{cli, dispatch, logging, AppConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    logging::init_tracing(matches.get_flag("log-json"));

    let (config_path, required) = match matches.get_one::<PathBuf>("config") {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    let result = async {
        let config = AppConfig::load(&config_path, required)?.with_env(|name| std::env::var(name).ok());
        tracing::debug!("Using database {}", config.database_path.display());
        let mut stdout = std::io::stdout();
        dispatch(&matches, &config, &mut stdout).await
    }
    .await;

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
