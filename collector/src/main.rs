use log::{error, info};
use std::process::ExitCode;
use youtube_stats::config::{init_logger, load_environment};
use youtube_stats::services::fetcher::ReqwestTransport;
use youtube_stats::services::secrets::{GhCliProvisioner, NoopProvisioner, SecretProvisioner};
use youtube_stats::{Config, Pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    load_environment();
    init_logger();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Tracking channel {}", config.channel_id);

    let provisioner: Box<dyn SecretProvisioner> = match &config.secret_repo {
        Some(repo) if !config.is_ci => Box::new(GhCliProvisioner::new(repo.clone())),
        _ => Box::new(NoopProvisioner),
    };

    let pipeline = Pipeline::new(config, ReqwestTransport::new(), provisioner);
    match pipeline.run().await {
        Ok(report) => {
            let s = &report.sample;
            let verb = if report.stored { "saved" } else { "fetched (not saved)" };
            println!(
                "Stats {verb}: Subscribers={}, Views={}, Videos={}, Playlists={}",
                s.subscribers, s.views, s.videos, s.playlists
            );
            if !report.warnings.is_empty() {
                info!("Run finished with {} warning(s)", report.warnings.len());
            }
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
