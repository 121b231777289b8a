use crate::config::{Config, SECRET_NAME};
use crate::error::Result;
use crate::models::{IntegrityVerdict, MetricSample};
use crate::services::backup::BackupRotator;
use crate::services::charts::render_charts;
use crate::services::fetcher::{HttpTransport, RetryPolicy, RetryingFetcher};
use crate::services::history_store::HistoryStore;
use crate::services::integrity;
use crate::services::report::render_file;
use crate::services::secrets::SecretProvisioner;
use crate::services::youtube_service::YouTubeClient;
use chrono::NaiveDateTime;
use log::{error, info, warn};
use std::fmt;
use std::path::PathBuf;

/// Steps of a run, in order. Only `Start` and the fetches can end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    FetchChannel,
    FetchPlaylists,
    Backup,
    Append,
    IntegrityCheck,
    Render,
    Visualize,
    Provision,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::FetchChannel => "fetch-channel",
            Stage::FetchPlaylists => "fetch-playlists",
            Stage::Backup => "backup",
            Stage::Append => "append",
            Stage::IntegrityCheck => "integrity-check",
            Stage::Render => "render",
            Stage::Visualize => "visualize",
            Stage::Provision => "provision",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a successful run did. `warnings` lists every best-effort step that failed.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sample: MetricSample,
    /// False when the sample could not be appended to the history log.
    pub stored: bool,
    pub backup: Option<PathBuf>,
    pub removed_backups: Vec<PathBuf>,
    pub verdict: Option<IntegrityVerdict>,
    pub charts: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl RunReport {
    fn new(sample: MetricSample) -> Self {
        RunReport {
            sample,
            stored: false,
            backup: None,
            removed_backups: Vec::new(),
            verdict: None,
            charts: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

pub struct Pipeline<T> {
    config: Config,
    youtube: YouTubeClient<T>,
    store: HistoryStore,
    backups: BackupRotator,
    provisioner: Box<dyn SecretProvisioner>,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl<T: HttpTransport> Pipeline<T> {
    pub fn new(config: Config, transport: T, provisioner: Box<dyn SecretProvisioner>) -> Self {
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            initial_delay: config.initial_delay,
            timeout: config.request_timeout,
        };
        let youtube = YouTubeClient::new(
            RetryingFetcher::new(transport, policy),
            config.api_base.clone(),
            config.api_key.clone(),
        );

        Pipeline {
            store: HistoryStore::new(&config.history_path),
            backups: BackupRotator::new(&config.backup_dir, config.backup_keep),
            youtube,
            provisioner,
            clock: local_now,
            config,
        }
    }

    /// Replaces the wall clock used to timestamp samples.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self) -> Result<RunReport> {
        let result = self.execute().await;
        if let Err(e) = &result {
            enter(Stage::Failed);
            error!("{e}");
        }
        result
    }

    async fn execute(&self) -> Result<RunReport> {
        enter(Stage::Start);
        let _lock = self.store.lock()?;
        let now = (self.clock)();

        enter(Stage::FetchChannel);
        let stats = self
            .youtube
            .channel_statistics(&self.config.channel_id)
            .await?;

        enter(Stage::FetchPlaylists);
        let playlists = self.youtube.playlist_count(&self.config.channel_id).await?;

        let sample = MetricSample::new(now, &stats, playlists);
        let mut report = RunReport::new(sample.clone());

        enter(Stage::Backup);
        match self.backups.snapshot(self.store.path(), sample.timestamp) {
            Ok(outcome) => {
                report.backup = outcome.created;
                report.removed_backups = outcome.removed;
            }
            Err(e) => report.warn(format!("Backup failed, continuing without one: {e}")),
        }

        enter(Stage::Append);
        match self.store.append(&sample) {
            Ok(()) => {
                report.stored = true;
                info!(
                    "Appended sample to {}: {}",
                    self.store.path().display(),
                    sample.formatted_timestamp()
                );
            }
            Err(e) => report.warn(format!("Sample not stored: {e}")),
        }

        enter(Stage::IntegrityCheck);
        let history = match self.store.read_all() {
            Ok(history) => Some(history),
            Err(e) => {
                report.warn(format!("Could not read back history: {e}"));
                None
            }
        };
        // without the new row the last two samples say nothing about this run
        if let Some(history) = history.as_ref().filter(|_| report.stored) {
            let verdict = integrity::check(history, self.config.integrity_threshold);
            match &verdict.message {
                Some(message) if !verdict.passed => {
                    report.warn(format!("Integrity check failed: {message}"))
                }
                _ => info!("Integrity check passed ({} samples)", history.len()),
            }
            report.verdict = Some(verdict);
        }

        enter(Stage::Render);
        match render_file(&self.config.template_path, &self.config.report_path, &sample) {
            Ok(()) => info!("Rendered {}", self.config.report_path.display()),
            Err(e) => report.warn(format!("Report not rendered: {e}")),
        }

        if let (Some(dir), Some(history)) = (&self.config.chart_dir, &history) {
            enter(Stage::Visualize);
            match render_charts(history, dir) {
                Ok(charts) => report.charts = charts,
                Err(e) => report.warn(format!("Charts not rendered: {e}")),
            }
        }

        if !self.config.is_ci {
            enter(Stage::Provision);
            if let Err(e) = self.provisioner.provision(SECRET_NAME, &self.config.api_key) {
                report.warn(format!(
                    "Secret provisioning via {} failed: {e}",
                    self.provisioner.name()
                ));
            }
        }

        enter(Stage::Done);
        Ok(report)
    }
}

fn enter(stage: Stage) {
    info!("stage: {stage}");
}
