//! Service container for dependency injection.
//!
//! The ServiceContainer builds the scheduler, dispatcher, status reporter,
//! conversion pipeline and update handler, and manages their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::bot::{UpdateHandler, UpdatePoller, UpdateSource};
use crate::config::AppConfig;
use crate::locale::LocaleService;
use crate::pipeline::{ConversionPipeline, FfmpegConverter, GifPipeline};
use crate::scheduler::{DispatchEvent, Dispatcher, Scheduler, StatusReporter};
use crate::telegram::{TelegramBot, Transport};

/// Default shutdown timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Service container holding all application services.
pub struct ServiceContainer {
    pub config: Arc<AppConfig>,
    pub locales: Arc<LocaleService>,
    pub scheduler: Arc<Scheduler>,
    pub dispatcher: Arc<Dispatcher>,
    pub reporter: Arc<StatusReporter>,
    pub handler: Arc<UpdateHandler>,
    poller: UpdatePoller,
    /// Cancellation token for graceful shutdown.
    cancellation_token: CancellationToken,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceContainer {
    /// Wire the production services around a connected bot.
    pub fn new(config: AppConfig, bot: Arc<TelegramBot>) -> Result<Self> {
        let locales = Arc::new(LocaleService::new());
        let converter = FfmpegConverter::new(
            &config.processing.ffmpeg_path,
            &config.processing.ffprobe_path,
            config.gif.clone(),
        );
        let pipeline = Arc::new(GifPipeline::new(
            bot.clone(),
            locales.clone(),
            converter,
            bot.http_client().clone(),
            config.pipeline_limits(),
        ));

        Self::with_components(config, bot.clone(), bot, pipeline, locales)
    }

    /// Wire the services around arbitrary transport, update source and pipeline.
    pub fn with_components(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        source: Arc<dyn UpdateSource>,
        pipeline: Arc<dyn ConversionPipeline>,
        locales: Arc<LocaleService>,
    ) -> Result<Self> {
        info!("Initializing service container");

        let scheduler = Arc::new(Scheduler::with_capacity(config.processing.max_concurrent)?);
        let dispatcher = Dispatcher::new(scheduler.clone(), pipeline);
        let reporter = Arc::new(StatusReporter::new(
            scheduler.clone(),
            transport.clone(),
            locales.clone(),
            config.status_interval(),
        ));
        let handler = Arc::new(UpdateHandler::new(
            transport,
            dispatcher.clone(),
            locales.clone(),
        ));
        let poller = UpdatePoller::new(source, handler.clone(), config.bot.poll_timeout_secs);

        info!(
            capacity = scheduler.capacity(),
            status_interval = ?config.status_interval(),
            "Service container initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            locales,
            scheduler,
            dispatcher,
            reporter,
            handler,
            poller,
            cancellation_token: CancellationToken::new(),
            background: Mutex::new(Vec::new()),
        })
    }

    /// Start background services: the status reporter and a dispatch event logger.
    pub fn start(&self) {
        let reporter = self
            .reporter
            .clone()
            .start(self.cancellation_token.clone());

        let mut receiver = self.dispatcher.subscribe();
        let cancellation_token = self.cancellation_token.clone();
        let events = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        debug!("Dispatch event handler shutting down");
                        break;
                    }
                    result = receiver.recv() => {
                        match result {
                            Ok(DispatchEvent::Promoted { task_id, after }) => {
                                debug!(task_id = %task_id, after = %after, "Task promoted");
                            }
                            Ok(_) => {}
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                                debug!(skipped = n, "Dispatch event handler lagged");
                            }
                            Err(_) => break,
                        }
                    }
                }
            }
        });

        let mut background = self.background.lock();
        background.push(reporter);
        background.push(events);
        info!("Services started");
    }

    /// Poll for updates until shutdown is requested.
    pub async fn run(&self) -> u64 {
        self.poller.run(self.cancellation_token.clone()).await
    }

    /// Shutdown all services gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Shutdown all services gracefully with a custom timeout.
    ///
    /// Stops intake and the reporter, then waits for running conversions
    /// (including promoted ones) for at most `timeout`.
    pub async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        info!("Shutting down services (timeout: {:?})", timeout);

        self.cancellation_token.cancel();

        let handles: Vec<_> = self.background.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }

        if !self.dispatcher.shutdown(timeout).await {
            warn!("Shutdown timeout reached, abandoning running conversions");
        }

        info!("Services shut down");
        Ok(())
    }

    /// Get the cancellation token for external use.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Check if shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn stats(&self) -> ServiceStats {
        let total = self.scheduler.total_count();
        let running = self.scheduler.active_count();
        ServiceStats {
            capacity: self.scheduler.capacity(),
            running,
            waiting: total.saturating_sub(running),
            in_flight: self.dispatcher.in_flight(),
        }
    }
}

/// Service statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStats {
    pub capacity: usize,
    pub running: usize,
    pub waiting: usize,
    /// Pipeline runs not yet finished.
    pub in_flight: usize,
}
