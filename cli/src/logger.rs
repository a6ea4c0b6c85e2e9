use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use std::sync::OnceLock;

/// Logging is off by default, the CLI speaks through progress lines instead
///
/// RUST_LOG enables the usual env_logger levels, and the bridge routes every
/// record through the progress display so a log line never tears a spinner.
pub struct Logger {
    multi_progress: MultiProgress,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

impl<'a> Logger {
    pub fn init() -> &'a Self {
        LOGGER.get_or_init(|| {
            let logger = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("off"),
            )
            .build();

            let level = logger.filter();
            let multi_progress = MultiProgress::new();

            // A second init in the same process only loses the bridge,
            // records still reach the first logger
            let _ = LogWrapper::new(multi_progress.clone(), logger).try_init();
            log::set_max_level(level);

            Self { multi_progress }
        })
    }

    pub fn multi_progress() -> &'a MultiProgress {
        &Self::init().multi_progress
    }
}
