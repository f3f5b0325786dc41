pub mod fetcher;
pub mod image;
pub mod logging;
pub mod pipeline;
pub mod rate_limiter;
pub mod scheduler;

pub use fetcher::{FetcherConfig, GuardianFetcher, GUARDIAN_API_URL};
pub use image::HtmlImageResolver;
pub use logging::Logger;
pub use pipeline::{BatchOutcome, CategoryReport, CycleReport, IngestionPipeline, PipelineConfig};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use scheduler::{Scheduler, SchedulerHandle, DEFAULT_INTERVAL};

pub mod prelude {
    pub use super::{
        FetcherConfig, GuardianFetcher, HtmlImageResolver, IngestionPipeline, PipelineConfig, RateLimiter,
        RateLimiterConfig, Scheduler,
    };
    pub use fnd_core::{Error, Result};
}
