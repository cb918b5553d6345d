use lambda_runtime::{Error, LambdaEvent};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::clock::Clock;
use crate::events::{FirehoseEvent, FirehoseResponse};
use crate::process::RecordTransformer;

pub mod clock;
pub mod config;
pub mod events;
pub mod process;
pub mod transform;

pub fn set_up_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();
}

// lambda handler
pub async fn handler<C: Clock>(
    transformer: &RecordTransformer<C>,
    evt: LambdaEvent<FirehoseEvent>,
) -> Result<FirehoseResponse, Error> {
    info!("Handling lambda invocation");
    debug!("Handling event: {:?}", evt);

    // per-record failures are reported in the response, never as an invocation error
    Ok(transformer.transform_firehose_event(&evt.payload))
}
