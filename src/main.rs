use firehose_transformer::clock::SystemClock;
use firehose_transformer::config;
use firehose_transformer::events::FirehoseEvent;
use firehose_transformer::process::RecordTransformer;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    firehose_transformer::set_up_logging();

    info!(
        "Initializing {} version {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = config::Config::load_from_env()?;
    let transformer = RecordTransformer::new(config.rule_set.rules(), SystemClock);
    info!(
        "rule set {} with rules {:?}",
        config.rule_set,
        transformer.rules()
    );

    run(service_fn(|request: LambdaEvent<FirehoseEvent>| {
        firehose_transformer::handler(&transformer, request)
    }))
    .await
}
