use cwl_es_shipper::{handle_logs, LogsEvent, RuntimeError};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    // Get AWS Configuration, credentials are refreshed by the provider
    let config = aws_config::load_from_env().await;
    let credentials = config
        .credentials_provider()
        .cloned()
        .ok_or(RuntimeError::MissingCredentials)?;

    let http = reqwest::Client::new();

    run(service_fn(|event: LambdaEvent<LogsEvent>| {
        handle_logs(&credentials, &http, event)
    }))
    .await
}
