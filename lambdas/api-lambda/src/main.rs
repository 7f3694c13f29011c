use lambda_http::{run, service_fn, Error, Request};
use std::sync::Arc;
use taskapi_shared::{AppState, Config, LogFormat};
use tracing_subscriber::EnvFilter;

mod http_handler;
use http_handler::function_handler;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        // CloudWatch adds its own timestamps
        .without_time();

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(false).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let state = Arc::new(AppState::from_config(config).await);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
