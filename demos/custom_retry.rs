//! Configuring retry behavior.
//!
//! This example shows how to:
//! - Tune the default exponential backoff policy
//! - Disable retries entirely
//! - Choose how exhausted retries surface
//!
//! Run with: `cargo run --example custom_retry`

use courier::{
    ApiDescription, Courier, DefaultRetryer, Error, MethodDescription, NeverRetry,
    PropagationPolicy,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("courier=debug,custom_retry=info")
        .init();

    let api = ApiDescription::new("Httpbin")
        .method(MethodDescription::new("flaky", "GET /status/503"));

    println!("=== Tuned backoff ===");
    // Three attempts, 50 ms base period, capped at 500 ms. The policy is
    // cloned per call, so concurrent invocations never share attempt counts.
    let client = Courier::builder()
        .target("https://httpbin.org")?
        .retryer(DefaultRetryer::new(
            Duration::from_millis(50),
            Duration::from_millis(500),
            3,
        ))
        // Surface the classified cause instead of the retry wrapper.
        .propagation_policy(PropagationPolicy::Unwrap)
        .build(&api)?;

    match client.call::<serde_json::Value>("flaky", vec![]).await {
        Ok(value) => println!("unexpected success: {value}"),
        Err(e) => println!("gave up: {e}"),
    }

    println!("=== No retries ===");
    let client = Courier::builder()
        .target("https://httpbin.org")?
        .retryer(NeverRetry)
        .build(&api)?;

    match client.call::<serde_json::Value>("flaky", vec![]).await {
        Ok(value) => println!("unexpected success: {value}"),
        Err(e) => println!("failed fast: {e}"),
    }

    Ok(())
}
