//! Working with classified errors.
//!
//! This example shows how to:
//! - Match on the status-keyed error taxonomy
//! - Inspect captured response bytes
//! - Distinguish decode failures from HTTP errors
//!
//! Run with: `cargo run --example error_handling`

use courier::{ApiDescription, Courier, Error, MethodDescription, Param, StatusKind};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("courier=debug,error_handling=info")
        .init();

    let github = ApiDescription::new("GitHub")
        .header("Accept: application/vnd.github.v3+json")
        .header("User-Agent: courier-example")
        .method(
            MethodDescription::new("contributors", "GET /repos/{owner}/{repo}/contributors")
                .param(Param::named("owner", "String"))
                .param(Param::named("repo", "String")),
        );

    let client = Courier::builder()
        .target("https://api.github.com")?
        .build(&github)?;

    println!("Now, let's cause an error.");
    let result = client
        .call::<Vec<serde_json::Value>>(
            "contributors",
            vec![json!("openfeign"), json!("some-unknown-project")],
        )
        .await;

    match result {
        Ok(contributors) => println!("unexpectedly found {} contributors", contributors.len()),
        Err(Error::Status {
            kind: StatusKind::NotFound,
            status,
            body,
            ..
        }) => {
            println!("repository does not exist (status {status})");
            println!("server said: {}", String::from_utf8_lossy(&body));
        }
        Err(Error::Status { kind, status, .. }) => {
            println!("HTTP error {status} classified as {kind:?}");
        }
        Err(Error::Decode { status, message, .. }) => {
            println!("response (status {status}) did not match the expected shape: {message}");
        }
        Err(e) => println!("call failed: {e}"),
    }

    Ok(())
}
