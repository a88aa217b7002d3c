//! End-to-end example against the public GitHub API.
//!
//! This example shows how to:
//! - Describe an API declaratively
//! - Compile the description into a client
//! - Invoke methods by name with positional arguments
//!
//! Run with: `cargo run --example github`

use courier::{ApiDescription, Courier, Error, MethodDescription, Param};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Contributor {
    login: String,
    contributions: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("courier=debug,github=info")
        .init();

    // Describe the slice of the GitHub API we need.
    let github = ApiDescription::new("GitHub")
        .header("Accept: application/vnd.github.v3+json")
        .header("User-Agent: courier-example")
        .method(
            MethodDescription::new("contributors", "GET /repos/{owner}/{repo}/contributors")
                .param(Param::named("owner", "String"))
                .param(Param::named("repo", "String")),
        );

    // Compile it once into a client.
    let client = Courier::builder()
        .target("https://api.github.com")?
        .build(&github)?;

    println!("Let's fetch and print a list of the contributors to this org.");
    let contributors: Vec<Contributor> = client
        .call("contributors", vec![json!("openfeign"), json!("feign")])
        .await?;

    for contributor in contributors {
        println!("{} ({} contributions)", contributor.login, contributor.contributions);
    }

    Ok(())
}
