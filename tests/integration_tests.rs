//! Integration tests using wiremock to simulate HTTP servers.

use courier::{
    ApiDescription, BasicAuthInterceptor, Courier, DefaultRetryer, Error, MethodDescription,
    Param, PropagationPolicy, ReturnKind, StatusKind,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn github_api() -> ApiDescription {
    ApiDescription::new("GitHub")
        .header("Accept: application/json")
        .method(
            MethodDescription::new("contributors", "GET /repos/{owner}/contributors")
                .param(Param::named("owner", "String")),
        )
}

async fn client_for(server: &MockServer, api: &ApiDescription) -> Courier {
    Courier::builder()
        .target(server.uri())
        .unwrap()
        .build(api)
        .unwrap()
}

#[tokio::test]
async fn end_to_end_contributors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/openfeign/contributors"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["octocat", "hubot"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, &github_api()).await;
    let contributors: Vec<String> = client
        .call("contributors", vec![json!("openfeign")])
        .await
        .unwrap();

    assert_eq!(contributors, vec!["octocat".to_string(), "hubot".to_string()]);
}

#[tokio::test]
async fn query_map_parameters_reach_the_wire() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = ApiDescription::new("Search").method(
        MethodDescription::new("search", "GET /search").param(Param::query_map("SearchFilters")),
    );
    let client = client_for(&mock_server, &api).await;
    let _: Vec<String> = client
        .call("search", vec![json!({"q": "rust", "page": 2})])
        .await
        .unwrap();
}

#[tokio::test]
async fn post_body_is_json_encoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(json!({"name": "alice"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "name": "alice"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = ApiDescription::new("Users").method(
        MethodDescription::new("create", "POST /users").param(Param::body("CreateUser")),
    );
    let client = client_for(&mock_server, &api).await;
    let created: serde_json::Value = client
        .call("create", vec![json!({"name": "alice"})])
        .await
        .unwrap();
    assert_eq!(created["id"], 7);
}

#[tokio::test]
async fn declared_body_template_fills_from_named_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/zones"))
        .and(body_string("{\"name\": \"denominator.io\"}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = ApiDescription::new("Dns").method(
        MethodDescription::new("create_zone", "POST /zones")
            .body("%7B\"name\": \"{name}\"%7D")
            .param(Param::named("name", "String")),
    );
    let client = client_for(&mock_server, &api).await;
    let _: serde_json::Value = client
        .call("create_zone", vec![json!("denominator.io")])
        .await
        .unwrap();
}

#[tokio::test]
async fn interceptor_adds_authorization_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/openfeign/contributors"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Courier::builder()
        .target(mock_server.uri())
        .unwrap()
        .interceptor(BasicAuthInterceptor::new("user", "pass"))
        .build(&github_api())
        .unwrap();
    let _: Vec<String> = client
        .call("contributors", vec![json!("openfeign")])
        .await
        .unwrap();
}

#[tokio::test]
async fn error_status_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/nobody/contributors"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, &github_api()).await;
    let result = client
        .call::<Vec<String>>("contributors", vec![json!("nobody")])
        .await;

    match result {
        Err(Error::Status { kind, status, .. }) => {
            assert_eq!(kind, StatusKind::NotFound);
            assert_eq!(status, 404);
        }
        other => panic!("expected classified 404, got {other:?}"),
    }
    let err = client
        .call::<Vec<String>>("contributors", vec![json!("nobody")])
        .await
        .unwrap_err();
    assert_eq!(err.body_text(), "Not found");
}

#[tokio::test]
async fn decode404_decodes_missing_as_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/ghost/contributors"))
        .respond_with(ResponseTemplate::new(404).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let client = Courier::builder()
        .target(mock_server.uri())
        .unwrap()
        .decode404(true)
        .build(&github_api())
        .unwrap();
    let contributors: Option<Vec<String>> = client
        .call("contributors", vec![json!("ghost")])
        .await
        .unwrap();
    assert_eq!(contributors, None);
}

#[tokio::test]
async fn deserialization_failure_is_a_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/openfeign/contributors"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, &github_api()).await;
    let err = client
        .call::<Vec<String>>("contributors", vec![json!("openfeign")])
        .await
        .unwrap_err();

    match err {
        Error::Decode { status, body, .. } => {
            assert_eq!(status, 200);
            assert_eq!(body.as_ref(), b"invalid json");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn unit_methods_skip_the_decoder() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/repos/stale"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = ApiDescription::new("Repos").method(
        MethodDescription::new("delete", "DELETE /repos/{name}")
            .param(Param::named("name", "String"))
            .returns(ReturnKind::Unit),
    );
    let client = client_for(&mock_server, &api).await;
    client.call_unit("delete", vec![json!("stale")]).await.unwrap();
}

#[tokio::test]
async fn retry_after_hint_drives_another_attempt() {
    let mock_server = MockServer::start().await;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    Mock::given(method("GET"))
        .and(path("/repos/openfeign/contributors"))
        .respond_with(move |_req: &wiremock::Request| {
            if attempts_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(503)
                    .insert_header("Retry-After", "0")
                    .set_body_string("maintenance")
            } else {
                ResponseTemplate::new(200).set_body_json(json!(["octocat"]))
            }
        })
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, &github_api()).await;
    let contributors: Vec<String> = client
        .call("contributors", vec![json!("openfeign")])
        .await
        .unwrap();

    assert_eq!(contributors, vec!["octocat".to_string()]);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_retries_unwrap_to_the_classified_cause() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/openfeign/contributors"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("Retry-After", "0")
                .set_body_string("still down"),
        )
        .mount(&mock_server)
        .await;

    let api = github_api();
    let build = |policy| {
        Courier::builder()
            .target(mock_server.uri())
            .unwrap()
            .retryer(DefaultRetryer::new(
                Duration::from_millis(1),
                Duration::from_millis(5),
                2,
            ))
            .propagation_policy(policy)
            .build(&api)
            .unwrap()
    };

    let wrapped = build(PropagationPolicy::Wrap)
        .call::<Vec<String>>("contributors", vec![json!("openfeign")])
        .await
        .unwrap_err();
    assert!(matches!(wrapped, Error::Retryable { .. }));
    assert_eq!(wrapped.kind(), Some(StatusKind::ServiceUnavailable));

    let unwrapped = build(PropagationPolicy::Unwrap)
        .call::<Vec<String>>("contributors", vec![json!("openfeign")])
        .await
        .unwrap_err();
    match unwrapped {
        Error::Status { kind, status, .. } => {
            assert_eq!(kind, StatusKind::ServiceUnavailable);
            assert_eq!(status, 503);
        }
        other => panic!("expected unwrapped classified error, got {other:?}"),
    }
}

#[tokio::test]
async fn class_and_method_headers_reach_the_wire() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("Accept", "application/xml"))
        .and(header("X-Ratelimit-Scope", "client"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"<feed/>\""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = ApiDescription::new("Feed")
        .header("Accept: application/json")
        .header("X-Ratelimit-Scope: client")
        .method(MethodDescription::new("feed", "GET /feed").header("Accept: application/xml"));
    let client = client_for(&mock_server, &api).await;
    let _: String = client.call("feed", vec![]).await.unwrap();
}
