//! Integration tests for the Linode client using wiremock
//!
//! These tests verify the client and collection fetcher against mocked
//! endpoints, covering error envelopes, filters and pagination.

use lincloud::config::ApiSettings;
use lincloud::error::Error;
use lincloud::linode::LinodeClient;
use lincloud::resource::{build_filter, fetch_collection, ResourceFilter};
use serde_json::{json, Value};
use wiremock::matchers::{bearer_token, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer) -> LinodeClient {
    LinodeClient::new(&ApiSettings {
        api_token: "test-token".to_string(),
        api_url: server.uri(),
        api_version: "v4".to_string(),
        ua_prefix: Some("integration".to_string()),
        ca_path: None,
    })
    .expect("client should build")
}

/// Match the decoded `X-Filter` header; the raw JSON contains commas, which
/// wiremock's header matcher treats as value separators
fn x_filter(expected: Value) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |request: &Request| {
        request
            .headers
            .get("X-Filter")
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .is_some_and(|actual| actual == expected)
    }
}

/// Test module for HTTP client integration tests
mod http_client_tests {
    use super::*;

    /// Test successful GET request returns parsed JSON
    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/profile"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "ops",
                "email": "ops@example.com"
            })))
            .mount(&server)
            .await;

        let profile = client_for(&server).get("/profile").await.unwrap();
        assert_eq!(profile["username"], "ops");
    }

    /// Test 401 response surfaces the API error reasons
    #[tokio::test]
    async fn test_401_returns_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/profile"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "errors": [{"reason": "Invalid Token"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).get("/profile").await.unwrap_err();
        match err {
            Error::Api(api) => {
                assert_eq!(api.status, 401);
                assert_eq!(api.errors, vec!["Invalid Token".to_string()]);
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    /// Test field-level validation errors keep the field name
    #[tokio::test]
    async fn test_400_includes_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v4/domains"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errors": [{"reason": "soa_email is required", "field": "soa_email"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .post("/domains", Some(&json!({"domain": "example.com"})))
            .await
            .unwrap_err();
        assert!(err.has_status(400));
        assert!(err.to_string().contains("soa_email: soa_email is required"));
    }

    /// Test load maps 404 to NotFound
    #[tokio::test]
    async fn test_load_404_returns_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/domains/999"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"reason": "Not found"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).load("/domains/999").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref p) if p == "/domains/999"));
    }

    /// Test PUT sends the JSON body
    #[tokio::test]
    async fn test_put_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v4/profile/sshkeys/7"))
            .and(body_json(json!({"label": "renamed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "label": "renamed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let updated = client_for(&server)
            .put("/profile/sshkeys/7", &json!({"label": "renamed"}))
            .await
            .unwrap();
        assert_eq!(updated["label"], "renamed");
    }

    /// Test DELETE with an empty body yields null
    #[tokio::test]
    async fn test_delete_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v4/domains/1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).delete("/domains/1").await.unwrap();
        assert!(response.is_null());
    }

    /// Test the configured user agent prefix is sent
    #[tokio::test]
    async fn test_user_agent_prefix() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/regions"))
            .and(header(
                "user-agent",
                format!("integration lincloud/{}", env!("CARGO_PKG_VERSION")).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).get("/regions").await.unwrap();
    }
}

/// Test module for collection fetching
mod collection_tests {
    use super::*;

    /// Test every page is fetched and concatenated
    #[tokio::test]
    async fn test_fetch_collection_follows_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/domains"))
            .and(query_param("page", "1"))
            .and(query_param("page_size", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1}, {"id": 2}],
                "page": 1,
                "pages": 2,
                "results": 3
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v4/domains"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 3}],
                "page": 2,
                "pages": 2,
                "results": 3
            })))
            .mount(&server)
            .await;

        let items = fetch_collection(&client_for(&server), "/domains", None, None)
            .await
            .unwrap();
        let ids: Vec<u64> = items.iter().filter_map(|d| d["id"].as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    /// Test the limit stops pagination early
    #[tokio::test]
    async fn test_fetch_collection_respects_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v4/images"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
                "page": 1,
                "pages": 5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = fetch_collection(&client_for(&server), "/images", None, Some(2))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    /// Test filters are sent in the X-Filter header
    #[tokio::test]
    async fn test_filter_header() {
        let server = MockServer::start().await;

        let filter = build_filter(
            &[ResourceFilter::new("region", vec![json!("us-east")])],
            Some("label"),
            "desc",
        )
        .unwrap();

        Mock::given(method("GET"))
            .and(path("/v4/linode/instances"))
            .and(x_filter(filter.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1, "region": "us-east"}],
                "page": 1,
                "pages": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = fetch_collection(&client_for(&server), "/linode/instances", Some(&filter), None)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }
}
