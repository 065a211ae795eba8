//! Integration tests for the admin API client using wiremock
//!
//! These tests drive the real reqwest transport against mocked endpoints,
//! covering pagination, caching, invalidation and error reporting.

use kong_admin::{AdminApi, Config, KongError, MutationParams, Route};
use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, page_size: Option<usize>) -> Config {
    Config {
        host: server.uri(),
        page_size,
        ..Config::default()
    }
}

fn client(server: &MockServer, page_size: Option<usize>) -> AdminApi {
    AdminApi::connect(&config_for(server, page_size)).expect("client should build")
}

/// Pagination behavior of collection reads
mod pagination_tests {
    use super::*;

    /// Full first page follows the next link and concatenates in order
    #[tokio::test]
    async fn test_follows_next_link() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis"))
            .and(query_param("size", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 1}, {"id": 2}, {"id": 3}],
                "next": "/apis?offset=page2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/apis"))
            .and(query_param("offset", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 4}, {"id": 5}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let apis = client(&server, Some(3)).fetch_apis().await.expect("fetch should succeed");

        let ids: Vec<i64> = apis.iter().map(|a| a["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    /// Short first page ends the walk even with a next link
    #[tokio::test]
    async fn test_short_page_does_not_follow_next() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/upstreams"))
            .and(query_param("size", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "u1"}, {"id": "u2"}],
                "next": "/upstreams?offset=page2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/upstreams"))
            .and(query_param("offset", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(0)
            .mount(&server)
            .await;

        let upstreams = client(&server, Some(3))
            .fetch_upstreams()
            .await
            .expect("fetch should succeed");

        assert_eq!(upstreams.len(), 2);
    }

    /// Without a page size no size parameter is sent
    #[tokio::test]
    async fn test_no_page_size_omits_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/plugins"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"name": "cors"}]
            })))
            .mount(&server)
            .await;

        let plugins = client(&server, None)
            .fetch_global_plugins()
            .await
            .expect("fetch should succeed");
        assert_eq!(plugins.len(), 1);

        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query().is_none());
    }

    /// Non-paginated bodies come back untouched
    #[tokio::test]
    async fn test_plain_body_is_returned_verbatim() {
        let server = MockServer::start().await;
        let body = json!({"version": "0.11.2", "tagline": "Welcome to kong"});

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let value = client(&server, Some(100))
            .fetch_route(&Route::Root)
            .await
            .expect("fetch should succeed");

        assert_eq!(value, body);
    }
}

/// Error reporting
mod error_tests {
    use super::*;

    /// 404 carries the target and status
    #[tokio::test]
    async fn test_404_returns_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis/missing/plugins"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not found"})))
            .mount(&server)
            .await;

        let err = client(&server, Some(100))
            .fetch_plugins("missing")
            .await
            .expect_err("fetch should fail");

        match err {
            KongError::Http { target, status, status_text } => {
                assert_eq!(status, 404);
                assert_eq!(status_text, "Not Found");
                assert_eq!(target.as_url().path(), "/apis/missing/plugins");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Failure on a later page discards the earlier pages
    #[tokio::test]
    async fn test_500_on_second_page_fails_whole_read() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/consumers"))
            .and(query_param("size", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"username": "alice"}],
                "next": "/consumers?offset=2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/consumers"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server, Some(1))
            .fetch_consumers()
            .await
            .expect_err("fetch should fail");

        assert_eq!(err.status(), Some(500));
    }

    /// Malformed JSON surfaces as a decode error
    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/upstreams"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = client(&server, Some(10))
            .fetch_upstreams()
            .await
            .expect_err("fetch should fail");

        assert!(matches!(err, KongError::Decode { .. }));
    }

    /// Unreachable server surfaces as a transport error
    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = Config {
            host: "127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let api = AdminApi::connect(&config).expect("client should build");

        let err = api.fetch_apis().await.expect_err("fetch should fail");
        assert!(matches!(err, KongError::Transport { .. }));
    }
}

/// Request cache and mutation gateway
mod cache_tests {
    use super::*;

    /// Second read of the same target is served from cache
    #[tokio::test]
    async fn test_repeated_read_hits_server_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/upstreams/u1/targets/active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"target": "10.0.0.1:80", "weight": 100}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, Some(100));
        let first = api.fetch_targets("u1").await.expect("fetch should succeed");
        let second = api.fetch_targets("u1").await.expect("fetch should succeed");

        assert_eq!(first, second);
    }

    /// A mutation forces the next read back to the server
    #[tokio::test]
    async fn test_mutation_invalidates_cached_read() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/apis"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({"name": "mockbin", "upstream_url": "http://mockbin.org"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "new-api"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, Some(100));
        api.fetch_apis().await.expect("fetch should succeed");
        api.fetch_apis().await.expect("fetch should succeed");

        let params = MutationParams::new(Method::POST)
            .with_body(json!({"name": "mockbin", "upstream_url": "http://mockbin.org"}));
        let response = api
            .request_endpoint(&Route::Apis, params)
            .await
            .expect("request should complete");

        assert_eq!(response.status, 201);
        assert!(response.is_success());

        api.fetch_apis().await.expect("fetch should succeed");
    }

    /// Body-less mutations send no content type
    #[tokio::test]
    async fn test_delete_without_body() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/consumers/bob"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, Some(100));
        let response = api
            .request_endpoint(
                &Route::Consumer { consumer_id: "bob".to_string() },
                MutationParams::new(Method::DELETE),
            )
            .await
            .expect("request should complete");

        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());

        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests[0].headers.get("content-type").is_none());
        assert_eq!(requests[0].headers.get("accept").unwrap(), "application/json");
    }

    /// Rejected mutations are returned raw, not as errors
    #[tokio::test]
    async fn test_rejected_mutation_returns_response() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/apis/a1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"name": "already exists"})))
            .mount(&server)
            .await;

        let api = client(&server, Some(100));
        let response = api
            .request_endpoint(
                &Route::Api { api_id: "a1".to_string() },
                MutationParams::new(Method::PATCH).with_body(json!({"name": "dup"})),
            )
            .await
            .expect("request should complete");

        assert_eq!(response.status, 409);
        assert_eq!(response.status_text, "Conflict");
    }

    /// Ignored consumers never reach the server
    #[tokio::test]
    async fn test_ignore_consumers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/consumers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "c"}]})))
            .expect(0)
            .mount(&server)
            .await;

        let config = Config {
            ignore_consumers: true,
            ..config_for(&server, Some(100))
        };
        let api = AdminApi::connect(&config).expect("client should build");

        assert!(api.fetch_consumers().await.expect("fetch should succeed").is_empty());
    }
}

/// Permanent caches
mod metadata_tests {
    use super::*;
    use std::sync::Arc;

    /// Schemas are fetched once per enabled plugin, then reused
    #[tokio::test]
    async fn test_plugin_schemas_cached_for_client_lifetime() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/plugins/enabled"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "enabled_plugins": {"key-auth": true, "rate-limiting": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/plugins/schema/key-auth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fields": {"key_names": {"type": "array"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/plugins/schema/rate-limiting"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fields": {"minute": {"type": "number"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, Some(100));
        let first = api.fetch_plugin_schemas().await.expect("schemas should load");

        // a mutation does not reset permanent caches
        Mock::given(method("DELETE"))
            .and(path("/plugins/p1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        api.request_endpoint(&Route::Plugin { plugin_id: "p1".to_string() }, MutationParams::new(Method::DELETE))
            .await
            .expect("request should complete");

        let second = api.fetch_plugin_schemas().await.expect("schemas should load");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.names().collect::<Vec<_>>(), vec!["key-auth", "rate-limiting"]);
        assert_eq!(first.get("rate-limiting").unwrap()["minute"]["type"], "number");
    }

    /// One failing schema leaves nothing cached
    #[tokio::test]
    async fn test_failed_schema_fetch_caches_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/plugins/enabled"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "enabled_plugins": ["acl", "jwt"]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/plugins/schema/acl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fields": {}})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/plugins/schema/jwt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let api = client(&server, Some(100));
        let err = api.fetch_plugin_schemas().await.expect_err("schemas should fail");

        assert_eq!(err.status(), Some(503));
        assert!(api.cache().plugin_schemas().await.is_none());
    }

    /// Version is read from the root endpoint once
    #[tokio::test]
    async fn test_version_fetched_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "0.13.0rc1"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, Some(100));
        let version = api.fetch_kong_version().await.expect("version should load");
        let again = api.fetch_kong_version().await.expect("version should load");

        assert_eq!(version, again);
        assert_eq!((version.major, version.minor, version.patch), (0, 13, 0));
        assert_eq!(version.pre.as_deref(), Some("rc1"));
    }
}
