//! HTTP-level tests against a mock Chat API and OAuth2 token endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gchat_output::{
    Batch, ChatClient, ChatError, ClientOptions, Event, GoogleChatClient, GoogleChatOutput,
    MessageParams, OutputConfig, StaticCredentials,
};

const TEST_KEY: &str = include_str!("fixtures/test_rsa_key.pem");

fn event(space: &str, message: &str) -> Event {
    let record = json!({"space": space, "message": message});
    Event::new("test", 1_388_613_600, record.as_object().cloned().unwrap())
}

fn routed_config(endpoint: &str, keyfile: &str) -> OutputConfig {
    let raw = format!(
        "space = \"%s\"\nspace_keys = \"space\"\nkeyfile = \"{keyfile}\"\nendpoint = \"{endpoint}\"\n"
    );
    OutputConfig::from_toml_str(&raw).unwrap()
}

fn static_output(server: &MockServer) -> GoogleChatOutput {
    GoogleChatOutput::with_credentials(
        &routed_config(&server.uri(), "unused.json"),
        Arc::new(StaticCredentials::new("ya29.static")),
    )
    .unwrap()
}

fn client(endpoint: &str, timeout: Duration) -> GoogleChatClient {
    GoogleChatClient::new(
        Arc::new(StaticCredentials::new("ya29.static")),
        &ClientOptions {
            endpoint: endpoint.to_string(),
            https_proxy: None,
            request_timeout: timeout,
        },
    )
    .unwrap()
}

async fn mount_space(server: &MockServer, space: &str, status: u16, calls: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/v1/spaces/{space}/messages")))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(json!({"name": format!("spaces/{space}/messages/1")})),
        )
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn posts_text_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/space1/messages"))
        .and(header("Authorization", "Bearer ya29.static"))
        .and(body_json(json!({"text": "sowawa1\nsowawa2\n"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "spaces/space1/messages/9"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sent = client(&server.uri(), Duration::from_secs(5))
        .send(&MessageParams::new("space1", "sowawa1\nsowawa2\n"))
        .await
        .unwrap();
    assert_eq!(sent.name.as_deref(), Some("spaces/space1/messages/9"));
}

#[tokio::test]
async fn space_ids_stay_inside_the_messages_resource() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    let c = client(&server.uri(), Duration::from_secs(5));

    for space in ["#test", "a?b", "../x", "../../v2/x", "spaces/x y"] {
        c.send(&MessageParams::new(space, "x\n")).await.unwrap();
    }

    let received: Vec<(String, Option<String>)> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| (r.url.path().to_string(), r.url.query().map(str::to_string)))
        .collect();
    assert_eq!(
        received,
        vec![
            ("/v1/spaces/%23test/messages".to_string(), None),
            ("/v1/spaces/a%3Fb/messages".to_string(), None),
            ("/v1/spaces/..%2Fx/messages".to_string(), None),
            ("/v1/spaces/..%2F..%2Fv2%2Fx/messages".to_string(), None),
            ("/v1/spaces/x%20y/messages".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn dot_segment_space_is_discarded_without_a_request() {
    let server = MockServer::start().await;
    mount_space(&server, "ok", 200, 1).await;

    let batch: Batch = vec![event("..", "a"), event("ok", "b")].into_iter().collect();
    let report = static_output(&server).dispatch(&batch).await.unwrap();
    assert_eq!(report.discarded, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let server = MockServer::start().await;
    mount_space(&server, "unauthorized", 401, 1).await;
    mount_space(&server, "forbidden", 403, 1).await;
    mount_space(&server, "missing", 404, 1).await;
    mount_space(&server, "broken", 500, 1).await;
    let c = client(&server.uri(), Duration::from_secs(5));

    for (space, kind, status) in [
        ("unauthorized", "auth", 401),
        ("forbidden", "auth", 403),
        ("missing", "destination", 404),
        ("broken", "api", 500),
    ] {
        let err = c.send(&MessageParams::new(space, "x\n")).await.unwrap_err();
        assert_eq!(err.kind(), kind, "space {space}");
        assert!(!err.is_transient());
        assert_eq!(err.failure().map(|f| f.status), Some(status));
    }
}

#[tokio::test]
async fn error_text_carries_request_but_not_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let err = client(&server.uri(), Duration::from_secs(5))
        .send(&MessageParams::new("space1", "hello\n"))
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("res.code:500"), "{text}");
    assert!(text.contains("res.body:backend error"), "{text}");
    assert!(text.contains("req_params:"), "{text}");
    assert!(text.contains("space1"), "{text}");
    assert!(!text.contains("ya29.static"), "{text}");
}

#[tokio::test]
async fn failed_space_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    mount_space(&server, "space1", 200, 1).await;
    mount_space(&server, "space2", 404, 1).await;
    mount_space(&server, "space3", 200, 1).await;

    let batch: Batch = vec![
        event("space1", "a"),
        event("space2", "b"),
        event("space3", "c"),
        event("space1", "d"),
    ]
    .into_iter()
    .collect();

    let report = static_output(&server).dispatch(&batch).await.unwrap();
    assert_eq!(report.events, 4);
    assert_eq!(report.payloads, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.discarded, 1);
}

#[tokio::test]
async fn timeout_is_returned_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/slow/messages"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = client(&server.uri(), Duration::from_millis(200))
        .send(&MessageParams::new("slow", "x\n"))
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.kind(), "timeout");
}

#[tokio::test]
async fn transport_failure_aborts_dispatch() {
    // Reserve a port and release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let output = GoogleChatOutput::with_credentials(
        &routed_config(&endpoint, "unused.json"),
        Arc::new(StaticCredentials::new("ya29.static")),
    )
    .unwrap();
    let batch: Batch = vec![event("space1", "a"), event("space2", "b")]
        .into_iter()
        .collect();

    let err = output.dispatch(&batch).await.unwrap_err();
    assert!(matches!(err, ChatError::Transport { .. }));
}

#[tokio::test]
async fn write_accepts_json_lines_chunk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/space1/messages"))
        .and(body_json(json!({"text": "sowawa1\nsowawa2\n"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let chunk = concat!(
        "[\"test\",1388613600,{\"space\":\"space1\",\"message\":\"sowawa1\"}]\n",
        "[\"test\",1388613601,{\"space\":\"space1\",\"message\":\"sowawa2\"}]\n",
    );
    let report = static_output(&server).write(chunk.as_bytes()).await.unwrap();
    assert_eq!(report.delivered, 1);
}

fn write_keyfile(dir: &tempfile::TempDir, token_uri: &str) -> String {
    let key = json!({
        "type": "service_account",
        "client_email": "relay@project.iam.gserviceaccount.com",
        "private_key_id": "0123456789abcdef",
        "private_key": TEST_KEY,
        "token_uri": token_uri,
    });
    let path = dir.path().join("service-account.json");
    std::fs::write(&path, key.to_string()).unwrap();
    path.to_string_lossy().into_owned()
}

async fn mount_token(server: &MockServer, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.minted",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn service_account_token_is_cached_across_batches() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/space1/messages"))
        .and(header("Authorization", "Bearer ya29.minted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let keyfile = write_keyfile(&dir, &format!("{}/token", server.uri()));
    let output = GoogleChatOutput::configure(&routed_config(&server.uri(), &keyfile)).unwrap();

    for message in ["first", "second"] {
        let batch: Batch = vec![event("space1", message)].into_iter().collect();
        let report = output.dispatch(&batch).await.unwrap();
        assert_eq!(report.delivered, 1);
    }
}

#[tokio::test]
async fn rejected_token_is_refreshed_on_next_batch() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/space1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/space1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let keyfile = write_keyfile(&dir, &format!("{}/token", server.uri()));
    let output = GoogleChatOutput::configure(&routed_config(&server.uri(), &keyfile)).unwrap();
    let batch: Batch = vec![event("space1", "hello")].into_iter().collect();

    let first = output.dispatch(&batch).await.unwrap();
    assert_eq!(first.discarded, 1);
    let second = output.dispatch(&batch).await.unwrap();
    assert_eq!(second.delivered, 1);
}

#[tokio::test]
async fn token_endpoint_failure_discards_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;
    mount_space(&server, "space1", 200, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let keyfile = write_keyfile(&dir, &format!("{}/token", server.uri()));
    let output = GoogleChatOutput::configure(&routed_config(&server.uri(), &keyfile)).unwrap();
    let batch: Batch = vec![event("space1", "hello")].into_iter().collect();

    let report = output.dispatch(&batch).await.unwrap();
    assert_eq!(report.discarded, 1);
    assert_eq!(report.delivered, 0);
}
