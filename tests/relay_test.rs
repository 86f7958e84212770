use futures::StreamExt;
use ollama_relay::{ChatMessage, ChatRequest, Fragment, Relay, RelayError, TrailingLine};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> ChatRequest {
    ChatRequest::new(
        "gemma3:1b",
        vec![ChatMessage::system("be brief"), ChatMessage::user("hello")],
    )
}

async fn relay_for(server: &MockServer) -> Relay {
    Relay::new(Client::new(), &format!("{}/api/chat", server.uri())).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_relay_streams_fragments_in_order() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"model\":\"gemma3:1b\",\"message\":{\"role\":\"assistant\",\"content\":\"నమస్తే\"},\"done\":false}\n",
        "keep-alive\n",
        "{\"model\":\"gemma3:1b\",\"message\":{\"role\":\"assistant\",\"content\":\" రైతు\"},\"done\":false}\n",
        "{\"model\":\"gemma3:1b\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
    );

    // The relay always asks for a stream, whatever the caller's payload says
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "model": "gemma3:1b",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ],
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_for(&server).await;
    let fragments: Vec<Fragment> = relay
        .relay(&request())
        .await
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    assert_eq!(fragments, vec![Fragment::new("నమస్తే"), Fragment::new(" రైతు")]);
}

#[tokio::test]
async fn test_relay_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'gemma3:1b' not found"))
        .mount(&server)
        .await;

    let relay = relay_for(&server).await;
    match relay.relay(&request()).await {
        Err(RelayError::UpstreamStatus { status, body }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(body.contains("not found"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an upstream status error"),
    }
}

#[tokio::test]
async fn test_relay_connection_refused() {
    // Nothing listens on the discard port
    let relay = Relay::new(Client::new(), "http://127.0.0.1:9/api/chat").unwrap();
    assert!(matches!(
        relay.relay(&request()).await,
        Err(RelayError::Transport(_))
    ));
}

#[tokio::test]
async fn test_relay_trailing_line_policy() {
    let server = MockServer::start().await;
    let body = "{\"response\":\"first\"}\n{\"response\":\"last\"}";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let discard = relay_for(&server).await;
    let fragments: Vec<String> = discard
        .relay(&request())
        .await
        .unwrap()
        .map(|r| r.unwrap().result)
        .collect()
        .await;
    assert_eq!(fragments, vec!["first"]);

    let parse = relay_for(&server).await.with_trailing_line(TrailingLine::Parse);
    let fragments: Vec<String> = parse
        .relay(&request())
        .await
        .unwrap()
        .map(|r| r.unwrap().result)
        .collect()
        .await;
    assert_eq!(fragments, vec!["first", "last"]);
}
