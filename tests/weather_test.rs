use ollama_relay::WeatherClient;
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> WeatherClient {
    WeatherClient::new(Client::new(), format!("{}/data/2.5/forecast", server.uri()), "key")
}

#[tokio::test]
async fn test_forecast_uses_first_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("q", "Hyderabad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cod": "200",
            "list": [
                {"dt": 1, "weather": [{"description": "స్పష్టమైన ఆకాశం"}], "main": {"temp": 34.2, "humidity": 40}},
                {"dt": 2, "weather": [{"description": "వర్షం"}], "main": {"temp": 25.0}}
            ]
        })))
        .mount(&server)
        .await;

    let summary = client_for(&server).forecast("Hyderabad", "today").await;
    assert_eq!(summary, "Hyderabad వాతావరణం: స్పష్టమైన ఆకాశం, ఉష్ణోగ్రత: 34.2°C");
}

#[tokio::test]
async fn test_forecast_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cod": "200", "list": []})))
        .mount(&server)
        .await;

    let summary = client_for(&server).forecast("Nowhere", "today").await;
    assert_eq!(summary, "Cannot fetch weather for Nowhere.");
}

#[tokio::test]
async fn test_forecast_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"cod": "404", "message": "city not found"})))
        .mount(&server)
        .await;

    let summary = client_for(&server).forecast("Atlantis", "today").await;
    assert_eq!(summary, "Cannot fetch weather for Atlantis.");
}

#[tokio::test]
async fn test_forecast_unreachable() {
    let weather = WeatherClient::new(Client::new(), "http://127.0.0.1:9/data/2.5/forecast", "key");
    assert_eq!(
        weather.forecast("Hyderabad", "today").await,
        "Cannot fetch weather for Hyderabad."
    );
}

#[tokio::test]
async fn test_forecast_keeps_temperature_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"list":[{"weather":[{"description":"మేఘావృతం"}],"main":{"temp":25.0}}]}"#,
        ))
        .mount(&server)
        .await;

    let summary = client_for(&server).forecast("Karimnagar", "today").await;
    assert_eq!(summary, "Karimnagar వాతావరణం: మేఘావృతం, ఉష్ణోగ్రత: 25.0°C");
}

#[tokio::test]
async fn test_forecast_integer_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"list":[{"weather":[{"description":"ఎండ"}],"main":{"temp":31}}]}"#,
        ))
        .mount(&server)
        .await;

    let summary = client_for(&server).forecast("Nellore", "today").await;
    assert_eq!(summary, "Nellore వాతావరణం: ఎండ, ఉష్ణోగ్రత: 31°C");
}
