use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Json, Router,
};
use futures::StreamExt;
use minijinja::Environment;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::constants;
use crate::error::{ChatError, RelayError};
use crate::ollama::{ChatClient, ChatRequest};
use crate::prompt;
use crate::relay::Relay;
use crate::weather::WeatherClient;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Body of `POST /mcp/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<Environment<'static>>,
    relay: Relay,
    chat: ChatClient,
    weather: WeatherClient,
    model: String,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        // One connection pool shared by every upstream call
        let client = Client::new();

        let relay = Relay::new(client.clone(), &config.ollama_url)
            .context("Failed to configure the Ollama relay")?
            .with_trailing_line(config.trailing_line());

        Ok(Self {
            templates: Arc::new(create_minijinja_env()?),
            relay,
            chat: ChatClient::new(client.clone(), config.ollama_url.clone(), config.model.clone()),
            weather: WeatherClient::new(client, config.weather_url.clone(), config.weather_api_key.clone()),
            model: config.model.clone(),
        })
    }
}

fn create_minijinja_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)
        .context("Failed to load chat page template")?;
    Ok(env)
}

/// Errors a handler turns into a JSON response
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Relay(RelayError),
    Chat(ChatError),
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self::Chat(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Relay(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            ApiError::Chat(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Stream the model's reply as newline-delimited `{"result": ...}` objects.
async fn relay_handler(
    State(state): State<AppState>,
    Json(request): Json<RelayRequest>,
) -> Result<Response, ApiError> {
    let location = request.location.as_deref().unwrap_or(constants::DEFAULT_LOCATION);
    let date = request.date.as_deref().unwrap_or(constants::DEFAULT_DATE);

    let weather = if prompt::is_weather_question(&request.message) {
        info!(location, date, "Weather question detected, fetching forecast");
        Some(state.weather.forecast(location, date).await)
    } else {
        None
    };

    let payload = ChatRequest::new(
        state.model.clone(),
        prompt::build_messages(&request.message, weather.as_deref()),
    )
    .streaming();

    let fragments = state.relay.relay(&payload).await?;
    let body = fragments.map(|item| match item {
        Ok(fragment) => Ok(fragment.to_json_line()),
        Err(e) => {
            // Ends the chunked body abnormally; fragments already sent stay delivered
            error!("Relay stream failed: {}", e);
            Err(e)
        }
    });

    Ok(([(header::CONTENT_TYPE, "application/json")], Body::from_stream(body)).into_response())
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    render_index(&state.templates, &state.model)
}

fn render_index(templates: &Environment<'static>, model: &str) -> Result<Html<String>, (StatusCode, Html<String>)> {
    templates
        .get_template("index.html")
        .and_then(|tmpl| {
            tmpl.render(minijinja::context! {
                title => "Ollama Chatbot",
                model => model,
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

/// One full reply per turn for the browser chat page.
async fn chat_handler(
    State(state): State<AppState>,
    Json(turn): Json<ChatTurn>,
) -> Result<Json<ChatReply>, ApiError> {
    if turn.message.trim().is_empty() {
        warn!("Rejecting empty chat message");
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let reply = state.chat.chat(&turn.message).await?;
    Ok(Json(ChatReply { reply }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/mcp/chat", post(relay_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
