//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agents::Dispatcher;
use crate::assistant::Assistant;
use crate::config::Config;
use crate::router::{CommandRouter, ReplySink};
use crate::user_config::{create_user_config_store, UserConfigStore};
use crate::vendor::{ClientFactory, HttpClientFactory};

use super::bot_auth::{self, BotAuthenticator, OpenIdKeySource, SigningKeySource};
use super::completion::CompletionClient;
use super::copilot;
use super::teams::{Activity, CollectingSink, ConnectorClient, ConnectorSink};
use super::types::HealthResponse;
use super::verify::{GithubKeySource, PublicKeySource, SignatureVerifier};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Slash commands, card actions and dialogs
    pub router: CommandRouter,
    /// Copilot Extension functions
    pub assistant: Assistant,
    pub verifier: SignatureVerifier,
    pub completions: CompletionClient,
    /// Bot Framework connector for proactive replies
    pub connector: Arc<ConnectorClient>,
    /// Inbound activity tokens
    pub bot_auth: BotAuthenticator,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn UserConfigStore>,
        factory: Arc<dyn ClientFactory>,
        keys: Arc<dyn PublicKeySource>,
        bot_keys: Arc<dyn SigningKeySource>,
    ) -> Self {
        let dispatcher = Dispatcher::new(store, factory);
        let app_id = config.bot.as_ref().map(|bot| bot.app_id.clone());
        Self {
            router: CommandRouter::new(dispatcher.clone(), config.status_refresh_delay),
            assistant: Assistant::new(dispatcher),
            verifier: SignatureVerifier::new(keys),
            completions: CompletionClient::new(
                &config.endpoints.copilot_api_url,
                &config.endpoints.copilot_model,
            ),
            connector: Arc::new(ConnectorClient::new(config.bot.clone())),
            bot_auth: BotAuthenticator::new(app_id, bot_keys),
            config,
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(root).post(copilot::handle))
        .route("/api/messages", post(bot_messages))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = create_user_config_store(config.user_config_path.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open user configuration store: {}", e))?;
    let factory = Arc::new(HttpClientFactory::new(config.endpoints.clone()));
    let keys = Arc::new(GithubKeySource::new(&config.endpoints.github_api_url));
    let bot_keys = Arc::new(OpenIdKeySource::new(bot_auth::OPENID_METADATA_URL));

    if config.dev_mode {
        tracing::warn!("Development mode: Copilot requests are not verified");
    }
    if config.bot.is_none() {
        tracing::warn!("No Bot Framework credentials; inbound activities are not authenticated");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, store, factory, keys, bot_keys));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: crate::util::now_string(),
    })
}

async fn root() -> &'static str {
    "AGU Copilot Extension is running"
}

/// Where the replies to one activity go.
enum Outbox {
    Collect(Arc<CollectingSink>),
    Connector(Arc<ConnectorSink>),
}

impl Outbox {
    fn for_activity(state: &AppState, activity: &Activity) -> Self {
        if !activity.expects_replies() {
            if let Some(sink) = ConnectorSink::for_activity(state.connector.clone(), activity) {
                return Outbox::Connector(Arc::new(sink));
            }
        }
        Outbox::Collect(Arc::new(CollectingSink::default()))
    }

    fn sink(&self) -> Arc<dyn ReplySink> {
        match self {
            Outbox::Collect(sink) => sink.clone(),
            Outbox::Connector(sink) => sink.clone(),
        }
    }

    /// Collected replies in the `expectReplies` response shape.
    async fn collected(&self) -> Option<Value> {
        match self {
            Outbox::Collect(sink) => Some(json!({ "activities": sink.activities().await })),
            Outbox::Connector(_) => None,
        }
    }
}

/// `POST /api/messages`: Bot Framework activities.
async fn bot_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(activity): Json<Activity>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = state
        .bot_auth
        .authenticate(authorization, activity.service_url.as_deref())
        .await
    {
        tracing::warn!(kind = %activity.kind, "Rejected Bot Framework activity: {}", e);
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let user = activity.user_id().to_string();
    let outbox = Outbox::for_activity(&state, &activity);
    tracing::debug!(
        kind = %activity.kind,
        name = ?activity.name,
        user = %user,
        "Received activity"
    );

    match (activity.kind.as_str(), activity.name.as_deref()) {
        ("invoke", Some("task/fetch")) => {
            Json(state.router.open_dialog(&activity.dialog_data())).into_response()
        }
        ("invoke", Some("task/submit")) => {
            let sink = outbox.sink();
            let response = state
                .router
                .submit_dialog(&user, &activity.dialog_data(), sink.as_ref())
                .await;
            Json(response).into_response()
        }
        ("invoke", Some("adaptiveCard/action")) => {
            let data = activity.card_data().unwrap_or(Value::Null);
            state.router.handle_action(&user, &data, outbox.sink()).await;
            match outbox.collected().await {
                Some(replies) => Json(replies).into_response(),
                None => Json(json!({
                    "statusCode": 200,
                    "type": "application/vnd.microsoft.activity.message",
                    "value": "",
                }))
                .into_response(),
            }
        }
        ("message", _) => {
            match activity.card_data() {
                Some(data) => state.router.handle_action(&user, &data, outbox.sink()).await,
                None => {
                    state
                        .router
                        .handle_message(&user, &activity.command_text(), outbox.sink())
                        .await
                }
            }
            match outbox.collected().await {
                Some(replies) => Json(replies).into_response(),
                None => StatusCode::OK.into_response(),
            }
        }
        _ => {
            tracing::debug!("Ignoring activity of type {}", activity.kind);
            StatusCode::OK.into_response()
        }
    }
}
