//! HTTP server for the meter page and the event stream

use axum::{response::Html, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::audio::register::ReadingRegister;
use crate::config::UiConfig;
use crate::ui::events::{self, Subscribers};
use crate::ui::page;

/// Shared application state
pub struct AppState {
    pub register: Arc<ReadingRegister>,
    pub subscribers: Arc<Subscribers>,
    pub config: UiConfig,
    /// Rendered once, served as-is
    pub index_html: String,
}

impl AppState {
    pub fn new(register: Arc<ReadingRegister>, config: UiConfig) -> crate::Result<Self> {
        let index_html = page::render_index(&config.author, &config.credit)?;
        Ok(Self {
            register,
            subscribers: Arc::new(Subscribers::new()),
            config,
            index_html,
        })
    }
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/events", get(events::events_handler))
        // Health check
        .route("/health", get(|| async { "OK" }))
        .layer(cors)
        .with_state(state)
}

async fn index_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Html<String> {
    Html(state.index_html.clone())
}

/// Web server for the meter
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server
    pub fn new(register: Arc<ReadingRegister>, config: UiConfig) -> crate::Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(register, config)?),
        })
    }

    /// Bind and serve until the future is dropped
    pub async fn start(&self) -> crate::Result<()> {
        let config = &self.state.config;
        let addr: SocketAddr = format!("{}:{}", config.bind_address, config.http_port)
            .parse()
            .map_err(|e| crate::Error::Config(format!("bad bind address: {}", e)))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web server listening on http://{}", addr);

        axum::serve(listener, router(self.state.clone())).await?;

        Ok(())
    }
}
