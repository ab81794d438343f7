//! HTTP server

pub mod dispatch;
pub mod routes;

use anyhow::Result;
use axum::{
    extract::State,
    http::{Method, Uri},
    response::Response,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tera::Context;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::SiteConfig;
use crate::content::ContentLoader;
use crate::templates::{RenderError, Renderer, TemplateRenderer};
use crate::Site;
use routes::RouteTable;

/// Shared, read-only server state
pub struct AppState {
    pub config: SiteConfig,
    pub loader: ContentLoader,
    pub renderer: Arc<dyn Renderer>,
    pub routes: RouteTable,
    pub static_dir: PathBuf,
    lead_prefix: String,
}

impl AppState {
    /// State for a site using the Tera views
    pub fn new(site: &Site) -> Result<Self> {
        site.config.validate()?;
        let renderer = TemplateRenderer::with_overrides(site.views_dir.as_deref())?;
        Ok(Self::with_renderer(site, Arc::new(renderer)))
    }

    /// State for a site with a caller-supplied renderer
    pub fn with_renderer(site: &Site, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config: site.config.clone(),
            loader: site.loader(),
            renderer,
            routes: RouteTable::standard(),
            static_dir: site.static_dir.clone(),
            lead_prefix: site.config.lead_prefix(),
        }
    }

    /// Whether `path` belongs to the lead intake sub-application
    pub fn is_lead_path(&self, path: &str) -> bool {
        path == self.lead_prefix
            || path
                .strip_prefix(self.lead_prefix.as_str())
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false)
    }

    /// Context every view receives
    pub fn base_context(&self, view: &str) -> Result<Context, RenderError> {
        let mut context = Context::new();
        let site = json!({
            "title": self.config.title,
            "description": self.config.description,
        });
        context
            .try_insert("site", &site)
            .map_err(|source| RenderError::Template {
                view: view.to_string(),
                source,
            })?;
        Ok(context)
    }
}

/// Build the application router.
///
/// `lead_intake`, when given, is nested under the configured lead prefix and
/// owns every request below it.
pub fn build_router(state: Arc<AppState>, lead_intake: Option<Router>) -> Router {
    let mut app = Router::new().nest_service("/static", ServeDir::new(&state.static_dir));

    if let Some(leads) = lead_intake {
        app = app.nest_service(&state.lead_prefix, leads);
    }

    app.fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server and run until Ctrl+C
pub async fn start(site: &Site, ip: &str, port: u16, lead_intake: Option<Router>) -> Result<()> {
    let state = Arc::new(AppState::new(site)?);
    let app = build_router(state, lead_intake);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving {:?} at http://{}:{}", site.content_dir, ip, port);
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Every content route goes through the dispatcher
async fn fallback_handler(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    dispatch::dispatch(&state, &method, uri.path()).await
}
