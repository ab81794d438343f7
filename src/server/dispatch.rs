//! Request dispatch: route match, content load, render

use axum::{
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tera::Context;
use thiserror::Error;

use super::routes::{RouteKind, RouteMatch};
use super::AppState;
use crate::content::{LoadError, Partition};
use crate::templates::RenderError;

const NOT_FOUND_VIEW: &str = "404.html";
const ERROR_VIEW: &str = "error.html";

/// Anything that stops a matched request from producing its content
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("no route matches {0}")]
    NoRoute(String),

    #[error("{method} not allowed on {path}")]
    MethodNotAllowed { method: Method, path: String },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Load(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            DispatchError::NoRoute(_) => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Answer a request for `path`.
///
/// Paths are resolved before the method is looked at, so an unknown path is
/// a 404 whatever the method and only matched routes answer 405.
pub async fn dispatch(state: &AppState, method: &Method, path: &str) -> Response {
    let wants_json = path.starts_with("/api/");

    if state.is_lead_path(path) {
        tracing::debug!(path, "lead intake path with no mounted handler");
        return error_response(state, DispatchError::NoRoute(path.to_string()), wants_json);
    }

    let Some(matched) = state.routes.resolve(path) else {
        return error_response(state, DispatchError::NoRoute(path.to_string()), wants_json);
    };
    tracing::debug!(path, route = matched.route.path, "matched route");

    let is_api = matched.route.kind.is_api();
    if *method != Method::GET && *method != Method::HEAD {
        let error = DispatchError::MethodNotAllowed {
            method: method.clone(),
            path: path.to_string(),
        };
        return error_response(state, error, is_api);
    }

    match handle(state, &matched).await {
        Ok(response) => response,
        Err(e) => error_response(state, e, is_api),
    }
}

async fn handle(state: &AppState, matched: &RouteMatch<'_>) -> Result<Response, DispatchError> {
    match matched.route.kind {
        RouteKind::Home { view } => {
            let (featured, collection) = tokio::try_join!(
                state.loader.load(Partition::Pillar, &state.config.featured),
                state.loader.load_collection(),
            )?;
            let (first, rest) = collection.split_first_page(state.config.first_page_size);

            let mut context = state.base_context(view)?;
            insert(&mut context, view, "featured", &featured)?;
            insert(&mut context, view, "posts", first)?;
            insert(&mut context, view, "has_more", &!rest.is_empty())?;
            render(state, view, &context)
        }

        RouteKind::Overflow { view } => {
            let collection = state.loader.load_collection().await?;
            let (_, rest) = collection.split_first_page(state.config.first_page_size);

            let mut context = state.base_context(view)?;
            insert(&mut context, view, "posts", rest)?;
            render(state, view, &context)
        }

        RouteKind::Record { partition, view, .. } => {
            let slug = matched.slug(&state.config.featured).unwrap_or_default();
            let record = state.loader.load(partition, slug).await?;

            let mut context = state.base_context(view)?;
            insert(&mut context, view, "record", &record)?;
            render(state, view, &context)
        }

        RouteKind::ApiCollection => {
            let collection = state.loader.load_collection().await?;
            Ok(Json(collection).into_response())
        }

        RouteKind::ApiRecord { partition } => {
            let slug = matched.slug(&state.config.featured).unwrap_or_default();
            let record = state.loader.load(partition, slug).await?;
            Ok(Json(record).into_response())
        }
    }
}

fn insert<T: Serialize + ?Sized>(
    context: &mut Context,
    view: &str,
    key: &str,
    value: &T,
) -> Result<(), RenderError> {
    context
        .try_insert(key, value)
        .map_err(|source| RenderError::Template {
            view: view.to_string(),
            source,
        })
}

fn render(state: &AppState, view: &str, context: &Context) -> Result<Response, DispatchError> {
    let html = state.renderer.render(view, context)?;
    Ok(Html(html).into_response())
}

/// Turn a failure into a generic response. The cause is logged, never sent.
fn error_response(state: &AppState, error: DispatchError, json: bool) -> Response {
    let status = error.status();

    if status == StatusCode::METHOD_NOT_ALLOWED {
        tracing::debug!("{}", error);
        let allow = [(header::ALLOW, "GET, HEAD")];
        if json {
            let body = Json(json!({ "error": "method not allowed" }));
            return (status, allow, body).into_response();
        }
        return (status, allow, "Method Not Allowed").into_response();
    }

    if status == StatusCode::NOT_FOUND {
        tracing::debug!("{}", error);
    } else {
        match &error {
            DispatchError::Load(e) => {
                tracing::error!(target_file = %e.target(), error = %e, "failed to load content")
            }
            _ => tracing::error!(error = %error, "failed to render page"),
        }
    }

    let (message, view) = if status == StatusCode::NOT_FOUND {
        ("not found", NOT_FOUND_VIEW)
    } else {
        ("internal server error", ERROR_VIEW)
    };

    if json {
        return (status, Json(json!({ "error": message }))).into_response();
    }

    let page = state
        .base_context(view)
        .and_then(|context| state.renderer.render(view, &context));
    match page {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render {} page", status.as_u16());
            (status, message).into_response()
        }
    }
}
