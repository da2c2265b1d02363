//! Form page and configuration endpoints

use crate::{ApiError, ServerState};
use axum::{extract::State, response::Html, Json};
use contact_form::{synthesize, Config, PageView};
use std::sync::Arc;

/// Render the form page. An unusable configuration renders the error page.
pub async fn index(State(state): State<Arc<ServerState>>) -> Result<Html<String>, ApiError> {
    let view = match state.loader.load(&state.source).await {
        Ok(config) => PageView::Form(Box::new(synthesize(&config))),
        Err(error) => {
            tracing::error!(
                source = %state.source.describe(),
                error = %error,
                "configuration failed to load"
            );
            PageView::Error(error.to_string())
        }
    };
    Ok(Html(state.renderer.render(&view)?))
}

/// Serve the validated configuration
pub async fn config(State(state): State<Arc<ServerState>>) -> Result<Json<Config>, ApiError> {
    Ok(Json(state.loader.load(&state.source).await?))
}
