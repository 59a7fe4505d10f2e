use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{Builder, error::HttpError},
    domain::library::BuildRequest,
};

use super::middleware::{log_responses, set_request_context};

/// Response header telling whether the bundle came from the build cache.
pub const CACHE_STATUS_HEADER: &str = "x-module-from-cache";

const JAVASCRIPT_CONTENT_TYPE: &str = "text/javascript";
const MODULE_SEPARATOR: char = ',';

#[derive(Clone)]
pub struct HttpState {
    pub builder: Arc<Builder>,
    cache_control: HeaderValue,
}

impl HttpState {
    pub fn new(builder: Arc<Builder>, max_age_seconds: u64) -> Self {
        let cache_control = HeaderValue::from_str(&format!("public, max-age={max_age_seconds}"))
            .unwrap_or_else(|_| HeaderValue::from_static("public"));
        Self {
            builder,
            cache_control,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/{version}", get(version_bundle))
        .route("/{version}/{preset}", get(preset_bundle))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModulesQuery {
    modules: Option<String>,
}

impl ModulesQuery {
    /// Comma-separated module names; empty segments are ignored.
    fn module_names(&self) -> Vec<String> {
        self.modules
            .as_deref()
            .map(|list| {
                list.split(MODULE_SEPARATOR)
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

async fn version_bundle(
    State(state): State<HttpState>,
    Path(version): Path<String>,
    Query(query): Query<ModulesQuery>,
) -> Response {
    let request = BuildRequest::new(version).with_modules(query.module_names());
    serve_bundle(&state, request).await
}

async fn preset_bundle(
    State(state): State<HttpState>,
    Path((version, preset)): Path<(String, String)>,
    Query(query): Query<ModulesQuery>,
) -> Response {
    let request = BuildRequest::new(version)
        .with_preset(preset)
        .with_modules(query.module_names());
    serve_bundle(&state, request).await
}

async fn serve_bundle(state: &HttpState, request: BuildRequest) -> Response {
    match state.builder.build(&request).await {
        Ok(outcome) => {
            let cache_status = if outcome.cached { "true" } else { "false" };
            let mut response = (StatusCode::OK, String::from(&*outcome.source)).into_response();
            let headers = response.headers_mut();
            headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status));
            headers.insert(CACHE_CONTROL, state.cache_control.clone());
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JAVASCRIPT_CONTENT_TYPE));
            response
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(modules: Option<&str>) -> ModulesQuery {
        ModulesQuery {
            modules: modules.map(str::to_string),
        }
    }

    #[test]
    fn splits_comma_separated_modules() {
        assert_eq!(
            query(Some("moduleA,moduleB")).module_names(),
            vec!["moduleA".to_string(), "moduleB".to_string()]
        );
    }

    #[test]
    fn absent_or_empty_modules_mean_none() {
        assert!(query(None).module_names().is_empty());
        assert!(query(Some("")).module_names().is_empty());
        assert_eq!(query(Some("a,,b,")).module_names().len(), 2);
    }

    #[test]
    fn cache_control_carries_max_age() {
        let builder = Arc::new(Builder::with_defaults(
            Arc::new(crate::infra::library::FsLibrary::new("library")),
            Default::default(),
        ));
        let state = HttpState::new(builder, 86_400);
        assert_eq!(state.cache_control, "public, max-age=86400");
    }
}
