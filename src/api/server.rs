use anyhow::{Context, Result};
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::core::config::ServerConfig;
use crate::core::PredictionForm;
use crate::handler::RequestHandler;
use crate::templates::{user_message, TemplateManager};

/// State shared by every route.
pub struct AppState {
    pub handler: RequestHandler,
    pub templates: TemplateManager,
    pub expose_internal_errors: bool,
    pub max_form_bytes: u64,
}

/// HTTP front end for the prediction form
pub struct PredictionServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl PredictionServer {
    pub fn new(config: ServerConfig, handler: RequestHandler, templates: TemplateManager) -> Self {
        let state = AppState {
            handler,
            templates,
            expose_internal_errors: config.expose_internal_errors,
            max_form_bytes: config.max_form_bytes,
        };

        Self {
            config,
            state: Arc::new(state),
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        routes(Arc::clone(&self.state))
    }

    /// Serve until Ctrl-C.
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid server address")?;

        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, async {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutdown signal received");
            })
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("Car price predictor listening on http://{}", bound);
        server.await;
        info!("Server stopped");

        Ok(())
    }
}

/// All routes with rejection handling.
pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let max_form_bytes = state.max_form_bytes;

    // GET /
    let index = warp::path::end()
        .and(warp::get())
        .and(with_state(Arc::clone(&state)))
        .and_then(index_page);

    // POST /predict
    let predict = warp::path("predict")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(max_form_bytes))
        .and(warp::body::form::<PredictionForm>())
        .and(with_state(Arc::clone(&state)))
        .and_then(predict_page);

    // GET /health
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    index
        .or(predict)
        .or(health)
        .with(warp::trace::request())
        .recover(handle_rejection)
}

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

async fn index_page(state: Arc<AppState>) -> Result<warp::reply::WithStatus<warp::reply::Html<String>>, Rejection> {
    let context = state.handler.context();
    let page = state
        .templates
        .render_index(context.brands(), context.transmissions());
    Ok(html_or_error(page))
}

async fn predict_page(
    form: PredictionForm,
    state: Arc<AppState>,
) -> Result<warp::reply::WithStatus<warp::reply::Html<String>>, Rejection> {
    let page = match state.handler.handle(&form) {
        Ok(prediction) => state.templates.render_prediction(&prediction),
        Err(error) => {
            let message = user_message(&error, state.expose_internal_errors);
            state.templates.render_error(&message)
        }
    };
    Ok(html_or_error(page))
}

fn html_or_error<E: std::fmt::Display>(
    page: Result<String, E>,
) -> warp::reply::WithStatus<warp::reply::Html<String>> {
    match page {
        Ok(body) => warp::reply::with_status(warp::reply::html(body), StatusCode::OK),
        Err(e) => {
            error!("Failed to render page: {}", e);
            warp::reply::with_status(
                warp::reply::html("Internal Server Error".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

/// Global Error Handler
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else {
        (StatusCode::BAD_REQUEST, "Bad Request")
    };

    Ok(warp::reply::with_status(message, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::PredictionContext;
    use crate::ml::{LinearRegressor, StandardScaler};
    use warp::test::request;

    fn server() -> PredictionServer {
        let context = PredictionContext::new(
            Arc::new(StandardScaler::new([0.0; 5], [1.0; 5])),
            Arc::new(LinearRegressor::new([0.0; 5], 1.0)),
        )
        .unwrap();

        PredictionServer::new(
            ServerConfig::default(),
            RequestHandler::new(Arc::new(context)),
            TemplateManager::default(),
        )
    }

    #[tokio::test]
    async fn test_api_server_routes() {
        let routes = server().routes();

        let resp = request().method("GET").path("/").reply(&routes).await;
        assert_eq!(resp.status(), 200);

        let resp = request().method("GET").path("/health").reply(&routes).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.body(), r#"{"status":"ok"}"#);

        let resp = request().method("GET").path("/missing").reply(&routes).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_predict_route() {
        let routes = server().routes();

        let resp = request()
            .method("POST")
            .path("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("brand=Maruti&year=2015&transmission=Manual&engine=1200&max_power=85")
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), 200);
        let body = String::from_utf8_lossy(resp.body());
        assert!(body.contains("Predicted Price: 2.72"));
    }

    #[tokio::test]
    async fn test_oversized_form_rejected() {
        let routes = server().routes();
        let padding = "x".repeat(20 * 1024);

        let resp = request()
            .method("POST")
            .path("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(format!("brand={}", padding))
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), 413);
    }

    #[tokio::test]
    async fn test_non_form_body_rejected() {
        let routes = server().routes();

        let resp = request()
            .method("POST")
            .path("/predict")
            .header("content-type", "application/json")
            .body(r#"{"brand":"Maruti"}"#)
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 415);

        let resp = request()
            .method("POST")
            .path("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("brand=Maruti&brand=BMW&year=2015&transmission=Manual&engine=1200&max_power=85")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 400);
    }
}
