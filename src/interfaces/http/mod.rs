mod error;
mod session;
mod types;

use crate::application::use_cases::session_controller::AskOutcome;
use crate::application::SessionRegistry;
use crate::domain::error::AppError;
use crate::infrastructure::config::ServerConfig;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::{Condition, Logger};
use actix_web::{
    delete, dev::Server, get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder,
    ResponseError,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub use session::SESSION_COOKIE;
pub use types::{AskRequest, AskResponse, DatasetView, HistoryResponse};

const INDEX_HTML: &str = include_str!("index.html");

pub struct HttpState {
    pub sessions: Arc<SessionRegistry>,
    pub preview_rows: usize,
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

#[get("/health")]
async fn health(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "credential_configured": data.sessions.has_credential(),
    }))
}

#[post("/dataset")]
async fn upload_dataset(
    req: HttpRequest,
    data: web::Data<HttpState>,
    body: web::Bytes,
) -> HttpResponse {
    let handle = session::resolve(&req, &data.sessions);
    let mut controller = handle.controller.lock().await;

    match controller.load_dataset(&body) {
        Ok(dataset) => {
            info!(session_id = %handle.id, bytes = body.len(), "CSV uploaded");
            handle.respond(StatusCode::OK, &DatasetView::new(dataset, data.preview_rows))
        }
        Err(err) => {
            let message = format!("An error occurred while reading the CSV file: {}", err.message());
            handle.respond(err.status_code(), &json!({ "error": message }))
        }
    }
}

#[get("/dataset")]
async fn current_dataset(req: HttpRequest, data: web::Data<HttpState>) -> HttpResponse {
    let handle = session::resolve(&req, &data.sessions);
    let controller = handle.controller.lock().await;

    match controller.dataset() {
        Some(dataset) => handle.respond(StatusCode::OK, &DatasetView::new(dataset, data.preview_rows)),
        None => handle.error(&AppError::NotFound("No CSV file uploaded yet".to_string())),
    }
}

#[post("/ask")]
async fn ask(
    req: HttpRequest,
    data: web::Data<HttpState>,
    payload: web::Json<AskRequest>,
) -> HttpResponse {
    let handle = session::resolve(&req, &data.sessions);

    if let Err(errors) = payload.validate() {
        return handle.error(&AppError::ValidationError(errors.to_string()));
    }

    // Held across the model call: one question at a time per session.
    let mut controller = handle.controller.lock().await;

    match controller.ask_question(&payload.question).await {
        Ok(outcome) => {
            let body = match outcome {
                AskOutcome::Answered(answer) => AskResponse::Answered { answer },
                AskOutcome::Ignored => AskResponse::Ignored,
                AskOutcome::MissingCredential(message) => AskResponse::Warning { message },
                AskOutcome::AgentFailed(message) => {
                    warn!(session_id = %handle.id, "Question failed");
                    AskResponse::Error { message }
                }
            };
            handle.respond(StatusCode::OK, &body)
        }
        Err(err) => handle.error(&err),
    }
}

#[get("/history")]
async fn history(req: HttpRequest, data: web::Data<HttpState>) -> HttpResponse {
    let handle = session::resolve(&req, &data.sessions);
    let controller = handle.controller.lock().await;

    let entries: Vec<_> = controller.render_log().collect();
    handle.respond(
        StatusCode::OK,
        &HistoryResponse {
            count: entries.len(),
            entries,
        },
    )
}

#[delete("/session")]
async fn end_session(req: HttpRequest, data: web::Data<HttpState>) -> HttpResponse {
    if let Some(id) = session::cookie_id(&req) {
        data.sessions.end(id);
    }
    session::cleared()
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(
        web::scope("/api")
            .service(health)
            .service(upload_dataset)
            .service(current_dataset)
            .service(ask)
            .service(history)
            .service(end_session),
    );
}

pub fn start_server(state: HttpState, config: &ServerConfig) -> std::io::Result<Server> {
    let state = web::Data::new(state);
    let max_upload_bytes = config.max_upload_bytes;
    let permissive_cors = config.permissive_cors;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Condition::new(permissive_cors, Cors::permissive()))
            .wrap(Logger::new("%r %s %Dms"))
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .configure(routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}
