use crate::application::use_cases::session_registry::SharedSession;
use crate::application::SessionRegistry;
use crate::domain::error::AppError;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder, ResponseError};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "csvqa_session";

/// The session a request belongs to, plus whether the browser still
/// needs to be told its id.
pub(crate) struct SessionHandle {
    pub id: Uuid,
    pub controller: SharedSession,
    created: bool,
}

impl SessionHandle {
    pub fn respond<T: Serialize>(&self, status: StatusCode, body: &T) -> HttpResponse {
        self.builder(status).json(body)
    }

    pub fn error(&self, err: &AppError) -> HttpResponse {
        self.respond(err.status_code(), &json!({ "error": err.message() }))
    }

    fn builder(&self, status: StatusCode) -> HttpResponseBuilder {
        let mut builder = HttpResponse::build(status);
        if self.created {
            builder.cookie(session_cookie(self.id.to_string()));
        }
        builder
    }
}

pub(crate) fn cookie_id(req: &HttpRequest) -> Option<Uuid> {
    req.cookie(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

pub(crate) fn resolve(req: &HttpRequest, sessions: &SessionRegistry) -> SessionHandle {
    let (id, controller, created) = sessions.get_or_create(cookie_id(req));
    SessionHandle {
        id,
        controller,
        created,
    }
}

/// 204 that tells the browser to forget its session id.
pub(crate) fn cleared() -> HttpResponse {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();
    HttpResponse::NoContent().cookie(cookie).finish()
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}
