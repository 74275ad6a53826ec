//! Access logging middleware. Runs outermost so that requests answered
//! directly by the registry mutator are still logged.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::httputil::ResponseRecorder;

#[derive(Debug, Clone, Copy)]
pub struct AccessLog {
    pub trace: bool,
}

pub async fn access_log(State(cfg): State<AccessLog>, req: Request, next: Next) -> Response {
    debug!("----------------------------------------------------------------------------");
    info!("REQUEST: {} {}", req.method(), req.uri().path());

    let req = if cfg.trace {
        info!("HEADERS: {}", pretty_headers(req.headers()));
        match buffer_request(req).await {
            Ok((req, body)) => {
                info!("BODY: \n{}", body);
                req
            }
            Err(resp) => return resp,
        }
    } else {
        req
    };

    let resp = next.run(req).await;

    let rec = match ResponseRecorder::record(resp).await {
        Ok(rec) => rec,
        Err(err) => {
            error!("could not record response: {}", err);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    info!("RESPONSE StatusCode: {}", rec.status().as_u16());
    if cfg.trace {
        info!("HEADERS: {}", pretty_headers(rec.headers()));
        let body = if rec.content_type().starts_with("application") {
            rec.body_string()
        } else {
            "SOME-BYTES".to_string()
        };
        info!("BODY: \n{}", body);
    }

    rec.flush()
}

async fn buffer_request(req: Request) -> Result<(Request, String), Response> {
    let (parts, body) = req.into_parts();
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Ok((Request::from_parts(parts, Body::from(bytes)), text))
        }
        Err(err) => {
            error!("error reading request body err: {}", err);
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

fn pretty_headers(headers: &HeaderMap) -> String {
    let mut buf = String::from("\n");
    for (name, value) in headers {
        buf.push_str(&format!("{} : {:?}\n", name, value));
    }
    buf
}
