//! Response capture and gzip plumbing shared by the access logger and the
//! registry mutator.

use std::io::{Read, Write};

use axum::body::{to_bytes, Body, Bytes};
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::response::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::ProxyError;

/// A fully buffered downstream response: captured status, headers and raw
/// body bytes, replayable or rewritable before anything reaches the client.
#[derive(Debug)]
pub struct ResponseRecorder {
    parts: Parts,
    buf: Bytes,
}

impl ResponseRecorder {
    /// Drain `resp` into a recorder, reading the body to completion.
    pub async fn record(resp: Response) -> Result<ResponseRecorder, ProxyError> {
        let (parts, body) = resp.into_parts();
        let buf = to_bytes(body, usize::MAX)
            .await
            .map_err(|err| ProxyError::Codec(format!("could not read response body: {}", err)))?;
        Ok(ResponseRecorder { parts, buf })
    }

    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn content_type(&self) -> &str {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    }

    pub fn is_gzip(&self) -> bool {
        self.parts
            .headers
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("gzip"))
            .unwrap_or(false)
    }

    /// The recorded bytes, decoded if the response was gzip encoded.
    pub fn body(&self) -> Result<Vec<u8>, ProxyError> {
        if self.is_gzip() {
            gunzip(&self.buf)
        } else {
            Ok(self.buf.to_vec())
        }
    }

    /// The recorded bytes in string form, decoded if gzip encoded.
    pub fn body_string(&self) -> String {
        if self.buf.is_empty() {
            return String::new();
        }
        match self.body() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::from_utf8_lossy(&self.buf).into_owned(),
        }
    }

    /// Replay the response exactly as captured.
    pub fn flush(self) -> Response {
        let ResponseRecorder { parts, buf } = self;
        Response::from_parts(parts, Body::from(buf))
    }

    /// Emit the captured status and headers with a replacement body. The
    /// upstream Content-Length no longer applies and is dropped.
    pub fn flush_with(self, bytes: Vec<u8>) -> Response {
        let ResponseRecorder { mut parts, .. } = self;
        parts.headers.remove(CONTENT_LENGTH);
        Response::from_parts(parts, Body::from(bytes))
    }
}

/// Decompress gzip encoded bytes.
pub fn gunzip(v: &[u8]) -> Result<Vec<u8>, ProxyError> {
    let mut decoder = GzDecoder::new(v);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| ProxyError::Codec(format!("could not read gzip content: {}", err)))?;
    Ok(out)
}

/// Gzip the provided bytes.
pub fn gzip(v: &[u8]) -> Result<Vec<u8>, ProxyError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(v)
        .map_err(|err| ProxyError::Codec(format!("could not write gzip content: {}", err)))?;
    encoder
        .finish()
        .map_err(|err| ProxyError::Codec(format!("could not close gzip writer: {}", err)))
}
