//! Sending replies through tiny_http.

use std::io;
use tiny_http::{Header, Request, Response, StatusCode};

use super::handler::Reply;
use crate::config::PROJECT_URL;

/// Send `reply` with the headers every response carries.
pub fn send(request: Request, reply: Reply) -> io::Result<()> {
    let mut response = Response::from_data(reply.body.into_bytes())
        .with_status_code(StatusCode(reply.status));

    for (key, value) in [
        ("Content-Type", reply.content_type),
        ("Access-Control-Allow-Origin", "*"),
        ("X-Powered-By", PROJECT_URL),
    ] {
        match Header::from_bytes(key, value) {
            Ok(header) => response.add_header(header),
            Err(()) => log::warn!("Skipping invalid header {}", key),
        }
    }
    if reply.status == 405 {
        if let Ok(header) = Header::from_bytes("Allow", "GET") {
            response.add_header(header);
        }
    }

    request.respond(response)
}
