
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::Context;
use bytes::Bytes;
use futures::future::{self, Ready};
use http_body_util::Full;
use hyper::{
    body::Incoming,
    header::{self, HeaderValue},
    server::conn::http1,
    service::Service,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::atmos;
use crate::sensor::SensorReader;

/// The sensor, shared by every connection. Hardware access is serialised
/// through the mutex.
pub type SharedReader = Arc<Mutex<dyn SensorReader>>;

type Body = Full<Bytes>;

#[derive(Clone)]
pub struct AtmosService {
    reader: SharedReader,
}

impl Service<Request<Incoming>> for AtmosService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = self.route(req.method(), req.uri().path());
        debug!("{} {} -> {}", req.method(), req.uri(), response.status());
        future::ready(Ok(response))
    }
}

impl AtmosService {
    pub fn new(reader: SharedReader) -> Self {
        Self { reader }
    }

    pub fn route(&self, method: &Method, path: &str) -> Response<Body> {
        let handler: fn(&Self) -> anyhow::Result<Response<Body>> = match path {
            "/metrics" => Self::metrics,
            "/ids" => Self::ids,
            "/atmos" => Self::atmos,
            _ => return error_response(StatusCode::NOT_FOUND, &format!("no route for {path}")),
        };
        // hyper drops the body of HEAD responses
        if *method != Method::GET && *method != Method::HEAD {
            let mut response = error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &format!("{method} not allowed on {path}"),
            );
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
            return response;
        }

        handler(self).unwrap_or_else(|err| {
            error!("{path}: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("{err:#}"))
        })
    }

    // poison left by a reader that panicked is cleared; later requests still reach the sensor
    fn sensor(&self) -> MutexGuard<'_, dyn SensorReader + 'static> {
        self.reader.lock().unwrap_or_else(|poisoned| {
            warn!("sensor reader panicked during an earlier request");
            self.reader.clear_poison();
            poisoned.into_inner()
        })
    }

    fn metrics(&self) -> anyhow::Result<Response<Body>> {
        let reading = self.sensor().read_all()?;
        json_response(&reading)
    }

    fn ids(&self) -> anyhow::Result<Response<Body>> {
        let id = self.sensor().read_id()?;
        json_response(&id)
    }

    fn atmos(&self) -> anyhow::Result<Response<Body>> {
        let reading = self.sensor().read_all()?;
        let metrics = atmos::try_derive(&reading)?;
        json_response(&metrics)
    }
}

fn with_json_body(status: StatusCode, body: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn json_response<T: Serialize>(value: &T) -> anyhow::Result<Response<Body>> {
    let body = serde_json::to_vec(value).context("can't encode response")?;
    Ok(with_json_body(StatusCode::OK, body))
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let body = json!({ "error": message }).to_string();
    with_json_body(status, body.into_bytes())
}

pub async fn bind(socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(socket_addr)
        .await
        .with_context(|| format!("can't listen on {socket_addr}"))
}

/// Accepts connections forever, one task per connection.
pub async fn serve(listener: TcpListener, reader: SharedReader) -> anyhow::Result<()> {
    let service = AtmosService::new(reader);
    info!("ready to serve on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!("accept failed: {err}");
                continue;
            }
        };

        let service = service.clone();
        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!("connection from {peer}: {err}");
            }
        });
    }
}
