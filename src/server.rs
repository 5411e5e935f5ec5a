use crate::notification::{sender::PushSender, svc::Notification};

use anyhow::{Context, Result};
use request_http_parser::parser::{Method, Request};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot::Receiver,
};
use tracing::{error, info, warn};

pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

macro_rules! response_head {
    ($status:literal, $content_type:literal) => {
        concat!(
            "HTTP/1.1 ",
            $status,
            "\r\n\
            Access-Control-Allow-Origin: *\r\n\
            Content-Type: ",
            $content_type,
            "\r\n\
            Connection: close\r\n\
            \r\n"
        )
    };
}

pub const OK_RESPONSE: &str = response_head!("200 OK", "text/plain");
pub const OK_RESPONSE_JSON: &str = response_head!("200 OK", "application/json");
pub const CREATED: &str = response_head!("201 Created", "text/plain");
pub const BAD_REQUEST: &str = response_head!("400 Bad Request", "text/plain");
pub const NOT_FOUND: &str = response_head!("404 Not Found", "text/plain");
pub const PAYLOAD_TOO_LARGE: &str = response_head!("413 Payload Too Large", "text/plain");
pub const INTERNAL_ERROR: &str = response_head!("500 Internal Server Error", "text/plain");
pub const OPTIONS_CORS: &str = "HTTP/1.1 204 No Content\r\n\
            Access-Control-Allow-Origin: *\r\n\
            Access-Control-Allow-Methods: POST, GET, OPTIONS\r\n\
            Access-Control-Allow-Headers: Content-Type\r\n\
            Access-Control-Max-Age: 86400\r\n\
            Connection: close\r\n\
            \r\n";

pub struct Server {}
impl Server {
    pub async fn start<S: PushSender + 'static>(
        addr: &str,
        service: Arc<Notification<S>>,
        shutdown_rx: Receiver<()>,
    ) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!("Server running on http://{}", listener.local_addr()?);
        Self::serve(listener, service, shutdown_rx).await
    }

    pub async fn serve<S: PushSender + 'static>(
        listener: TcpListener,
        service: Arc<Notification<S>>,
        mut shutdown_rx: Receiver<()>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                conn = listener.accept() => {
                    let (mut stream, peer) = match conn {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("Failed to accept connection: {e}");
                            continue;
                        }
                    };
                    let service = Arc::clone(&service);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.split();
                        if let Err(e) = Self::handle_client(reader, writer, &service).await {
                            error!(%peer, "connection error {e:#}");
                        }
                    });
                }
                _ = &mut shutdown_rx => {
                    info!("Shutting down server...");
                    break;
                }
            }
        }

        Ok(())
    }

    pub async fn handle_client<Reader, Writer, S>(
        reader: Reader,
        mut writer: Writer,
        service: &Notification<S>,
    ) -> Result<()>
    where
        Reader: AsyncRead + Unpin,
        Writer: AsyncWrite + Unpin,
        S: PushSender,
    {
        let raw = match read_request(reader).await? {
            Some(raw) => raw,
            None => {
                warn!("Request too large");
                return respond(&mut writer, PAYLOAD_TOO_LARGE, "Request too large").await;
            }
        };
        let mut request = match Request::new(&raw) {
            Ok(req) => req,
            Err(e) => {
                warn!("Unparseable request: {e}");
                return respond(&mut writer, BAD_REQUEST, &e.to_string()).await;
            }
        };
        // the parser stops the body at the next blank line
        request.body = raw.split_once("\r\n\r\n").map(|(_, body)| body.to_string());

        // Router
        let (status, content) = match (&request.method, request.path.as_str()) {
            (Method::OPTIONS, _) => (OPTIONS_CORS.to_string(), "".to_string()),
            (Method::GET, "/health") => (OK_RESPONSE.to_string(), "OK".to_string()),
            (Method::POST, "/register-subscription") => service.register_subs(&request).await,
            (Method::POST, "/push-notification") => service.push_notification(&request).await,
            _ => (NOT_FOUND.to_string(), "404 Not Found".to_string()),
        };

        respond(&mut writer, &status, &content).await
    }
}

async fn respond<Writer: AsyncWrite + Unpin>(
    writer: &mut Writer,
    status: &str,
    content: &str,
) -> Result<()> {
    writer
        .write_all(format!("{}{}", status, content).as_bytes())
        .await
        .context("Failed to write")?;
    writer.flush().await.context("Failed to flush")?;
    Ok(())
}

/// Reads one request: the head plus `Content-Length` bytes of body. Returns
/// `None` once the request would exceed [`MAX_REQUEST_BYTES`].
async fn read_request<Reader: AsyncRead + Unpin>(mut reader: Reader) -> Result<Option<String>> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    loop {
        let size = reader
            .read(&mut chunk)
            .await
            .context("Failed to read stream")?;
        buffer.extend_from_slice(&chunk[..size]);
        if buffer.len() > MAX_REQUEST_BYTES {
            return Ok(None);
        }
        if size == 0 || is_complete(&buffer) {
            break;
        }
    }
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

fn is_complete(buffer: &[u8]) -> bool {
    let Some(head_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&buffer[..head_end]);
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buffer.len() >= head_end + 4 + content_length
}
