//! Mock gas feed server for integration tests.
//!
//! Accepts WebSocket connections, records the request path and every
//! inbound text frame, and pushes a scripted list of frames to each new
//! connection.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

#[derive(Default)]
struct Recorded {
    paths: Vec<String>,
    received: Vec<String>,
    connections: u32,
    closed: u32,
}

pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockFeedServer {
    /// Start a server that sends `script` to every new connection.
    pub async fn start(script: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let recorded_clone = recorded.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(stream, script.clone(), recorded_clone.clone()));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            recorded,
        }
    }

    /// URL template pointing at this server.
    pub fn url_template(&self) -> String {
        format!("ws://{}/gas/{{chain_id}}", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        self.recorded.lock().await.connections
    }

    pub async fn closed_count(&self) -> u32 {
        self.recorded.lock().await.closed
    }

    pub async fn paths(&self) -> Vec<String> {
        self.recorded.lock().await.paths.clone()
    }

    pub async fn received_messages(&self) -> Vec<String> {
        self.recorded.lock().await.received.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(stream: TcpStream, script: Vec<String>, recorded: Arc<Mutex<Recorded>>) {
    let path = Arc::new(std::sync::Mutex::new(String::new()));
    let path_clone = path.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        *path_clone.lock().unwrap() = req.uri().path().to_string();
        Ok(resp)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    {
        let mut rec = recorded.lock().await;
        rec.connections += 1;
        rec.paths.push(path.lock().unwrap().clone());
    }

    let (mut write, mut read) = ws_stream.split();

    for frame in script {
        if write.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                recorded.lock().await.received.push(text);
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    recorded.lock().await.closed += 1;
}
