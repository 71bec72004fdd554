//! Mock per-chain gas feed.
//!
//! Serves `/gas/<chain_id>`. Every connection gets the scripted frames
//! with `{chain_id}` replaced by the chain from its path, then stays open
//! and records inbound text frames.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    received: Arc<Mutex<Vec<String>>>,
    chains: Arc<Mutex<Vec<String>>>,
}

impl MockFeedServer {
    pub async fn start(script: Vec<&str>) -> Self {
        let script: Vec<String> = script.into_iter().map(str::to_string).collect();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let chains = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let received_clone = received.clone();
        let chains_clone = chains.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(serve(
                            stream,
                            script.clone(),
                            received_clone.clone(),
                            chains_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            received,
            chains,
        }
    }

    pub fn url_template(&self) -> String {
        format!("ws://{}/gas/{{chain_id}}", self.addr)
    }

    /// Chain ids requested, one per accepted connection.
    pub async fn chains(&self) -> Vec<String> {
        self.chains.lock().await.clone()
    }

    pub async fn received_messages(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn serve(
    stream: TcpStream,
    script: Vec<String>,
    received: Arc<Mutex<Vec<String>>>,
    chains: Arc<Mutex<Vec<String>>>,
) {
    let chain = Arc::new(std::sync::Mutex::new(String::new()));
    let chain_clone = chain.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let segment = req.uri().path().rsplit('/').next().unwrap_or_default();
        *chain_clone.lock().unwrap() = segment.to_string();
        Ok(resp)
    };

    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };

    let chain = chain.lock().unwrap().clone();
    chains.lock().await.push(chain.clone());

    let (mut write, mut read) = ws_stream.split();

    for frame in &script {
        let text = frame.replace("{chain_id}", &chain);
        if write.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => received.lock().await.push(text),
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
}
