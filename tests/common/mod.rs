#![allow(dead_code)]

use std::net::SocketAddr;

use newsroom_gateway::{Gateway, GatewayConfig, GatewayError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A gateway serving on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), GatewayError>>,
}

impl TestServer {
    pub async fn spawn(config: GatewayConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::spawn_on(listener, config)
    }

    /// Serve on an already-bound listener, so the address is known before startup.
    pub fn spawn_on(listener: TcpListener, config: GatewayConfig) -> Self {
        let addr = listener.local_addr().unwrap();
        let gateway = Gateway::build(config).unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(gateway.serve(listener, async move {
            let _ = rx.await;
        }));
        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}
