//! Shared helpers for the integration tests.
//!
//! Each test starts the real axum server in-process on an ephemeral port,
//! seeded with a buyer (alice), a seller (bob), an outsider (dave) and one chat
//! between alice and bob.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use agora_server::{
    domain::{Chat, ChatStore, ConnectionRegistry, ProductId, UserIdentity},
    infrastructure::{
        identity::{JwtIdentityVerifier, issue_token},
        registry::InMemoryConnectionRegistry,
        store::InMemoryChatStore,
    },
    ui::Server,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

pub const SECRET: &str = "integration-test-secret";
pub const TIMEOUT: Duration = Duration::from_secs(5);

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Helper struct to manage the in-process server lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryChatStore>,
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub alice: UserIdentity,
    pub bob: UserIdentity,
    pub dave: UserIdentity,
    pub chat: Chat,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let store = Arc::new(InMemoryChatStore::new());
        let alice = store.insert_user("alice").await;
        let bob = store.insert_user("bob").await;
        let dave = store.insert_user("dave").await;
        let chat = store
            .start_chat(alice.id, bob.id, ProductId::new(1))
            .await
            .expect("start chat");

        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let verifier = Arc::new(JwtIdentityVerifier::new(SECRET, store.clone()));
        let server = Server::assemble(store.clone(), verifier, registry.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async {
            let _ = shutdown_rx.await;
        }));

        TestServer {
            addr,
            store,
            registry,
            alice,
            bob,
            dave,
            chat,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn token(&self, user: &UserIdentity) -> String {
        issue_token(SECRET, user.id, 3600).expect("issue token")
    }

    pub fn ws_url(&self, chat_id: i64, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws/chats/{}?token={}", self.addr, chat_id, token),
            None => format!("ws://{}/ws/chats/{}", self.addr, chat_id),
        }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Connect `user` to the seeded chat and wait until the server registered the entry
    pub async fn join(&self, user: &UserIdentity) -> WsClient {
        let before = self.registry.connection_count();
        let ws = connect(&self.ws_url(self.chat.id.value(), Some(&self.token(user)))).await;
        assert!(
            self.wait_for_connections(before + 1).await,
            "{} was not registered",
            user.name
        );
        ws
    }

    /// Poll the registry until it holds `expected` entries
    pub async fn wait_for_connections(&self, expected: usize) -> bool {
        tokio::time::timeout(TIMEOUT, async {
            while self.registry.connection_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    /// Trigger graceful shutdown and wait for the server to finish
    pub async fn shutdown(mut self) -> std::io::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.expect("server task"),
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn connect(url: &str) -> WsClient {
    let (ws, _response) = connect_async(url).await.expect("websocket handshake");
    ws
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    let frame = serde_json::json!({ "text": text }).to_string();
    ws.send(Message::text(frame)).await.expect("send frame");
}

/// Next text frame as JSON, skipping control frames
pub async fn recv_json(ws: &mut WsClient) -> Value {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).expect("json frame");
                }
                Some(Ok(Message::Close(frame))) => panic!("connection closed: {frame:?}"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("websocket error: {e}"),
                None => panic!("connection ended"),
            }
        }
    })
    .await
    .expect("timed out waiting for a frame")
}

/// Close code sent by the server, or `None` if the stream ended without a close frame
pub async fn recv_close_code(ws: &mut WsClient) -> Option<u16> {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(frame))) => return frame.map(|f| u16::from(f.code)),
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return None,
            }
        }
    })
    .await
    .expect("timed out waiting for close")
}

/// Assert that no text frame arrives within a short window
pub async fn assert_silent(ws: &mut WsClient) {
    let next = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = next {
        panic!("unexpected frame: {text}");
    }
}
