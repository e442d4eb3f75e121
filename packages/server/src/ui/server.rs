//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    domain::{ChatStore, ConnectionRegistry, IdentityVerifier},
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetMessageHistoryUseCase,
        GetRoomsUseCase, ListMyChatsUseCase, MembershipGuard, SendMessageUseCase,
    },
};

use super::{
    handler::{
        debug_rooms, get_message_history, health_check, list_my_chats, websocket_handler,
    },
    signal::shutdown_signal,
    state::{AppState, SessionTracker},
};

/// How long shutdown waits for WebSocket sessions to flush their close frames
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Marketplace chat server
///
/// # Example
///
/// ```ignore
/// let server = Server::assemble(store, verifier, registry);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance from its use cases
    pub fn new(
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        get_message_history_usecase: Arc<GetMessageHistoryUseCase>,
        list_my_chats_usecase: Arc<ListMyChatsUseCase>,
        get_rooms_usecase: Arc<GetRoomsUseCase>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                connect_participant_usecase,
                disconnect_participant_usecase,
                send_message_usecase,
                get_message_history_usecase,
                list_my_chats_usecase,
                get_rooms_usecase,
                sessions: SessionTracker::default(),
            }),
        }
    }

    /// Wire every use case on top of the given store, verifier and registry
    pub fn assemble(
        store: Arc<dyn ChatStore>,
        verifier: Arc<dyn IdentityVerifier>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        let guard = Arc::new(MembershipGuard::new(store.clone()));

        Self::new(
            Arc::new(ConnectParticipantUseCase::new(
                verifier.clone(),
                guard.clone(),
                registry.clone(),
            )),
            Arc::new(DisconnectParticipantUseCase::new(registry.clone())),
            Arc::new(SendMessageUseCase::new(store.clone(), registry.clone())),
            Arc::new(GetMessageHistoryUseCase::new(
                verifier.clone(),
                guard,
                store.clone(),
            )),
            Arc::new(ListMyChatsUseCase::new(verifier, store)),
            Arc::new(GetRoomsUseCase::new(registry)),
        )
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws/chats/{chat_id}", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/chats/my", get(list_my_chats))
            .route("/api/chats/{chat_id}/messages", get(get_message_history))
            .route("/debug/rooms", get(debug_rooms))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the chat server until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws/chats/{{chat_id}}?token=...", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// On shutdown every open WebSocket session receives a 1001 close frame.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let state = self.state.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                state.disconnect_participant_usecase.disconnect_all();
            })
            .await?;

        // Sessions whose handshake finished during shutdown
        self.state.disconnect_participant_usecase.disconnect_all();
        if !self.state.sessions.wait_idle(SESSION_DRAIN_TIMEOUT).await {
            tracing::warn!(
                "{} sessions still open after {:?}",
                self.state.sessions.active(),
                SESSION_DRAIN_TIMEOUT
            );
        }

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
