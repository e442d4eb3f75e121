//! Agora marketplace chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin agora-server
//! cargo run --bin agora-server -- --host 0.0.0.0 --port 3000 --database-url sqlite://agora.db
//! cargo run --bin agora-server -- --demo
//! ```

use std::sync::Arc;

use agora_server::{
    domain::{ChatStore, ProductId, UserDirectory, UserIdentity},
    infrastructure::{
        identity::{JwtIdentityVerifier, issue_token},
        registry::InMemoryConnectionRegistry,
        store::{InMemoryChatStore, SqliteChatStore},
    },
    ui::Server,
};
use agora_shared::logger::setup_logger;
use clap::Parser;

/// Lifetime of the tokens printed by `--demo`
const DEMO_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Parser, Debug)]
#[command(name = "agora-server")]
#[command(about = "Real-time chat server for the Agora marketplace", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// SQLite database URL (e.g. sqlite://agora.db). Messages are kept in memory when omitted
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Secret used to verify HS256 bearer tokens
    #[arg(long, env = "JWT_SECRET_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    jwt_secret: String,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seed a buyer, a seller, an outsider and one chat, and log their tokens
    #[arg(long)]
    demo: bool,
}

type Stores = (Arc<dyn ChatStore>, Arc<dyn UserDirectory>);

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = run(args).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.jwt_secret == "CHANGE_ME_IN_PRODUCTION" {
        tracing::warn!("Using the default JWT secret; set JWT_SECRET_KEY in production");
    }

    // Initialize dependencies in order:
    // 1. Store
    // 2. IdentityVerifier
    // 3. ConnectionRegistry
    // 4. Server (UseCases + AppState)
    let (store, directory) = open_store(&args).await?;
    let verifier = Arc::new(JwtIdentityVerifier::new(&args.jwt_secret, directory));
    let registry = Arc::new(InMemoryConnectionRegistry::new());

    Server::assemble(store, verifier, registry)
        .run(args.host, args.port)
        .await
}

async fn open_store(args: &Args) -> Result<Stores, Box<dyn std::error::Error>> {
    match args.database_url.as_deref() {
        None => {
            tracing::info!("Using in-memory chat store");
            let store = Arc::new(InMemoryChatStore::new());
            if args.demo {
                let users = [
                    store.insert_user("alice").await,
                    store.insert_user("bob").await,
                    store.insert_user("dave").await,
                ];
                seed_demo(store.as_ref(), &users, &args.jwt_secret).await?;
            }
            let stores: Stores = (store.clone(), store);
            Ok(stores)
        }
        Some(url) if url.starts_with("sqlite:") => {
            let store = Arc::new(SqliteChatStore::connect(url).await?);
            if args.demo {
                // 永続化されるので、再起動しても同じユーザー・チャットを使う
                let users = [
                    store.ensure_user("alice").await?,
                    store.ensure_user("bob").await?,
                    store.ensure_user("dave").await?,
                ];
                seed_demo(store.as_ref(), &users, &args.jwt_secret).await?;
            }
            let stores: Stores = (store.clone(), store);
            Ok(stores)
        }
        Some(url) => Err(format!(
            "unsupported database URL '{url}': only sqlite: URLs are supported"
        )
        .into()),
    }
}

/// alice (buyer) と bob (seller) のチャットを作成（既存なら再利用）し、全員のトークンを出力する
async fn seed_demo(
    store: &dyn ChatStore,
    users: &[UserIdentity; 3],
    secret: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let [buyer, seller, _outsider] = users;
    let chat = store
        .start_chat(buyer.id, seller.id, ProductId::new(1))
        .await?;
    tracing::info!("Demo chat {} between {} and {}", chat.id, buyer.name, seller.name);

    for user in users {
        let token = issue_token(secret, user.id, DEMO_TOKEN_TTL_SECS)?;
        tracing::info!("Token for {} (user {}): {}", user.name, user.id, token);
    }
    Ok(())
}
