//! ChatStore / UserDirectory の実装
//!
//! - `inmemory`: HashMap をインメモリ DB として使う実装（開発・テスト用）
//! - `sqlite`: sqlx + SQLite による永続化

pub mod inmemory;
pub mod sqlite;

pub use inmemory::InMemoryChatStore;
pub use sqlite::SqliteChatStore;
