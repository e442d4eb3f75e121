//! 接続レジストリの実装
//!
//! - `inmemory`: プロセス内の HashMap を使った実装（単一プロセス構成）

pub mod inmemory;

pub use inmemory::InMemoryConnectionRegistry;
