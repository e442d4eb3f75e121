//! SQLite ChatStore 実装
//!
//! `sqlx` の `SqlitePool` を使用します。タイムスタンプは UTC のミリ秒
//! （INTEGER）で保存します。
//!
//! `sqlite::memory:` の場合、接続ごとに別のデータベースになるため
//! プールの接続数を 1 に固定し、アイドル切断もしません。
//! ファイルの場合は WAL モードで複数接続を使い、書き込みロックは
//! `BUSY_TIMEOUT` まで待ちます。

use std::{str::FromStr, sync::Arc, time::Duration};

use agora_shared::time::{Clock, SystemClock};
use async_trait::async_trait;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::domain::{
    Chat, ChatId, ChatStore, ChatSummary, Message, MessageId, MessageText, ProductId, StoreError,
    Timestamp, UserDirectory, UserId, UserIdentity,
};

/// 書き込みロックの待ち時間（ファイルデータベースで複数接続が書き込む場合）
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        buyer_id INTEGER NOT NULL REFERENCES users(id),
        seller_id INTEGER NOT NULL REFERENCES users(id),
        product_id INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE (buyer_id, seller_id, product_id),
        CHECK (buyer_id <> seller_id)
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER NOT NULL REFERENCES chats(id),
        author_id INTEGER NOT NULL REFERENCES users(id),
        text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages (chat_id, id)",
];

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    name: String,
}

impl From<UserRow> for UserIdentity {
    fn from(row: UserRow) -> Self {
        UserIdentity::new(UserId::new(row.id), row.name)
    }
}

#[derive(Debug, FromRow)]
struct ChatRow {
    id: i64,
    buyer_id: i64,
    seller_id: i64,
    product_id: i64,
    created_at: i64,
}

impl From<ChatRow> for Chat {
    fn from(row: ChatRow) -> Self {
        Chat {
            id: ChatId::new(row.id),
            buyer_id: UserId::new(row.buyer_id),
            seller_id: UserId::new(row.seller_id),
            product_id: ProductId::new(row.product_id),
            created_at: Timestamp::new(row.created_at),
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    author_id: i64,
    text: String,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let text = MessageText::new(&row.text).map_err(|err| {
            StoreError::Unavailable(format!("message {} has invalid text: {err}", row.id))
        })?;
        Ok(Message {
            id: MessageId::new(row.id),
            chat_id: ChatId::new(row.chat_id),
            author_id: UserId::new(row.author_id),
            text,
            created_at: Timestamp::new(row.created_at),
        })
    }
}

/// SQLite ChatStore 実装
pub struct SqliteChatStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteChatStore {
    /// URL（例: `sqlite://agora.db`, `sqlite::memory:`）に接続してスキーマを作成する
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        let store = Self::new(pool);
        store.init_schema().await?;
        tracing::info!("Connected to SQLite store at {}", url);
        Ok(store)
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// ユーザーを登録する（シード・テスト用）
    pub async fn insert_user(&self, name: &str) -> Result<UserIdentity, StoreError> {
        let id = sqlx::query("INSERT INTO users (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(UserIdentity::new(UserId::new(id), name))
    }

    /// 同名のユーザーがいればそれを返し、いなければ登録する（デモ用シードの再実行用）
    pub async fn ensure_user(&self, name: &str) -> Result<UserIdentity, StoreError> {
        let existing = sqlx::query_as::<_, UserRow>(
            "SELECT id, name FROM users WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        match existing {
            Some(row) => Ok(row.into()),
            None => self.insert_user(name).await,
        }
    }

    async fn last_message(&self, chat_id: ChatId) -> Result<Option<Message>, StoreError> {
        sqlx::query_as::<_, MessageRow>(
            "SELECT id, chat_id, author_id, text, created_at FROM messages
             WHERE chat_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(chat_id.value())
        .fetch_optional(&self.pool)
        .await?
        .map(Message::try_from)
        .transpose()
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, StoreError> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, buyer_id, seller_id, product_id, created_at FROM chats WHERE id = ?",
        )
        .bind(chat_id.value())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Chat::from))
    }

    async fn start_chat(
        &self,
        buyer_id: UserId,
        seller_id: UserId,
        product_id: ProductId,
    ) -> Result<Chat, StoreError> {
        if buyer_id == seller_id {
            return Err(StoreError::InvalidChat(
                "buyer and seller must be different users".to_string(),
            ));
        }
        for user_id in [buyer_id, seller_id] {
            if self.find_user(user_id).await?.is_none() {
                return Err(StoreError::InvalidChat(format!("user {user_id} does not exist")));
            }
        }

        sqlx::query(
            "INSERT INTO chats (buyer_id, seller_id, product_id, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (buyer_id, seller_id, product_id) DO NOTHING",
        )
        .bind(buyer_id.value())
        .bind(seller_id.value())
        .bind(product_id.value())
        .bind(self.clock.now_millis())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, buyer_id, seller_id, product_id, created_at FROM chats
             WHERE buyer_id = ? AND seller_id = ? AND product_id = ?",
        )
        .bind(buyer_id.value())
        .bind(seller_id.value())
        .bind(product_id.value())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn create_message(
        &self,
        chat_id: ChatId,
        author_id: UserId,
        text: MessageText,
    ) -> Result<Message, StoreError> {
        // チャットは不変なので、参加者の判定は書き込みと別の文で行える
        let chat = self
            .get_chat(chat_id)
            .await?
            .ok_or(StoreError::ChatNotFound(chat_id))?;
        if !self.is_participant(&chat, &author_id) {
            return Err(StoreError::NotParticipant {
                chat_id,
                user_id: author_id,
            });
        }

        // created_at の下限の取得と INSERT は 1 文で行う（読み取りから書き込みへの昇格をしない）
        let now = self.clock.now_millis();
        let (id, created_at) = sqlx::query_as::<_, (i64, i64)>(
            "INSERT INTO messages (chat_id, author_id, text, created_at)
             SELECT ?, ?, ?, MAX(?, COALESCE((SELECT MAX(created_at) FROM messages WHERE chat_id = ?), ?))
             RETURNING id, created_at",
        )
        .bind(chat_id.value())
        .bind(author_id.value())
        .bind(text.as_str())
        .bind(now)
        .bind(chat_id.value())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        let created_at = Timestamp::new(created_at);

        Ok(Message {
            id: MessageId::new(id),
            chat_id,
            author_id,
            text,
            created_at,
        })
    }

    async fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, StoreError> {
        sqlx::query_as::<_, MessageRow>(
            "SELECT id, chat_id, author_id, text, created_at FROM messages
             WHERE chat_id = ? ORDER BY id ASC",
        )
        .bind(chat_id.value())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Message::try_from)
        .collect()
    }

    async fn list_chats_for_user(&self, user_id: UserId) -> Result<Vec<ChatSummary>, StoreError> {
        let rows = sqlx::query_as::<_, ChatRow>(
            "SELECT id, buyer_id, seller_id, product_id, created_at FROM chats
             WHERE buyer_id = ? OR seller_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.value())
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let chat = Chat::from(row);
            let last_message = self.last_message(chat.id).await?;
            summaries.push(ChatSummary { chat, last_message });
        }
        Ok(summaries)
    }
}

#[async_trait]
impl UserDirectory for SqliteChatStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserIdentity>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name FROM users WHERE id = ?")
            .bind(user_id.value())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserIdentity::from))
    }
}
