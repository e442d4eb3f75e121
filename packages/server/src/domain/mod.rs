//! ドメイン層
//!
//! チャットのエンティティ・値オブジェクト・エラー、および外部協調者
//! （ChatStore / UserDirectory / IdentityVerifier / ConnectionRegistry）の
//! インターフェースを定義します。具体的な実装は Infrastructure 層が提供します。

pub mod entity;
pub mod error;
pub mod identity;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use entity::{Chat, ChatSummary, Message, UserIdentity};
pub use error::{DeliveryError, StoreError, ValueError, VerifyError};
#[cfg(test)]
pub use identity::MockIdentityVerifier;
pub use identity::IdentityVerifier;
pub use registry::{
    ConnectionEntry, ConnectionRegistry, PushMessage, PusherChannel, RoomMembership, RoomSnapshot,
};
pub use repository::{ChatStore, UserDirectory};
pub use value_object::{ChatId, EntryId, MessageId, MessageText, ProductId, Timestamp, UserId};
