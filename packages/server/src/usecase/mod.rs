//! UseCase 層
//!
//! ドメインの trait（ChatStore / IdentityVerifier / ConnectionRegistry）を組み合わせて
//! チャットの操作を実装します。UI 層はここに定義されたユースケースだけを呼び出します。

mod authenticate;
mod connect_participant;
mod disconnect_participant;
mod error;
mod get_message_history;
mod get_rooms;
mod list_my_chats;
mod membership_guard;
mod send_message;

pub use authenticate::authenticate;
pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{AuthorizeError, ConnectError, HistoryError, ListChatsError, PublishError};
pub use get_message_history::GetMessageHistoryUseCase;
pub use get_rooms::GetRoomsUseCase;
pub use list_my_chats::ListMyChatsUseCase;
pub use membership_guard::MembershipGuard;
pub use send_message::{PublishOutcome, SendMessageUseCase};

#[cfg(test)]
pub(crate) mod testing;
