//! エンティティ

use super::value_object::{ChatId, MessageId, MessageText, ProductId, Timestamp, UserId};

/// 認証済みユーザー
///
/// IdentityVerifier が生成し、接続の生存期間中は変化しません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    /// 表示名
    pub name: String,
}

impl UserIdentity {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// 商品をめぐる買い手と売り手のチャット
///
/// (buyer, seller, product) の組に対してチャットは高々 1 つ。buyer ≠ seller。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub product_id: ProductId,
    pub created_at: Timestamp,
}

impl Chat {
    /// buyer または seller であれば参加者
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.buyer_id == *user_id || self.seller_id == *user_id
    }
}

/// 永続化済みのメッセージ（不変）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub author_id: UserId,
    pub text: MessageText,
    pub created_at: Timestamp,
}

/// 「自分のチャット」一覧の 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat: Chat,
    pub last_message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_chat() -> Chat {
        Chat {
            id: ChatId::new(7),
            buyer_id: UserId::new(1),
            seller_id: UserId::new(2),
            product_id: ProductId::new(10),
            created_at: Timestamp::new(1000),
        }
    }

    #[test]
    fn test_buyer_and_seller_are_participants() {
        // テスト項目: buyer と seller は参加者として判定される
        // given (前提条件):
        let chat = create_test_chat();

        // when (操作):
        let buyer = chat.has_participant(&UserId::new(1));
        let seller = chat.has_participant(&UserId::new(2));

        // then (期待する結果):
        assert!(buyer);
        assert!(seller);
    }

    #[test]
    fn test_third_user_is_not_participant() {
        // テスト項目: buyer でも seller でもないユーザーは参加者ではない
        // given (前提条件):
        let chat = create_test_chat();

        // when (操作):
        let result = chat.has_participant(&UserId::new(3));

        // then (期待する結果):
        assert!(!result);
    }
}
