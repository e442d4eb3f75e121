//! Integration tests for the chat room WebSocket endpoint.

mod common;

use agora_server::domain::{ChatStore, ConnectionRegistry};
use common::{TestServer, assert_silent, connect, recv_close_code, recv_json, send_text};
use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn test_buyer_and_seller_exchange_messages() {
    // テスト項目: buyer と seller がやり取りし、退出後の再参加で過去のメッセージは再送されない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.join(&server.alice).await;
    let mut bob = server.join(&server.bob).await;

    // when (操作): alice → bob
    send_text(&mut alice, "is this still available?").await;

    // then (期待する結果): 両者に同じフレームが届く（送信者へのエコーを含む）
    let to_alice = recv_json(&mut alice).await;
    let to_bob = recv_json(&mut bob).await;
    assert_eq!(to_alice, to_bob);
    assert_eq!(to_alice["type"], "message");
    assert_eq!(to_alice["text"], "is this still available?");
    assert_eq!(to_alice["author_id"], server.alice.id.value());
    assert_eq!(to_alice["author_name"], "alice");
    assert_eq!(to_alice["chat_id"], server.chat.id.value());

    // when (操作): bob → alice
    send_text(&mut bob, "yes").await;

    // then (期待する結果):
    let to_alice = recv_json(&mut alice).await;
    let to_bob = recv_json(&mut bob).await;
    assert_eq!(to_alice, to_bob);
    assert_eq!(to_alice["text"], "yes");

    // when (操作): bob が退出し、alice だけが送信する
    bob.close(None).await.expect("close");
    assert!(server.wait_for_connections(1).await);
    send_text(&mut alice, "are you there?").await;
    assert_eq!(recv_json(&mut alice).await["text"], "are you there?");

    // then (期待する結果): 再参加した bob には新しいメッセージだけが届く
    let mut bob = server.join(&server.bob).await;
    assert_silent(&mut bob).await;
    send_text(&mut alice, "welcome back").await;
    assert_eq!(recv_json(&mut bob).await["text"], "welcome back");
    assert_eq!(recv_json(&mut alice).await["text"], "welcome back");
}

#[tokio::test]
async fn test_outsider_is_rejected_with_4403() {
    // テスト項目: 参加者でないユーザーは 4403 で閉じられ、レジストリに登録されない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.join(&server.alice).await;

    // when (操作):
    let token = server.token(&server.dave);
    let mut dave = connect(&server.ws_url(server.chat.id.value(), Some(&token))).await;

    // then (期待する結果):
    assert_eq!(recv_close_code(&mut dave).await, Some(4403));
    assert_eq!(server.registry.connection_count(), 1);

    // alice のルームには影響しない
    send_text(&mut alice, "still here").await;
    assert_eq!(recv_json(&mut alice).await["text"], "still here");
}

#[tokio::test]
async fn test_invalid_or_missing_token_is_rejected_with_4401() {
    // テスト項目: 不正なトークン・トークンなしは 4401
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let mut forged = connect(&server.ws_url(server.chat.id.value(), Some("not.a.jwt"))).await;
    let mut anonymous = connect(&server.ws_url(server.chat.id.value(), None)).await;

    // then (期待する結果):
    assert_eq!(recv_close_code(&mut forged).await, Some(4401));
    assert_eq!(recv_close_code(&mut anonymous).await, Some(4401));
    assert_eq!(server.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_unknown_chat_is_rejected_with_4404() {
    // テスト項目: 存在しないチャットは 4404
    // given (前提条件):
    let server = TestServer::start().await;
    let token = server.token(&server.alice);

    // when (操作):
    let mut ws = connect(&server.ws_url(999, Some(&token))).await;

    // then (期待する結果):
    assert_eq!(recv_close_code(&mut ws).await, Some(4404));
    assert_eq!(server.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_members_receive_messages_in_identical_order() {
    // テスト項目: 両者が続けて送信しても、全メンバーが永続化順と同じ順序で受信する
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.join(&server.alice).await;
    let mut bob = server.join(&server.bob).await;

    // when (操作):
    for i in 0..10 {
        send_text(&mut alice, &format!("alice {i}")).await;
        send_text(&mut bob, &format!("bob {i}")).await;
    }

    // then (期待する結果):
    let mut alice_ids = Vec::new();
    let mut bob_ids = Vec::new();
    for _ in 0..20 {
        alice_ids.push(recv_json(&mut alice).await["message_id"].as_i64().unwrap());
        bob_ids.push(recv_json(&mut bob).await["message_id"].as_i64().unwrap());
    }
    assert_eq!(alice_ids, bob_ids);

    let history: Vec<i64> = server
        .store
        .list_messages(server.chat.id)
        .await
        .unwrap()
        .iter()
        .map(|message| message.id.value())
        .collect();
    assert_eq!(alice_ids, history);
}

#[tokio::test]
async fn test_invalid_frames_keep_connection_open() {
    // テスト項目: 空メッセージ・不正な JSON・バイナリは破棄され、接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.join(&server.alice).await;

    // when (操作):
    send_text(&mut alice, "   ").await;
    alice.send(Message::text("not json")).await.unwrap();
    alice.send(Message::binary(vec![1, 2, 3])).await.unwrap();
    send_text(&mut alice, "after").await;

    // then (期待する結果): 最初に届くのは有効なメッセージ
    assert_eq!(recv_json(&mut alice).await["text"], "after");
    assert_eq!(server.store.list_messages(server.chat.id).await.unwrap().len(), 1);
    assert_eq!(server.registry.connection_count(), 1);
}

#[tokio::test]
async fn test_same_user_on_two_connections() {
    // テスト項目: 同一ユーザーの 2 接続はどちらもメッセージを受信する
    // given (前提条件):
    let server = TestServer::start().await;
    let mut phone = server.join(&server.alice).await;
    let mut laptop = server.join(&server.alice).await;
    let mut bob = server.join(&server.bob).await;

    // when (操作):
    send_text(&mut bob, "hello").await;

    // then (期待する結果):
    assert_eq!(recv_json(&mut phone).await["text"], "hello");
    assert_eq!(recv_json(&mut laptop).await["text"], "hello");
    assert_eq!(recv_json(&mut bob).await["text"], "hello");
    assert_eq!(server.registry.members(server.chat.id).len(), 3);
}

#[tokio::test]
async fn test_abrupt_disconnect_releases_entry() {
    // テスト項目: close フレームなしで切断してもレジストリは元の数に戻る
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.join(&server.alice).await;
    let bob = server.join(&server.bob).await;

    // when (操作):
    drop(bob);

    // then (期待する結果):
    assert!(server.wait_for_connections(1).await);
    send_text(&mut alice, "anyone?").await;
    assert_eq!(recv_json(&mut alice).await["text"], "anyone?");
}

#[tokio::test]
async fn test_shutdown_closes_sessions_with_going_away() {
    // テスト項目: シャットダウン時に全セッションへ 1001 の close が送られる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.join(&server.alice).await;
    let mut bob = server.join(&server.bob).await;
    let registry = server.registry.clone();

    // when (操作):
    let shutdown = tokio::spawn(server.shutdown());

    // then (期待する結果):
    assert_eq!(recv_close_code(&mut alice).await, Some(1001));
    assert_eq!(recv_close_code(&mut bob).await, Some(1001));
    shutdown.await.unwrap().unwrap();
    assert_eq!(registry.connection_count(), 0);
}
