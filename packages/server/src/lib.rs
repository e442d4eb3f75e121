//! Real-time chat server for the Agora marketplace.
//!
//! Buyers and sellers talk in per-chat rooms over WebSocket. Every message is
//! persisted before it is broadcast, and every member of a room (the sender
//! included) receives the messages of that room in the same order.

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
