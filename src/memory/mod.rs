//! 会话层：消息与显式的 ChatSession

pub mod conversation;

pub use conversation::{ChatSession, Message, Role};
