//! Bot API payloads for handler tests.

use serde_json::{json, Value};
use teloxide::types::{ChatId, Message, UserId};

fn message(chat: Value, message_id: i32, from: Value, text: &str) -> Message {
    serde_json::from_value(json!({
        "message_id": message_id,
        "date": 1_700_000_000,
        "chat": chat,
        "from": from,
        "text": text,
    }))
    .expect("fixture message should deserialize")
}

fn supergroup(chat_id: ChatId) -> Value {
    json!({ "id": chat_id.0, "type": "supergroup", "title": "Test group" })
}

fn user(user_id: UserId, is_bot: bool) -> Value {
    json!({ "id": user_id.0, "is_bot": is_bot, "first_name": "Tester" })
}

pub fn group_message(chat_id: ChatId, message_id: i32, from: UserId, text: &str) -> Message {
    message(supergroup(chat_id), message_id, user(from, false), text)
}

pub fn bot_message(chat_id: ChatId, message_id: i32, bot_id: UserId) -> Message {
    message(supergroup(chat_id), message_id, user(bot_id, true), "Pinned rules")
}

pub fn private_message(from: UserId, message_id: i32, text: &str) -> Message {
    let chat = json!({ "id": from.0, "type": "private", "first_name": "Tester" });
    message(chat, message_id, user(from, false), text)
}
