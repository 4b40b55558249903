use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use teloxide::{
    types::{BotCommand, Chat, Message, UserId},
    utils::command::BotCommands,
};

use crate::{domain::StickyContent, telegram::types::StickyCommand};

const PUBLIC_COMMANDS: [&str; 3] = ["help", "sticky_status", "chatid"];

/// First whitespace-separated token as a number of minutes.
pub fn parse_minutes(arg: &str) -> Option<i64> {
    arg.split_whitespace().next()?.parse::<i64>().ok()
}

pub fn is_group_chat(chat: &Chat) -> bool {
    chat.is_group() || chat.is_supergroup()
}

/// Group traffic that pushes the sticky down. The bot's own posts never do,
/// otherwise each repost would schedule the next one.
pub fn qualifies_for_activity(msg: &Message, bot_id: UserId) -> bool {
    is_group_chat(&msg.chat) && !msg.from.as_ref().is_some_and(|user| user.id == bot_id)
}

pub fn has_media(msg: &Message) -> bool {
    msg.photo().is_some()
        || msg.video().is_some()
        || msg.animation().is_some()
        || msg.document().is_some()
        || msg.audio().is_some()
        || msg.voice().is_some()
        || msg.video_note().is_some()
}

pub fn format_deadline(now: DateTime<Utc>, remaining: Duration, tz: &Tz) -> String {
    let remaining =
        chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::zero());
    let until = (now + remaining).with_timezone(tz);
    let minutes_left = (remaining.num_seconds() + 59) / 60;
    format!("{} ({minutes_left} min left)", until.format("%H:%M"))
}

pub fn describe_content(content: &StickyContent) -> String {
    match content {
        StickyContent::Text(text) => {
            let preview: String = text.chars().take(60).collect();
            if preview.len() < text.len() {
                format!("text: \"{preview}…\"")
            } else {
                format!("text: \"{preview}\"")
            }
        }
        StickyContent::CopyOf {
            source_message_id, ..
        } => format!("copy of message {}", source_message_id.0),
    }
}

pub fn public_command_list() -> Vec<BotCommand> {
    StickyCommand::bot_commands()
        .into_iter()
        .filter(|cmd| PUBLIC_COMMANDS.contains(&cmd.command.trim_start_matches('/')))
        .collect()
}

pub fn admin_command_list() -> Vec<BotCommand> {
    StickyCommand::bot_commands()
}
