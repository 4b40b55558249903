use teloxide::prelude::*;

use crate::config::AppConfig;

/// Posts a plain-text status line to the configured admin group, if any.
/// Failures are only logged.
pub async fn notify_admin_group(bot: &Bot, config: &AppConfig, text: &str) {
    let Some(admin_group_id) = config.admin_group_id.filter(|id| *id != 0) else {
        return;
    };
    if let Err(err) = bot.send_message(ChatId(admin_group_id), text).await {
        tracing::warn!(
            target: "telegram",
            error = %err,
            admin_group_id,
            "failed to send admin notification"
        );
    }
}
