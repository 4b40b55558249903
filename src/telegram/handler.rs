use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use teloxide::{
    dispatching::Dispatcher,
    error_handlers::ErrorHandler,
    prelude::*,
    types::{BotCommandScope, Me, Message},
    update_listeners,
    utils::command::BotCommands,
};
use tokio::time::Instant;

use crate::{
    config::AppConfig,
    domain::StickyContent,
    infrastructure::{notifier::notify_admin_group, shutdown::ShutdownListener},
};

use super::{
    types::{is_chat_admin, AppState, BotResult, StickyCommand},
    utils::{
        admin_command_list, describe_content, format_deadline, has_media, is_group_chat,
        parse_minutes, public_command_list, qualifies_for_activity,
    },
};

pub struct TelegramService {
    bot: Bot,
    state: Arc<AppState>,
}

#[derive(Default)]
struct WatchdogState {
    first_error_at: Option<Instant>,
    consecutive_errors: u32,
    last_alert_at: Option<Instant>,
}

#[derive(Clone, Copy, Debug)]
enum NetworkIssueKind {
    Timeout,
    Connection,
    Other,
}

impl NetworkIssueKind {
    fn label(&self) -> &'static str {
        match self {
            NetworkIssueKind::Timeout => "request timeout",
            NetworkIssueKind::Connection => "connection failure",
            NetworkIssueKind::Other => "network error",
        }
    }
}

/// Logs update-listener failures and alerts the admin group when network
/// errors keep piling up inside the configured window.
struct UpdateListenerWatchdog {
    bot: Bot,
    config: Arc<AppConfig>,
    state: Mutex<WatchdogState>,
}

impl UpdateListenerWatchdog {
    fn new(bot: Bot, config: Arc<AppConfig>) -> Arc<Self> {
        Arc::new(Self {
            bot,
            config,
            state: Mutex::new(WatchdogState::default()),
        })
    }

    async fn process_error(self: Arc<Self>, error: teloxide::RequestError) {
        let Some(kind) = Self::classify_network_issue(&error) else {
            tracing::error!(target: "telegram", error = %error, "update listener error");
            return;
        };

        let now = Instant::now();
        let alert = {
            let mut state = self.state.lock();
            let resilience = &self.config.resilience;

            if state
                .first_error_at
                .map(|ts| now.duration_since(ts) > resilience.network_error_window)
                .unwrap_or(true)
            {
                state.first_error_at = Some(now);
                state.consecutive_errors = 0;
            }
            state.consecutive_errors = state.consecutive_errors.saturating_add(1);
            let consecutive = state.consecutive_errors;

            tracing::error!(
                target: "telegram",
                issue = kind.label(),
                consecutive,
                error = %error,
                "Telegram polling network failure"
            );

            let cooling_down = state
                .last_alert_at
                .map(|ts| now.duration_since(ts) < resilience.alert_cooldown)
                .unwrap_or(false);
            if consecutive >= resilience.network_error_threshold && !cooling_down {
                state.last_alert_at = Some(now);
                Some(consecutive)
            } else {
                None
            }
        };

        if let Some(consecutive) = alert {
            let summary = format!(
                "Update listener reported {consecutive} consecutive {} errors.\nLast error: {error}",
                kind.label()
            );
            notify_admin_group(&self.bot, self.config.as_ref(), &summary).await;
        }
    }

    fn classify_network_issue(error: &teloxide::RequestError) -> Option<NetworkIssueKind> {
        match error {
            teloxide::RequestError::Network(source) => {
                let req_err = source.as_ref();
                let kind = if req_err.is_timeout() {
                    NetworkIssueKind::Timeout
                } else if req_err.is_connect() {
                    NetworkIssueKind::Connection
                } else {
                    NetworkIssueKind::Other
                };
                Some(kind)
            }
            _ => None,
        }
    }
}

impl ErrorHandler<teloxide::RequestError> for UpdateListenerWatchdog {
    fn handle_error(self: Arc<Self>, error: teloxide::RequestError) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.process_error(error).await;
        })
    }
}

impl TelegramService {
    pub fn new(bot: Bot, state: Arc<AppState>) -> Self {
        Self { bot, state }
    }

    pub async fn run(&self, mut shutdown: ShutdownListener) -> Result<()> {
        self.sync_commands().await?;
        let me = self.bot.get_me().await?;
        if let Some(expected_username) = &self.state.config.bot_username {
            if me.username.as_deref() != Some(expected_username.as_str()) {
                tracing::warn!(
                    target: "telegram",
                    expected = expected_username.as_str(),
                    actual = ?me.username,
                    "BOT_USERNAME does not match the bot account"
                );
            }
        }
        tracing::info!(
            target: "telegram",
            bot_id = me.id.0,
            username = ?me.username,
            "connected to Telegram"
        );

        let handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<StickyCommand>()
                    .endpoint(Self::on_command),
            )
            .branch(dptree::endpoint(Self::on_plain_message));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.state.clone()])
            .default_handler(|update| async move {
                tracing::debug!(target: "telegram", ?update, "unhandled update");
            })
            .build();

        let listener = update_listeners::polling_default(self.bot.clone()).await;
        let watchdog = UpdateListenerWatchdog::new(self.bot.clone(), self.state.config.clone());

        let shutdown_token = dispatcher.shutdown_token();
        let mut dispatcher_future = Box::pin(dispatcher.dispatch_with_listener(listener, watchdog));
        let mut dispatcher_finished = false;

        tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!(target: "telegram", "dispatcher shutdown requested");
                if let Ok(wait) = shutdown_token.shutdown() {
                    wait.await;
                }
            }
            _ = &mut dispatcher_future => {
                dispatcher_finished = true;
                tracing::info!(target: "telegram", "dispatcher stopped");
            }
        }

        if !dispatcher_finished {
            dispatcher_future.await;
        }

        Ok(())
    }

    /// Every ordinary group message that the bot did not write itself.
    async fn on_plain_message(msg: Message, me: Me, state: Arc<AppState>) -> BotResult<()> {
        if !qualifies_for_activity(&msg, me.id) {
            return Ok(());
        }

        state.media.on_message(msg.chat.id, msg.id, has_media(&msg));
        state.sticky.on_activity(msg.chat.id).await;
        Ok(())
    }

    async fn on_command(msg: Message, cmd: StickyCommand, state: Arc<AppState>) -> BotResult<()> {
        let reposted = match cmd {
            StickyCommand::Help => {
                let help = StickyCommand::descriptions().to_string();
                Self::notice(&msg, &state, &help).await;
                false
            }
            StickyCommand::Chatid => {
                Self::notice(&msg, &state, &format!("Chat id: {}", msg.chat.id)).await;
                false
            }
            StickyCommand::StickyStatus => {
                Self::sticky_status(&msg, &state).await;
                false
            }
            StickyCommand::Sticky(text) => {
                Self::authorize(&msg, &state).await && Self::set_sticky(&msg, &state, &text).await
            }
            StickyCommand::Unsticky => {
                Self::authorize(&msg, &state).await && Self::unsticky(&msg, &state).await
            }
            StickyCommand::SetTime(arg) => {
                if Self::authorize(&msg, &state).await {
                    Self::set_time(&msg, &state, &arg).await;
                }
                false
            }
            StickyCommand::ClearMedia(arg) => {
                if Self::authorize(&msg, &state).await {
                    let policy = state
                        .media
                        .registry()
                        .enable(msg.chat.id, parse_minutes(&arg));
                    tracing::info!(
                        target: "admin",
                        chat_id = msg.chat.id.0,
                        delay_minutes = policy.delay_minutes,
                        "media auto-delete enabled"
                    );
                    let reply = format!(
                        "Media will be deleted {} min after it is posted.",
                        policy.delay_minutes
                    );
                    Self::notice(&msg, &state, &reply).await;
                }
                false
            }
            StickyCommand::AllowMedia => {
                if Self::authorize(&msg, &state).await {
                    let reply = match state.media.registry().disable(msg.chat.id) {
                        Some(_) => "Media is no longer deleted.",
                        None => "Media auto-delete was not enabled.",
                    };
                    tracing::info!(
                        target: "admin",
                        chat_id = msg.chat.id.0,
                        "media auto-delete disabled"
                    );
                    Self::notice(&msg, &state, reply).await;
                }
                false
            }
        };

        if is_group_chat(&msg.chat) {
            Self::cleanup_command(&msg, &state);
            // A sticky that was just posted or removed is already below the command.
            if !reposted {
                state.sticky.on_activity(msg.chat.id).await;
            }
        }
        Ok(())
    }

    /// Returns whether the sticky was (re)posted.
    async fn set_sticky(msg: &Message, state: &AppState, text: &str) -> bool {
        let text = text.trim();
        let content = if !text.is_empty() {
            StickyContent::Text(text.to_string())
        } else if let Some(reply) = msg.reply_to_message() {
            StickyContent::CopyOf {
                source_chat_id: reply.chat.id,
                source_message_id: reply.id,
            }
        } else {
            let usage = "Send /sticky <text>, or reply to a message with /sticky.";
            Self::notice(msg, state, usage).await;
            return false;
        };

        let minutes = state.sticky.limits().default_minutes();
        let reply = format!(
            "Sticky set for {minutes} min. It will be reposted at the bottom after new messages."
        );
        // Confirm first so the sticky itself ends up below the confirmation.
        Self::notice(msg, state, &reply).await;
        state.sticky.activate(msg.chat.id, content, None).await;
        tracing::info!(target: "admin", chat_id = msg.chat.id.0, "sticky set");
        true
    }

    /// Returns whether a sticky was removed.
    async fn unsticky(msg: &Message, state: &AppState) -> bool {
        let removed = state.sticky.deactivate(msg.chat.id).await;
        let reply = if removed {
            "Sticky removed."
        } else {
            "There is no sticky in this chat."
        };
        Self::notice(msg, state, reply).await;
        removed
    }

    async fn set_time(msg: &Message, state: &AppState, arg: &str) {
        let reply = match state.sticky.extend(msg.chat.id, parse_minutes(arg)).await {
            Some(until) => {
                let remaining = until.saturating_duration_since(Instant::now());
                format!(
                    "Sticky active until {}.",
                    format_deadline(Utc::now(), remaining, &state.timezone())
                )
            }
            None => "There is no sticky to extend; set one with /sticky first.".to_string(),
        };
        Self::notice(msg, state, &reply).await;
    }

    async fn sticky_status(msg: &Message, state: &AppState) {
        let reply = match state.sticky.status(msg.chat.id).await {
            Some(snapshot) => {
                let posted = snapshot
                    .current_message_id
                    .map(|id| format!(", posted as message {}", id.0))
                    .unwrap_or_else(|| ", waiting for the next repost".to_string());
                format!(
                    "Sticky ({}{posted}) active until {}.",
                    describe_content(&snapshot.content),
                    format_deadline(Utc::now(), snapshot.remaining, &state.timezone())
                )
            }
            None => "There is no active sticky in this chat.".to_string(),
        };
        Self::notice(msg, state, &reply).await;
    }

    /// Group-only and admin-only gate for state-changing commands.
    async fn authorize(msg: &Message, state: &AppState) -> bool {
        if !is_group_chat(&msg.chat) {
            Self::notice(msg, state, "This command only works in groups.").await;
            return false;
        }
        if !is_chat_admin(state.transport.as_ref(), msg).await {
            Self::notice(msg, state, "Only chat admins can use this command.").await;
            return false;
        }
        true
    }

    /// Replies in the chat; in groups the reply is removed after the notice TTL.
    /// A failed reply is logged and never aborts the command.
    async fn notice(msg: &Message, state: &AppState, text: &str) {
        let sent = match state.transport.send_text(msg.chat.id, text).await {
            Ok(message_id) => message_id,
            Err(err) => {
                tracing::warn!(
                    target: "telegram",
                    error = %err,
                    chat_id = msg.chat.id.0,
                    "failed to send reply"
                );
                return;
            }
        };
        if let (true, Some(ttl)) = (is_group_chat(&msg.chat), state.config.notices.ttl) {
            state.deletions.schedule_deletion(msg.chat.id, sent, ttl);
        }
    }

    fn cleanup_command(msg: &Message, state: &AppState) {
        if !state.config.notices.cleanup_commands {
            return;
        }
        if let Some(ttl) = state.config.notices.ttl {
            state.deletions.schedule_deletion(msg.chat.id, msg.id, ttl);
        }
    }

    async fn sync_commands(&self) -> BotResult<()> {
        self.bot.set_my_commands(public_command_list()).await?;
        self.bot
            .set_my_commands(admin_command_list())
            .scope(BotCommandScope::AllChatAdministrators)
            .await?;
        tracing::info!(target: "telegram", "bot commands synced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use teloxide::types::{ChatId, MessageId, UserId};
    use tokio::time::sleep;

    use super::*;
    use crate::{
        config::{
            env::{LoggingConfig, MediaConfig, NoticeConfig, ResilienceConfig, StickyConfig},
            DirectoryConfig,
        },
        domain::{MemberRole, MinutesRange},
        state::MediaPolicyRegistry,
        tasks::{DeletionScheduler, MediaPolicyService, StickyScheduler, TimerService},
        telegram::fixtures,
        transport::{
            fake::{Call, FakeTransport},
            Transport,
        },
    };

    const GROUP: ChatId = ChatId(-1001);
    const ADMIN: UserId = UserId(1);
    const MEMBER: UserId = UserId(2);
    const DEBOUNCE: Duration = Duration::from_millis(800);

    fn config() -> AppConfig {
        AppConfig {
            telegram_bot_token: "test-token".into(),
            bot_username: None,
            admin_group_id: None,
            directories: DirectoryConfig {
                logs_dir: "logs".into(),
            },
            logging: LoggingConfig {
                level: "info".into(),
            },
            timezone: "UTC".into(),
            sticky: StickyConfig {
                debounce: DEBOUNCE,
                minutes: MinutesRange::new(1, 20, 5).unwrap(),
            },
            media: MediaConfig {
                minutes: MinutesRange::new(1, 60, 5).unwrap(),
            },
            notices: NoticeConfig {
                ttl: None,
                cleanup_commands: false,
            },
            resilience: ResilienceConfig {
                network_error_window: Duration::from_secs(60),
                network_error_threshold: 5,
                alert_cooldown: Duration::from_secs(600),
            },
        }
    }

    fn app_state() -> (Arc<FakeTransport>, Arc<AppState>) {
        let config = Arc::new(config());
        let fake = Arc::new(FakeTransport::new());
        fake.set_role(GROUP, ADMIN, MemberRole::Administrator);
        fake.set_role(GROUP, MEMBER, MemberRole::Member);

        let transport: Arc<dyn Transport> = fake.clone();
        let timers = TimerService::new();
        let sticky = StickyScheduler::new(
            transport.clone(),
            timers.clone(),
            config.sticky.debounce,
            config.sticky.minutes,
        );
        let deletions = Arc::new(DeletionScheduler::new(transport.clone(), timers));
        let media = Arc::new(MediaPolicyService::new(
            MediaPolicyRegistry::new(config.media.minutes),
            deletions.clone(),
        ));
        let state = Arc::new(AppState {
            config,
            transport,
            sticky,
            media,
            deletions,
        });
        (fake, state)
    }

    fn rules() -> StickyContent {
        StickyContent::Text("Rules".into())
    }

    async fn command(state: &Arc<AppState>, from: UserId, text: &str, cmd: StickyCommand) {
        let msg = fixtures::group_message(GROUP, 10, from, text);
        TelegramService::on_command(msg, cmd, state.clone())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_sticky_command_still_moves_the_sticky_down() {
        let (transport, state) = app_state();
        state.sticky.activate(GROUP, rules(), Some(5)).await;

        command(&state, MEMBER, "/sticky spam", StickyCommand::Sticky("spam".into())).await;
        sleep(DEBOUNCE * 2).await;

        let calls = transport.calls();
        assert_eq!(
            calls[1],
            Call::Send(GROUP, "Only chat admins can use this command.".into(), MessageId(101))
        );
        assert_eq!(
            calls[2..],
            [
                Call::Delete(GROUP, MessageId(100)),
                Call::Send(GROUP, "Rules".into(), MessageId(102)),
            ]
        );
        let status = state.sticky.status(GROUP).await.unwrap();
        assert_eq!(status.content, rules());
    }

    #[tokio::test(start_paused = true)]
    async fn sticky_usage_reply_counts_as_activity() {
        let (transport, state) = app_state();
        state.sticky.activate(GROUP, rules(), Some(5)).await;

        command(&state, ADMIN, "/sticky", StickyCommand::Sticky(String::new())).await;
        sleep(DEBOUNCE * 2).await;

        assert_eq!(
            transport.calls().last(),
            Some(&Call::Send(GROUP, "Rules".into(), MessageId(102)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn posted_sticky_is_not_reposted_for_its_own_command() {
        let (transport, state) = app_state();

        command(&state, ADMIN, "/sticky hello", StickyCommand::Sticky("hello".into())).await;
        sleep(DEBOUNCE * 2).await;

        assert_eq!(transport.sends(), vec![MessageId(100), MessageId(101)]);
        assert!(transport.deletes().is_empty());
        let status = state.sticky.status(GROUP).await.unwrap();
        assert_eq!(status.current_message_id, Some(MessageId(101)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_confirmation_does_not_block_activation() {
        let (transport, state) = app_state();
        transport.reject_texts_containing("Sticky set");

        command(&state, ADMIN, "/sticky hello", StickyCommand::Sticky("hello".into())).await;

        assert_eq!(
            transport.calls(),
            vec![Call::Send(GROUP, "hello".into(), MessageId(100))]
        );
        let status = state.sticky.status(GROUP).await.unwrap();
        assert_eq!(status.current_message_id, Some(MessageId(100)));
    }
}
