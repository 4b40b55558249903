use std::{sync::Arc, time::Duration};

use anyhow::Result;
use teloxide::prelude::*;
use tokio::time::timeout;

use crate::{
    config::AppConfig,
    infrastructure::{
        directories::ResolvedPaths, notifier::notify_admin_group, shutdown::Shutdown,
    },
    state::MediaPolicyRegistry,
    tasks::{DeletionScheduler, MediaPolicyService, StickyScheduler, TimerService},
    telegram::{AppState, TelegramService},
    transport::{TelegramTransport, Transport},
};

pub struct StickyKeeperApp {
    _paths: ResolvedPaths,
    telegram: TelegramService,
    sticky: Arc<StickyScheduler>,
    timers: TimerService,
    shutdown: Shutdown,
    config: Arc<AppConfig>,
    bot: Bot,
}

impl StickyKeeperApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let bot = Bot::new(&config.telegram_bot_token);
        let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(bot.clone()));
        let timers = TimerService::new();

        let sticky = StickyScheduler::new(
            transport.clone(),
            timers.clone(),
            config.sticky.debounce,
            config.sticky.minutes,
        );
        let deletions = Arc::new(DeletionScheduler::new(transport.clone(), timers.clone()));
        let media = Arc::new(MediaPolicyService::new(
            MediaPolicyRegistry::new(config.media.minutes),
            deletions.clone(),
        ));

        tracing::info!(
            debounce_ms = config.sticky.debounce.as_millis() as u64,
            sticky_min_minutes = config.sticky.minutes.min(),
            sticky_max_minutes = config.sticky.minutes.max(),
            media_max_minutes = config.media.minutes.max(),
            "schedulers ready"
        );

        let state = Arc::new(AppState {
            config: config.clone(),
            transport,
            sticky: sticky.clone(),
            media,
            deletions,
        });
        let telegram = TelegramService::new(bot.clone(), state);

        Ok(Self {
            _paths: paths,
            telegram,
            sticky,
            timers,
            shutdown,
            config,
            bot,
        })
    }

    pub async fn run(self) -> Result<()> {
        let StickyKeeperApp {
            _paths: _,
            telegram,
            sticky,
            timers,
            shutdown,
            config,
            bot,
        } = self;

        tracing::info!("sticky keeper bot starting");
        notify_admin_group(&bot, config.as_ref(), "Sticky keeper bot started.").await;

        let mut shutdown_listener = shutdown.subscribe();
        let shutdown_timeout = Duration::from_secs(5);
        let mut telegram_future = Box::pin(telegram.run(shutdown.subscribe()));
        let mut telegram_completed = false;

        tokio::select! {
            _ = shutdown_listener.notified() => {
                tracing::info!("shutdown signal received");
            }
            res = &mut telegram_future => {
                telegram_completed = true;
                if let Err(err) = res {
                    tracing::error!(?err, "Telegram dispatcher failed");
                } else {
                    tracing::info!("Telegram dispatcher stopped");
                }
            }
        }

        shutdown.trigger();

        if !telegram_completed {
            match timeout(shutdown_timeout, &mut telegram_future).await {
                Ok(Err(err)) => tracing::error!(?err, "Telegram dispatcher failed"),
                Ok(Ok(())) => {}
                Err(_) => tracing::warn!(
                    target: "telegram",
                    "Telegram dispatcher did not stop within {:?}; forcing exit",
                    shutdown_timeout
                ),
            }
        }

        if timeout(shutdown_timeout, sticky.shutdown()).await.is_err() {
            tracing::warn!(
                target: "sticky",
                "pending reposts were not cancelled within {:?}",
                shutdown_timeout
            );
        }
        timers.shutdown();

        tracing::info!("sticky keeper bot stopped");
        notify_admin_group(&bot, config.as_ref(), "Sticky keeper bot stopped.").await;
        Ok(())
    }
}
