use std::{fmt::Debug, sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use wanon_core::{
    cache::{CacheService, CacheStore},
    commands::CommandHandler,
    config::Config,
    messaging::MessagingPort,
    quotes::{QuoteService, QuoteStore},
    security::ChatFilter,
};

use crate::handlers;
use crate::TelegramMessenger;

const SHUTDOWN_RETRY: Duration = Duration::from_millis(50);

#[derive(Clone)]
pub struct AppState {
    pub filter: ChatFilter,
    pub cache: CacheService,
    pub commands: CommandHandler,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Long-poll Telegram until `cancel` fires.
pub async fn run_polling(
    cfg: Arc<Config>,
    cache: Arc<dyn CacheStore>,
    quotes: Arc<dyn QuoteStore>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    info!(
        username = %me.username(),
        first_name = %me.first_name,
        "starting bot polling"
    );

    let filter = ChatFilter::new(&cfg.allowed_chat_ids, cfg.auto_leave_unauthorized);
    info!(
        allow_all = filter.allows_all(),
        auto_leave = filter.auto_leave(),
        chat_ids = ?cfg.allowed_chat_ids,
        "chat filter"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState {
        filter,
        cache: CacheService::new(cache.clone()),
        commands: CommandHandler::new(QuoteService::new(cache, quotes), messenger.clone()),
        messenger,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_edited_message().endpoint(handlers::handle_edited_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    let shutdown = dispatcher.shutdown_token();
    // `dispatch` itself waits for the shutdown to complete.
    let stopper = tokio::spawn(stop_when_cancelled(cancel, move || {
        shutdown.shutdown().map(drop)
    }));

    dispatcher.dispatch().await;
    stopper.abort();
    info!("bot polling stopped");
    Ok(())
}

/// Wait for `cancel`, then call `try_stop` until it succeeds.
///
/// `try_stop` fails while the dispatcher is idle, which includes the window before
/// `dispatch` has started polling.
async fn stop_when_cancelled<F, E>(cancel: CancellationToken, mut try_stop: F)
where
    F: FnMut() -> Result<(), E>,
    E: Debug,
{
    cancel.cancelled().await;
    loop {
        match try_stop() {
            Ok(()) => return,
            Err(e) => {
                debug!(error = ?e, "dispatcher not running yet, retrying shutdown");
                tokio::time::sleep(SHUTDOWN_RETRY).await;
            }
        }
    }
}
