//! Telegram front end
//!
//! The bot is a two-state machine per chat: the selection menu, and a
//! transient wait while the report and chart are produced. Every update is
//! handled on its own task so one slow report never holds up other chats.

pub mod commands;
pub mod delivery;
pub mod keyboard;

use crate::api::telegram::{CallbackQuery, ChatTransport, TelegramClient, TelegramMessage, Update};
use crate::chart::ChartRenderer;
use crate::crew::ReportGenerator;
use crate::error::Result;
use crate::symbol::Symbol;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{Instrument, error, info, warn};

pub use commands::Command;

pub const WELCOME: &str =
    "👋 Welcome to Cry_Ass!\n\nWhich ticker symbol are you interested in?\n(Or type /custom SYMBOL for others)";
pub const CHOOSE_ANOTHER: &str = "🔁 Choose another ticker:";
pub const CUSTOM_USAGE: &str = "❌ Please provide a symbol like: /custom BTC";
pub const LOADING: &str = "🤖 Hold tight!! Generating the summary for you...";
pub const BUSY: &str = "⏳ Still working on your previous request...";

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

type InFlight = Arc<Mutex<HashSet<i64>>>;

/// Marks a chat as busy until dropped
struct InFlightGuard {
    chats: InFlight,
    chat_id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.chats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.chat_id);
    }
}

/// The crypto report bot
pub struct CryptoBot {
    transport: Arc<dyn ChatTransport>,
    reports: Arc<dyn ReportGenerator>,
    charts: Arc<dyn ChartRenderer>,
    in_flight: InFlight,
}

impl CryptoBot {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        reports: Arc<dyn ReportGenerator>,
        charts: Arc<dyn ChartRenderer>,
    ) -> Self {
        Self {
            transport,
            reports,
            charts,
            in_flight: Arc::default(),
        }
    }

    fn try_begin(&self, chat_id: i64) -> Option<InFlightGuard> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chat_id);
        inserted.then(|| InFlightGuard {
            chats: self.in_flight.clone(),
            chat_id,
        })
    }

    /// Handle one update from Telegram
    pub async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(callback) = update.callback_query {
            return self.handle_callback(callback).await;
        }
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }
        Ok(())
    }

    async fn handle_message(&self, message: TelegramMessage) -> Result<()> {
        let chat_id = message.chat.id;
        let Some(command) = message.text.as_deref().and_then(Command::parse_text) else {
            return Ok(());
        };
        info!(chat_id, ?command, "Command received");
        self.dispatch(chat_id, command).await
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> Result<()> {
        if let Err(e) = self.transport.answer_callback(&callback.id).await {
            warn!(callback_id = %callback.id, error = %e, "Failed to answer callback query");
        }

        let Some(chat_id) = callback.message.as_ref().map(|m| m.chat.id) else {
            return Ok(());
        };
        let Some(command) = callback.data.as_deref().and_then(Command::parse_callback) else {
            return Ok(());
        };
        info!(chat_id, ?command, "Button pressed");
        self.dispatch(chat_id, command).await
    }

    async fn dispatch(&self, chat_id: i64, command: Command) -> Result<()> {
        match command {
            Command::Start => {
                self.transport
                    .send_text(chat_id, WELCOME, Some(keyboard::ticker_keyboard()))
                    .await?;
            }
            Command::GoBack => {
                self.transport
                    .send_text(chat_id, CHOOSE_ANOTHER, Some(keyboard::ticker_keyboard()))
                    .await?;
            }
            Command::CustomUsage => {
                self.transport.send_text(chat_id, CUSTOM_USAGE, None).await?;
            }
            Command::Custom { symbol } | Command::Ticker { symbol } => {
                let span = tracing::info_span!("request", chat_id, symbol = %symbol);
                self.analyze(chat_id, symbol).instrument(span).await?;
            }
        }
        Ok(())
    }

    /// Produce and deliver the report and chart for `symbol`
    async fn analyze(&self, chat_id: i64, symbol: Symbol) -> Result<()> {
        let Some(_guard) = self.try_begin(chat_id) else {
            info!(chat_id, "Request already in flight for chat");
            self.transport.send_text(chat_id, BUSY, None).await?;
            return Ok(());
        };

        let loading = self.transport.send_text(chat_id, LOADING, None).await?;

        let (report, chart) = tokio::join!(
            self.reports.final_summary(&symbol),
            self.charts.render(&symbol)
        );

        if let Err(e) = self.transport.delete_message(chat_id, loading).await {
            warn!(chat_id, error = %e, "Failed to delete loading message");
        }

        match report {
            Ok(report) => {
                delivery::deliver_report(self.transport.as_ref(), chat_id, &report, chart).await
            }
            Err(e) => {
                error!(chat_id, symbol = %symbol, error = %e, "Report generation failed");
                drop(chart);
                delivery::deliver_failure(self.transport.as_ref(), chat_id, &symbol, &e).await
            }
        }
    }

    /// Long-poll Telegram until Ctrl-C
    pub async fn run_polling(
        self: Arc<Self>,
        client: Arc<TelegramClient>,
        poll_timeout_secs: u64,
    ) -> Result<()> {
        info!("🤖 Cry_Ass bot is now running...");

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        let mut offset = 0_i64;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping poll loop");
                    return Ok(());
                }
                updates = client.get_updates(offset, poll_timeout_secs) => match updates {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            let bot = self.clone();
                            tokio::spawn(async move {
                                let update_id = update.update_id;
                                if let Err(e) = bot.handle_update(update).await {
                                    error!(update_id, error = %e, "Failed to handle update");
                                }
                            });
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Polling failed, retrying");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }
        }
    }
}
