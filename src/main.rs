mod config;
mod controller;
mod entry_store;
mod error;
mod logging;
mod mood;
mod mood_entry;
mod notifier;
mod ui;

use color_eyre::Result;
use config::AppConfig;
use controller::{Controller, Effect};
use crossterm::event::EventStream;
use entry_store::{EntryStore, FileStorage};
use futures::StreamExt;
use notifier::{NotificationSink, WebhookNotifier};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use ui::UI;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = AppConfig::from_env()?;
    logging::init(&config.log_path)?;

    let storage = FileStorage::new(&config.store_path);
    tracing::info!(path = %storage.path().display(), "opening diary");
    let mut store = EntryStore::load(storage);

    let sink: Option<Arc<dyn NotificationSink>> = match &config.webhook_url {
        Some(url) => {
            tracing::info!(host = url.host_str().unwrap_or(""), "webhook sync enabled");
            let sink: Arc<dyn NotificationSink> = Arc::new(WebhookNotifier::new(url.clone()));
            Some(sink)
        }
        None => {
            tracing::info!("no webhook configured, entries stay local");
            None
        }
    };

    let mut controller = Controller::new(sink.is_some());
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    let mut ui = UI::new()?;

    loop {
        ui.display(&store, &controller)?;

        tokio::select! {
            event = events.next() => {
                let event = match event {
                    Some(event) => event?,
                    None => break,
                };
                let Some(command) = ui.command_for(&event, &controller) else {
                    continue;
                };
                match controller.dispatch(&mut store, command) {
                    Effect::None => {}
                    Effect::Notify(notice) => {
                        if let Some(sink) = &sink {
                            notifier::dispatch(sink.clone(), notice, outcome_tx.clone());
                        }
                    }
                    Effect::Quit => break,
                }
            }
            Some(outcome) = outcome_rx.recv() => controller.on_notification(outcome),
            now = tick.tick() => controller.expire_toast(now.into_std()),
        }
    }

    tracing::info!("diary closed");
    Ok(())
}
