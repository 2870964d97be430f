use futures::future::BoxFuture;
use reqwest::{Client, Url};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::NotificationError;
use crate::mood::Mood;
use crate::mood_entry::{EntryId, MoodEntry};

/// Summary of a freshly created entry, sent to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub entry_id: EntryId,
    pub mood: Mood,
    pub text: String,
}

impl Notice {
    pub fn for_entry(entry: &MoodEntry) -> Self {
        Notice {
            entry_id: entry.id,
            mood: entry.mood,
            text: entry.text.clone(),
        }
    }

    pub fn message(&self) -> String {
        format!("New entry ({}): {}", self.mood, self.text)
    }
}

#[derive(Debug)]
pub struct NotificationOutcome {
    pub entry_id: EntryId,
    pub result: Result<(), NotificationError>,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice) -> BoxFuture<'static, Result<(), NotificationError>>;
}

#[derive(Serialize)]
struct WebhookPayload {
    content: String,
}

/// Posts `{"content": "..."}` to a webhook URL.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url) -> Self {
        WebhookNotifier {
            client: Client::new(),
            url,
        }
    }
}

impl NotificationSink for WebhookNotifier {
    fn notify(&self, notice: Notice) -> BoxFuture<'static, Result<(), NotificationError>> {
        let request = self.client.post(self.url.clone()).json(&WebhookPayload {
            content: notice.message(),
        });

        Box::pin(async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(NotificationError::Status(status));
            }
            Ok(())
        })
    }
}

/// Spawns the notification as a detached task. Its outcome is only reported
/// back through `outcomes`; nothing awaits it.
pub fn dispatch(
    sink: Arc<dyn NotificationSink>,
    notice: Notice,
    outcomes: UnboundedSender<NotificationOutcome>,
) {
    tokio::spawn(async move {
        let entry_id = notice.entry_id;
        let result = sink.notify(notice).await;
        match &result {
            Ok(()) => tracing::debug!(entry_id, "notification delivered"),
            Err(e) => tracing::warn!(entry_id, error = %e, "notification failed"),
        }
        // The UI may already be gone.
        let _ = outcomes.send(NotificationOutcome { entry_id, result });
    });
}
