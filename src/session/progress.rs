use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::Mutex, task::JoinHandle};

use crate::store::{ProgressStore, ReadingProgress};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

/// Coalesces rapid cursor changes into one trailing write per quiet window.
pub struct ProgressSaver {
    store: Arc<dyn ProgressStore>,
    content_id: String,
    debounce: Duration,
    pending: Arc<Mutex<Option<usize>>>,
    last_saved: Arc<Mutex<Option<usize>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressSaver {
    pub fn new(store: Arc<dyn ProgressStore>, content_id: impl Into<String>, debounce: Duration) -> Self {
        Self {
            store,
            content_id: content_id.into(),
            debounce,
            pending: Arc::new(Mutex::new(None)),
            last_saved: Arc::new(Mutex::new(None)),
            timer: Mutex::new(None),
        }
    }

    pub async fn last_saved(&self) -> Option<usize> {
        *self.last_saved.lock().await
    }

    /// Records a new word offset; the write happens once no further note
    /// arrives for the debounce window.
    pub async fn note(&self, position: usize) {
        *self.pending.lock().await = Some(position);

        let mut timer = self.timer.lock().await;
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let store = self.store.clone();
        let content_id = self.content_id.clone();
        let pending = self.pending.clone();
        let last_saved = self.last_saved.clone();
        let debounce = self.debounce;

        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let Some(position) = pending.lock().await.take() else {
                return;
            };
            if *last_saved.lock().await == Some(position) {
                return;
            }
            match store
                .save_progress(&ReadingProgress::new(content_id.clone(), position))
                .await
            {
                Ok(()) => {
                    log_debug!("saved progress {} for {}", position, content_id);
                    *last_saved.lock().await = Some(position);
                }
                Err(err) => log_warn!("debounced progress save failed for {content_id}: {err:?}"),
            }
        }));
    }

    /// Writes `position` now, bypassing the debounce; a failed write is
    /// retried once. Returns whether the position was stored.
    pub async fn flush(&self, position: usize) -> bool {
        if let Some(handle) = self.timer.lock().await.take() {
            handle.abort();
        }
        self.pending.lock().await.take();

        let progress = ReadingProgress::new(self.content_id.clone(), position);
        for attempt in 1..=2 {
            match self.store.save_progress(&progress).await {
                Ok(()) => {
                    *self.last_saved.lock().await = Some(position);
                    return true;
                }
                Err(err) if attempt == 1 => {
                    log_warn!("progress save failed for {}, retrying: {err:?}", self.content_id)
                }
                Err(err) => {
                    log_error!("progress for {} not saved: {err:?}", self.content_id)
                }
            }
        }
        false
    }
}

impl Drop for ProgressSaver {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.try_lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}
