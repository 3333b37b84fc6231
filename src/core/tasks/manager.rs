use std::{
    path::PathBuf,
    sync::{
        atomic::AtomicBool,
        mpsc,
        Arc,
    },
    thread,
};

use tokio::runtime::Runtime;

use super::{
    ImportUpdate,
    TaskHandle,
};
use crate::{
    config::ImportConfig,
    core::{
        pipeline::run_import,
        DeckError,
    },
    scryfall::ScryfallClient,
    translation::LibreTranslateClient,
};

/// Owns the runtime and the channel that marshals progress and results back
/// to whichever thread is polling, so callbacks never touch UI state from a
/// worker.
pub struct ImportManager {
    runtime: Arc<Runtime>,
    receiver: mpsc::Receiver<ImportUpdate>,
    sender: mpsc::Sender<ImportUpdate>,
}

impl ImportManager {
    pub fn new() -> Self {
        let runtime = Arc::new(Runtime::new().expect("Failed to create ImportManager runtime"));
        let (sender, receiver) = mpsc::channel();

        Self { runtime, receiver, sender }
    }

    /// Drains whatever updates arrived since the last poll.
    pub fn poll_updates(&mut self) -> Vec<ImportUpdate> {
        let mut updates = Vec::new();

        while let Ok(update) = self.receiver.try_recv() {
            updates.push(update);
        }

        updates
    }

    /// Kicks off a full import of the CSV at `path` on a worker thread.
    pub fn start_import(&self, path: PathBuf, config: ImportConfig) -> TaskHandle {
        let sender = self.sender.clone();
        let runtime = self.runtime.clone();
        let cancel_token = Arc::new(AtomicBool::new(false));
        let token = cancel_token.clone();

        let join_handle = thread::spawn(move || {
            let result = runtime.block_on(async {
                let lookup = ScryfallClient::new(&config)?;
                let translator = LibreTranslateClient::new(&config)?;

                let progress_sender = sender.clone();
                run_import(&path, &lookup, &translator, &config, &token, move |event| {
                    let _ = progress_sender.send(ImportUpdate::Progress(event));
                })
                .await
            });

            let update = match result {
                Err(DeckError::Cancelled) => ImportUpdate::Cancelled,
                other => ImportUpdate::Finished(other.map_err(|e| e.to_string())),
            };
            let _ = sender.send(update);
        });

        TaskHandle::new(cancel_token, join_handle)
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        time::{
            Duration,
            Instant,
        },
    };

    use tempfile::NamedTempFile;

    use super::*;

    // Config pointed at an unroutable endpoint: every lookup degrades to a
    // per-card error, which still produces a Finished update with a report.
    fn offline_config() -> ImportConfig {
        ImportConfig {
            api_base_url: "http://127.0.0.1:1".to_string(),
            translation_endpoint: "http://127.0.0.1:1".to_string(),
            retry_attempts: 1,
            backoff_base_ms: 1,
            request_timeout_secs: 1,
            ..ImportConfig::default()
        }
    }

    #[test]
    fn import_finishes_and_updates_cross_the_channel() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"Card Name,Quantity\nSol Ring,1\n").expect("write csv");

        let mut manager = ImportManager::new();
        let handle =
            manager.start_import(file.path().to_path_buf(), offline_config());

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut finished = None;
        while Instant::now() < deadline {
            for update in manager.poll_updates() {
                if let ImportUpdate::Finished(result) = update {
                    finished = Some(result);
                }
            }
            if finished.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }

        let outcome = finished.expect("no Finished update").expect("import should not abort");
        assert!(handle.is_finished());
        assert_eq!(outcome.deck.cards.len(), 1);
        assert_eq!(outcome.report.errors, 1);
    }
}
