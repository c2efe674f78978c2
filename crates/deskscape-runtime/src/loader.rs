use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use deskscape_gltf::{ModelData, TextureData, load_image, load_model, percent};

use crate::config::AssetKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKey {
    Model(AssetKind),
    ScreenImage,
}

impl fmt::Display for LoadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadKey::Model(kind) => write!(f, "{kind}"),
            LoadKey::ScreenImage => f.write_str("screen image"),
        }
    }
}

#[derive(Debug)]
pub enum AssetEvent {
    Progress { key: LoadKey, percent: f32 },
    ModelLoaded { kind: AssetKind, model: Arc<ModelData> },
    ImageLoaded { image: TextureData },
    Failed { key: LoadKey, error: String },
}

/// Where worker threads deliver results. Returns false once the receiving
/// side is gone.
pub trait AssetSink: Clone + Send + 'static {
    fn send(&self, event: AssetEvent) -> bool;
}

impl AssetSink for Sender<AssetEvent> {
    fn send(&self, event: AssetEvent) -> bool {
        Sender::send(self, event).is_ok()
    }
}

/// Shared flag checked by workers between chunks and before delivering.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fires one worker thread per request. Requests are independent and finish
/// in any order.
pub struct AssetLoader<S: AssetSink> {
    sink: S,
    cancel: CancelToken,
    workers: Vec<thread::JoinHandle<()>>,
}

impl<S: AssetSink> AssetLoader<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            cancel: CancelToken::default(),
            workers: Vec::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn request_model(&mut self, kind: AssetKind, path: PathBuf) {
        self.spawn(LoadKey::Model(kind), move |on_chunk| {
            load_model(&path, on_chunk)
                .map(|model| AssetEvent::ModelLoaded {
                    kind,
                    model: Arc::new(model),
                })
                .map_err(|e| format!("{}: {e:#}", path.display()))
        });
    }

    pub fn request_image(&mut self, path: PathBuf) {
        self.spawn(LoadKey::ScreenImage, move |on_chunk| {
            load_image(&path, on_chunk)
                .map(|image| AssetEvent::ImageLoaded { image })
                .map_err(|e| format!("{}: {e:#}", path.display()))
        });
    }

    /// Blocks until every worker has exited. Used by tests and on shutdown.
    pub fn join(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("asset worker panicked");
            }
        }
    }

    fn spawn<F>(&mut self, key: LoadKey, job: F)
    where
        F: FnOnce(&mut dyn FnMut(u64, Option<u64>) -> bool) -> Result<AssetEvent, String>
            + Send
            + 'static,
    {
        let sink = self.sink.clone();
        let cancel = self.cancel.clone();
        let spawned = thread::Builder::new()
            .name(format!("load {key}"))
            .spawn(move || {
                let progress_sink = sink.clone();
                let progress_cancel = cancel.clone();
                let mut on_chunk = move |loaded: u64, total: Option<u64>| {
                    if progress_cancel.is_cancelled() {
                        return false;
                    }
                    if let Some(p) = percent(loaded, total) {
                        log::info!("{key}: {p:.0}% loaded");
                        progress_sink.send(AssetEvent::Progress { key, percent: p });
                    }
                    true
                };
                let result = job(&mut on_chunk);
                if cancel.is_cancelled() {
                    log::debug!("{key}: cancelled");
                    return;
                }
                let event = result.unwrap_or_else(|error| AssetEvent::Failed { key, error });
                if !sink.send(event) {
                    log::debug!("{key}: receiver gone");
                }
            });
        match spawned {
            Ok(handle) => self.workers.push(handle),
            Err(e) => {
                log::error!("{key}: could not start loader thread: {e}");
                self.sink.send(AssetEvent::Failed {
                    key,
                    error: e.to_string(),
                });
            }
        }
    }
}
