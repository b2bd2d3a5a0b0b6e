//! Background decoding of selected avatar files
//!
//! Each selection is tagged with a generation number. Decodes run on the
//! blocking pool and report back over a channel; a completion whose
//! generation is no longer current is dropped, so the last selection always
//! wins regardless of the order decodes finish in.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use super::acquire::{AcquireError, ImageBlob, SourceImage, acquire};

/// Monotonic tag for async requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Result of one decode, tagged with the request it answers
#[derive(Debug)]
pub struct DecodeCompletion {
    pub generation: Generation,
    pub result: Result<SourceImage, AcquireError>,
}

pub struct AvatarLoader {
    current: Generation,
    /// True while the current generation has not delivered yet
    pending: bool,
    tx: UnboundedSender<DecodeCompletion>,
    rx: UnboundedReceiver<DecodeCompletion>,
}

impl Default for AvatarLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AvatarLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            current: Generation::default(),
            pending: false,
            tx,
            rx,
        }
    }

    pub fn generation(&self) -> Generation {
        self.current
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Start decoding `blob`, superseding any earlier request.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn select(&mut self, blob: ImageBlob) -> Generation {
        self.current = self.current.next();
        self.pending = true;
        let generation = self.current;
        let tx = self.tx.clone();

        info!(generation = generation.value(), size = blob.bytes.len(), "Avatar decode requested");
        tokio::task::spawn_blocking(move || {
            let result = acquire(&blob);
            // Receiver gone means the editor was dropped
            if tx.send(DecodeCompletion { generation, result }).is_err() {
                debug!(generation = generation.value(), "Decode finished after loader dropped");
            }
        });
        generation
    }

    /// Invalidate any in-flight decode
    pub fn cancel(&mut self) {
        if self.pending {
            info!(generation = self.current.value(), "Avatar decode cancelled");
        }
        self.current = self.current.next();
        self.pending = false;
    }

    /// Accept a completion only if it answers the current request
    pub fn accept(&mut self, completion: DecodeCompletion) -> Option<Result<SourceImage, AcquireError>> {
        if completion.generation != self.current || !self.pending {
            debug!(
                stale = completion.generation.value(),
                current = self.current.value(),
                "Dropping stale decode completion"
            );
            return None;
        }
        self.pending = false;
        if let Err(e) = &completion.result {
            error!(generation = completion.generation.value(), error = %e, "Avatar decode failed");
        }
        Some(completion.result)
    }

    /// Drain finished decodes without blocking
    pub fn poll(&mut self) -> Option<Result<SourceImage, AcquireError>> {
        while let Ok(completion) = self.rx.try_recv() {
            if let Some(result) = self.accept(completion) {
                return Some(result);
            }
        }
        None
    }

    /// Wait for the current request to finish. Returns `None` when nothing
    /// is pending.
    pub async fn wait(&mut self) -> Option<Result<SourceImage, AcquireError>> {
        while self.pending {
            let completion = self.rx.recv().await?;
            if let Some(result) = self.accept(completion) {
                return Some(result);
            }
        }
        None
    }
}
