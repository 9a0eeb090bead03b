//! Streaming copy of one file between two capabilities
//!
//! The copier opens the source stream, then the destination sink with the
//! write options produced for the source path, and pumps chunks until the
//! source is exhausted. Three things can end a copy: a read error, a write
//! error, or the sink closing. [`Completion`] latches whichever arrives first
//! and ignores the rest, so a copy always settles exactly once.
//!
//! There is no retry and no cleanup: a failed copy may leave a truncated or
//! empty destination behind.

use crate::capability::{ByteSink, ByteSource, Capability, WriteOptions};
use crate::error::{Result, SyncError};
use std::io;
use tracing::{debug, trace};

/// Terminal signals a copy can observe
#[derive(Debug)]
pub enum CopySignal {
    /// The source stream failed
    ReadFailed(io::Error),
    /// The destination sink failed, either on write or on close
    WriteFailed(io::Error),
    /// The destination sink closed cleanly
    Closed,
}

/// Exactly-once latch over [`CopySignal`]s
#[derive(Debug, Default)]
pub struct Completion {
    outcome: Option<CopySignal>,
    ignored: usize,
}

impl Completion {
    /// Record `signal`; returns `false` when the copy had already settled
    pub fn settle(&mut self, signal: CopySignal) -> bool {
        if self.outcome.is_some() {
            trace!("ignoring late copy signal {:?}", signal);
            self.ignored += 1;
            return false;
        }
        self.outcome = Some(signal);
        true
    }

    /// True once a signal has decided the outcome
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    /// Signals that arrived after the first one
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Turn the first signal into the copy result
    ///
    /// # Errors
    ///
    /// [`SyncError::Io`] for read (on `src`) or write (on `dst`) failures,
    /// [`SyncError::Internal`] if nothing ever settled the copy
    pub fn into_result(self, src: &str, dst: &str) -> Result<()> {
        match self.outcome {
            Some(CopySignal::Closed) => Ok(()),
            Some(CopySignal::ReadFailed(e)) => Err(SyncError::io(src, e)),
            Some(CopySignal::WriteFailed(e)) => Err(SyncError::io(dst, e)),
            None => Err(SyncError::Internal(format!(
                "copy {src} -> {dst} ended without a terminal signal"
            ))),
        }
    }
}

/// Copy one file from `src_cap` to `dst_cap`
///
/// `options_factory` is called once with the source path, right before the
/// destination is opened. Returns the number of bytes written.
///
/// # Errors
///
/// [`SyncError::Io`] when either stream cannot be opened, read, written or
/// closed
pub async fn copy_file<S, D, F>(
    src_path: &str,
    dst_path: &str,
    src_cap: &S,
    dst_cap: &D,
    options_factory: &F,
) -> Result<u64>
where
    S: Capability,
    D: Capability,
    F: Fn(&str) -> WriteOptions,
{
    let mut reader = src_cap.open_read(src_path).await?;
    let options = options_factory(src_path);
    let mut writer = dst_cap.open_write(dst_path, &options).await?;

    let mut completion = Completion::default();
    let mut copied = 0u64;
    loop {
        match reader.read_chunk().await {
            Ok(Some(chunk)) => {
                let len = chunk.len() as u64;
                if let Err(e) = writer.write_chunk(chunk).await {
                    completion.settle(CopySignal::WriteFailed(e));
                    break;
                }
                copied += len;
            }
            Ok(None) => break,
            Err(e) => {
                completion.settle(CopySignal::ReadFailed(e));
                break;
            }
        }
    }

    // The sink is closed on every path; after an error its outcome is ignored
    let closed = match writer.close().await {
        Ok(()) => CopySignal::Closed,
        Err(e) => CopySignal::WriteFailed(e),
    };
    completion.settle(closed);
    if completion.ignored() > 0 {
        debug!(
            "copy {} -> {} settled early, {} later signal(s) ignored",
            src_path,
            dst_path,
            completion.ignored()
        );
    }

    completion.into_result(src_path, dst_path)?;
    Ok(copied)
}
