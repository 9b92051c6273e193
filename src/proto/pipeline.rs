//! Concurrent item decoding
//!
//! Framing stays on the calling thread; item payloads are pushed through a
//! bounded channel to a small pool of decode workers. The channel bound is
//! the backpressure mechanism: when workers fall behind, the framing
//! thread blocks on send instead of buffering the stream.
//!
//! The first worker error wins. Once a worker records an error it stops
//! pulling from the channel; the framing thread notices either on the next
//! enqueue or after the walk completes, and surfaces that error to the
//! caller.

use std::io::Read;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::Bytes;

use tracing::{debug, trace};

use crate::error::{ItemDecodeError, ListError};
use crate::params::{ListParams, ProtoDecode};
use crate::proto::list::walk_list;
use crate::window::ByteWindow;

/// Tuning knobs for [`decode_list_parallel`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    workers: usize,
    queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            workers: 2,
            queue_capacity: 4000,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decode worker threads. Values below 1 are clamped to 1.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Capacity of the payload queue between the framing thread and the
    /// workers. Values below 1 are clamped to 1.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

/// Decode the list record with a pool of worker threads.
///
/// Framing order is preserved on the wire, but items are handed to
/// [`ListParams::on_object`] from worker threads, so delivery order is
/// unspecified and callbacks must be safe to run concurrently.
///
/// # Errors
/// Framing failures are returned as in [`decode_list`](super::decode_list).
/// The first item decode failure among the workers stops the pipeline and
/// is returned, even when framing has already finished.
pub fn decode_list_parallel<R, P>(
    window: &mut ByteWindow<R>,
    params: &P,
    config: &PipelineConfig,
) -> Result<(), ListError>
where
    R: Read,
    P: ListParams + Sync,
    P::Item: ProtoDecode + Send,
{
    let first_error: Mutex<Option<ListError>> = Mutex::new(None);

    let walk_result = thread::scope(|scope| {
        let (tx, rx) = mpsc::sync_channel::<Bytes>(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        debug!(workers = config.workers.max(1), "starting decode workers");
        for _ in 0..config.workers.max(1) {
            let rx = Arc::clone(&rx);
            let first_error = &first_error;
            scope.spawn(move || loop {
                let buf = {
                    let guard = rx.lock().unwrap();
                    match guard.recv() {
                        Ok(buf) => buf,
                        Err(_) => break,
                    }
                };
                let mut item = params.object_factory();
                match item.merge_protobuf(&buf) {
                    Ok(()) => params.on_object(item),
                    Err(e) => {
                        trace!("decode worker stopping on item error");
                        let mut slot = first_error.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(e.into());
                        }
                        break;
                    }
                }
            });
        }
        // Only the workers hold the receiver now; once they all stop, the
        // enqueue below observes the disconnect.
        drop(rx);

        // Plain send would block forever if the queue is full and every
        // worker has already stopped, so the enqueue polls between
        // attempts and checks the error slot.
        let tx = &tx;
        let first_error = &first_error;
        walk_list(window, params, move |buf| {
            let mut pending = buf;
            loop {
                if let Some(e) = first_error.lock().unwrap().take() {
                    return Err(e);
                }
                match tx.try_send(pending) {
                    Ok(()) => return Ok(()),
                    Err(mpsc::TrySendError::Full(buf)) => {
                        pending = buf;
                        thread::sleep(std::time::Duration::from_micros(100));
                    }
                    Err(mpsc::TrySendError::Disconnected(_)) => {
                        return Err(first_error.lock().unwrap().take().unwrap_or_else(|| {
                            ItemDecodeError::new(
                                "decode workers exited before the stream was fully framed",
                            )
                            .into()
                        }));
                    }
                }
            }
        })
    });
    walk_result?;

    // A worker may have failed on one of the last payloads, after the
    // framing loop stopped enqueuing.
    let late = match first_error.into_inner() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    };
    match late {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
