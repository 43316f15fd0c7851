// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splits one fragment stream into two independently paced branches.
//!
//! A pump task reads the source and forwards every item to each branch's
//! bounded channel. A full channel suspends the pump, so a lagging branch
//! never loses fragments. A branch whose reader is gone is skipped. Once both
//! readers are gone the pump drops the source, even while it is waiting for
//! the next item.

use std::pin::Pin;
use std::task::{Context, Poll};

use confab_core::types::{Fragment, FragmentStream};
use confab_core::StreamError;
use futures::future::join_all;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// What the pump forwards to a branch.
#[derive(Debug, Clone)]
enum Signal {
    Fragment(Fragment),
    End,
    Failed(StreamError),
}

/// One in-flight duplicated stream: exactly two read ends over one source.
#[derive(Debug)]
pub struct StreamHandle {
    live: Branch,
    background: Branch,
}

impl StreamHandle {
    /// Separates the two read ends so each can move to its own consumer.
    pub fn split(self) -> (Branch, Branch) {
        (self.live, self.background)
    }
}

/// Starts duplicating `source` immediately.
///
/// `capacity` bounds how many fragments a branch may lag behind the source
/// before the source is suspended; zero is treated as one. Must be called
/// from within a tokio runtime.
pub fn tee(source: FragmentStream, capacity: usize) -> StreamHandle {
    let capacity = capacity.max(1);
    let (live_tx, live_rx) = mpsc::channel(capacity);
    let (background_tx, background_rx) = mpsc::channel(capacity);

    tokio::spawn(pump(source, [Some(live_tx), Some(background_tx)]));

    StreamHandle {
        live: Branch::new("live", live_rx),
        background: Branch::new("background", background_rx),
    }
}

async fn pump(mut source: FragmentStream, mut branches: [Option<mpsc::Sender<Signal>>; 2]) {
    let mut forwarded = 0usize;
    loop {
        let next = tokio::select! {
            item = source.next() => item,
            () = all_closed(&branches) => {
                debug!(forwarded, "both branches closed, releasing source");
                return;
            }
        };

        let signal = match next {
            Some(Ok(fragment)) => Signal::Fragment(fragment),
            Some(Err(error)) => Signal::Failed(error),
            None => Signal::End,
        };
        let terminal = !matches!(signal, Signal::Fragment(_));

        for slot in branches.iter_mut() {
            let Some(tx) = slot.as_ref() else { continue };
            if tx.send(signal.clone()).await.is_err() {
                trace!("branch closed, no longer forwarding to it");
                *slot = None;
            }
        }

        if terminal {
            debug!(forwarded, "source reached terminal signal");
            return;
        }
        forwarded += 1;
    }
}

/// Resolves once every still-open branch has been closed by its reader.
async fn all_closed(branches: &[Option<mpsc::Sender<Signal>>]) {
    join_all(branches.iter().flatten().map(|tx| tx.closed())).await;
}

/// One read end of a duplicated stream.
///
/// Yields fragments in source order, then ends on end-of-stream. A source
/// failure is yielded once as `Err`, after which the branch ends. If the
/// pump stops without a terminal signal the branch yields
/// [`StreamError::Interrupted`].
#[derive(Debug)]
pub struct Branch {
    label: &'static str,
    rx: mpsc::Receiver<Signal>,
    done: bool,
}

impl Branch {
    fn new(label: &'static str, rx: mpsc::Receiver<Signal>) -> Self {
        Self {
            label,
            rx,
            done: false,
        }
    }

    /// Which side of the duplicator this is (`live` or `background`).
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Whether a terminal signal has been yielded or the branch was closed.
    pub fn is_terminated(&self) -> bool {
        self.done
    }

    /// Releases this read end without affecting the other one.
    pub fn close(&mut self) {
        if !self.done {
            trace!(branch = self.label, "closing branch");
        }
        self.done = true;
        self.rx.close();
    }
}

impl Stream for Branch {
    type Item = Result<Fragment, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let item = match futures::ready!(self.rx.poll_recv(cx)) {
            Some(Signal::Fragment(fragment)) => return Poll::Ready(Some(Ok(fragment))),
            Some(Signal::End) => None,
            Some(Signal::Failed(error)) => Some(Err(error)),
            None => Some(Err(StreamError::Interrupted)),
        };
        self.close();
        Poll::Ready(item)
    }
}
