// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The caller-facing branch.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use confab_core::types::Fragment;
use confab_core::StreamError;
use confab_stream::Branch;
use futures::Stream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Live branch bound to the governing token.
///
/// Once the token is cancelled the stream ends and its read end is released,
/// so the source is not held open on the caller's behalf.
pub struct LiveStream {
    branch: Branch,
    cancel: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl LiveStream {
    pub(crate) fn new(branch: Branch, cancel: CancellationToken) -> Self {
        let cancelled = Box::pin(cancel.clone().cancelled_owned());
        Self {
            branch,
            cancel,
            cancelled,
        }
    }

    /// The governing token of this invocation.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stops reading. The background branch keeps draining.
    pub fn close(&mut self) {
        self.branch.close();
    }
}

impl Stream for LiveStream {
    type Item = Result<Fragment, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.branch.is_terminated() {
            return Poll::Ready(None);
        }
        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.branch.close();
            return Poll::Ready(None);
        }
        Pin::new(&mut this.branch).poll_next(cx)
    }
}
