// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fragment source trait for model integrations.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ConfabError;
use crate::types::{AgentContext, FragmentStream};

/// Produces the fragment stream for one agent invocation.
///
/// A construction failure is returned as [`ConfabError::SourceBuild`] before
/// any stream exists. Failures after that point are delivered as a terminal
/// `Err` item on the stream. Implementations should stop producing once
/// `cancel` fires.
#[async_trait]
pub trait AgentRunner: Send + Sync + 'static {
    /// Returns the human-readable name of this runner.
    fn name(&self) -> &str;

    /// Starts one invocation and returns its fragment stream.
    async fn invoke(
        &self,
        context: AgentContext,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, ConfabError>;
}
