// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent runner that replays scripted fragment sequences.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use confab_core::types::{AgentContext, Fragment, FragmentStream};
use confab_core::{AgentRunner, ConfabError, StreamError};
use futures::stream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One scripted action of a fragment source.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit a fragment.
    Fragment(Fragment),
    /// Sleep before the next step. Cut short by cancellation.
    Delay(Duration),
    /// Emit a read failure and end.
    Fail(String),
    /// Produce nothing until the governing token is cancelled.
    Hang,
}

/// A scripted response for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// A script that emits each text as one fragment, then ends.
    pub fn texts(texts: &[&str]) -> Self {
        texts.iter().fold(Self::new(), |script, text| script.text(*text))
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.fragment(Fragment::text(text))
    }

    pub fn fragment(mut self, fragment: Fragment) -> Self {
        self.steps.push(Step::Fragment(fragment));
        self
    }

    pub fn delay(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Delay(duration));
        self
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.steps.push(Step::Fail(message.into()));
        self
    }

    pub fn hang(mut self) -> Self {
        self.steps.push(Step::Hang);
        self
    }
}

/// Increments a counter when a scripted stream is dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Runner that pops one [`Script`] per invocation.
///
/// With an empty queue it streams the single fragment `"mock response"`.
pub struct ScriptedRunner {
    scripts: Mutex<VecDeque<Script>>,
    build_error: Option<String>,
    contexts: Mutex<Vec<AgentContext>>,
    released: Arc<AtomicUsize>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::with_scripts(Vec::new())
    }

    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::from(scripts)),
            build_error: None,
            contexts: Mutex::new(Vec::new()),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A runner whose every invocation fails to start.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            build_error: Some(message.into()),
            ..Self::new()
        }
    }

    pub async fn push_script(&self, script: Script) {
        self.scripts.lock().await.push_back(script);
    }

    /// Contexts received so far, in invocation order.
    pub async fn contexts(&self) -> Vec<AgentContext> {
        self.contexts.lock().await.clone()
    }

    /// Number of streams that have been dropped.
    pub fn released_streams(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(
        &self,
        context: AgentContext,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, ConfabError> {
        if let Some(message) = &self.build_error {
            return Err(ConfabError::SourceBuild {
                message: message.clone(),
                source: None,
            });
        }

        self.contexts.lock().await.push(context);
        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::texts(&["mock response"]));

        let guard = ReleaseGuard(Arc::clone(&self.released));
        let state = (script.steps.into_iter(), cancel, guard);
        Ok(Box::pin(stream::unfold(
            state,
            |(mut steps, cancel, guard)| async move {
                loop {
                    match steps.next()? {
                        Step::Fragment(fragment) => {
                            return Some((Ok(fragment), (steps, cancel, guard)));
                        }
                        Step::Delay(duration) => {
                            tokio::select! {
                                () = tokio::time::sleep(duration) => {}
                                () = cancel.cancelled() => return None,
                            }
                        }
                        Step::Fail(message) => {
                            let exhausted = Vec::new().into_iter();
                            return Some((
                                Err(StreamError::read(message)),
                                (exhausted, cancel, guard),
                            ));
                        }
                        Step::Hang => {
                            cancel.cancelled().await;
                            return None;
                        }
                    }
                }
            },
        )))
    }
}
