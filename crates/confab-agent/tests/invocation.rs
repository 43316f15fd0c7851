// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end turn tests against the scripted runner.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use confab_agent::{AgentSettings, ConversationAgent};
use confab_core::types::{ConversationId, Fragment, Message, Role, TerminalState};
use confab_core::{ConfabError, StreamError, TurnCommitter};
use confab_memory::{ConversationStore, MemoryCommitter};
use confab_stream::Phase;
use confab_test_utils::{Script, ScriptedRunner, TestHarness};
use futures::StreamExt;
use proptest::prelude::*;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Holds commits for one conversation until released.
struct GatedCommitter {
    inner: MemoryCommitter,
    gated: ConversationId,
    gate: Notify,
}

#[async_trait]
impl TurnCommitter for GatedCommitter {
    async fn commit_turn(
        &self,
        conversation_id: &ConversationId,
        user: Message,
        assistant: Message,
    ) -> Result<(), ConfabError> {
        if *conversation_id == self.gated {
            self.gate.notified().await;
        }
        self.inner.commit_turn(conversation_id, user, assistant).await
    }
}

#[tokio::test]
async fn completed_turn_reaches_caller_and_history() {
    let harness = TestHarness::builder()
        .with_scripts(vec![Script::texts(&["Hel", "lo, ", "world"])])
        .build()
        .await
        .unwrap();

    let outcome = harness.send_message("conv", "say hello").await.unwrap();
    assert_eq!(
        outcome.live,
        vec![
            Ok(Fragment::text("Hel")),
            Ok(Fragment::text("lo, ")),
            Ok(Fragment::text("world")),
        ]
    );
    assert_eq!(outcome.report.state, TerminalState::Completed);

    let history = harness.store.get_messages(&ConversationId::from("conv")).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "say hello");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "Hello, world");
}

#[tokio::test]
async fn cancel_mid_stream_commits_partial_and_releases_source() {
    let harness = TestHarness::builder()
        .with_scripts(vec![Script::new().text("Hel").hang()])
        .build()
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let mut invocation = harness
        .agent
        .run(ConversationId::from("c"), "partial please", cancel.clone())
        .await
        .unwrap();

    assert_eq!(
        invocation.live.next().await,
        Some(Ok(Fragment::text("Hel")))
    );
    invocation.commit.wait_for_fragments(1).await;
    cancel.cancel();
    assert_eq!(invocation.live.next().await, None);

    let report = invocation.commit.wait().await.unwrap();
    assert_eq!(report.state, TerminalState::Cancelled);
    assert_eq!(
        report.assistant.metadata.terminal_state,
        Some(TerminalState::Cancelled)
    );

    let history = harness.store.get_messages(&ConversationId::from("c")).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "partial please");
    assert_eq!(history[1].content, "Hel");

    tokio::time::timeout(Duration::from_secs(2), async {
        while harness.runner.released_streams() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("source should be released after both branches close");
}

#[tokio::test]
async fn cancel_before_first_fragment_commits_empty_reply() {
    let harness = TestHarness::builder()
        .with_scripts(vec![Script::new().hang()])
        .build()
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let invocation = harness
        .agent
        .run(ConversationId::from("e"), "anyone?", cancel.clone())
        .await
        .unwrap();
    cancel.cancel();

    let report = invocation.commit.wait().await.unwrap();
    assert_eq!(report.fragments, 0);
    let history = harness.store.get_messages(&ConversationId::from("e")).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "");
}

#[tokio::test]
async fn dropped_live_branch_does_not_stop_commit() {
    let harness = TestHarness::builder()
        .with_branch_buffer(1)
        .with_scripts(vec![
            Script::new()
                .text("one ")
                .delay(Duration::from_millis(5))
                .text("two ")
                .text("three"),
        ])
        .build()
        .await
        .unwrap();

    let invocation = harness
        .agent
        .run(ConversationId::from("d"), "count", CancellationToken::new())
        .await
        .unwrap();
    drop(invocation.live);

    let report = invocation.commit.wait().await.unwrap();
    assert_eq!(report.state, TerminalState::Completed);
    assert_eq!(report.assistant.content, "one two three");
}

#[tokio::test]
async fn mid_stream_failure_reaches_caller_once_and_is_observed() {
    let harness = TestHarness::builder()
        .with_scripts(vec![Script::new().text("par").fail("upstream reset")])
        .build()
        .await
        .unwrap();

    let outcome = harness.send_message("f", "go").await.unwrap();
    assert_eq!(outcome.live.iter().filter(|item| item.is_err()).count(), 1);
    assert_eq!(
        outcome.live.last(),
        Some(&Err(StreamError::read("upstream reset")))
    );
    assert_eq!(outcome.report.state, TerminalState::Failed);

    let history = harness.store.get_messages(&ConversationId::from("f")).await;
    assert_eq!(history[1].content, "par");

    let observed = harness.observer.stream_errors();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].0, ConversationId::from("f"));
}

#[tokio::test]
async fn build_failure_commits_nothing() {
    let harness = TestHarness::builder()
        .with_build_error("missing api key")
        .build()
        .await
        .unwrap();

    let result = harness.send_message("b", "hello").await;
    assert!(matches!(result, Err(ConfabError::SourceBuild { .. })));
    assert!(
        harness
            .store
            .get_messages(&ConversationId::from("b"))
            .await
            .is_empty()
    );
    assert!(harness.observer.commits().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_conversations_do_not_mix() {
    let harness = TestHarness::builder()
        .with_scripts(vec![
            Script::new()
                .text("alpha-1 ")
                .delay(Duration::from_millis(3))
                .text("alpha-2"),
            Script::new()
                .text("beta-1 ")
                .delay(Duration::from_millis(3))
                .text("beta-2"),
        ])
        .build()
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        harness.send_message("A", "first"),
        harness.send_message("B", "second")
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let history_a = harness.store.get_messages(&ConversationId::from("A")).await;
    let history_b = harness.store.get_messages(&ConversationId::from("B")).await;
    assert_eq!(history_a.len(), 2);
    assert_eq!(history_b.len(), 2);
    assert_eq!(history_a[0].content, "first");
    assert_eq!(history_b[0].content, "second");
    assert_eq!(history_a[1].content, a.live_text());
    assert_eq!(history_b[1].content, b.live_text());
    assert_ne!(history_a[1].content, history_b[1].content);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_commit_does_not_hold_back_other_conversations() {
    let store = Arc::new(ConversationStore::new());
    let committer = Arc::new(GatedCommitter {
        inner: MemoryCommitter::new(Arc::clone(&store)),
        gated: ConversationId::from("slow"),
        gate: Notify::new(),
    });
    let runner = Arc::new(ScriptedRunner::with_scripts(vec![
        Script::texts(&["one"]),
        Script::texts(&["two"]),
    ]));
    let agent = ConversationAgent::new(runner, Arc::clone(&store), AgentSettings::default())
        .with_committer(committer.clone());

    let slow = agent
        .run(ConversationId::from("slow"), "a", CancellationToken::new())
        .await
        .unwrap();
    let _: Vec<_> = slow.live.collect().await;
    let mut slow_phase = slow.commit.subscribe();

    let fast = agent
        .run(ConversationId::from("fast"), "b", CancellationToken::new())
        .await
        .unwrap();
    let _: Vec<_> = fast.live.collect().await;
    let report = tokio::time::timeout(Duration::from_secs(5), fast.commit.wait())
        .await
        .expect("commit for another conversation was blocked")
        .unwrap();
    assert!(report.persisted);
    assert_eq!(store.get_messages(&ConversationId::from("fast")).await.len(), 2);

    slow_phase
        .wait_for(|phase| *phase == Phase::Completed)
        .await
        .unwrap();
    assert!(store.get_messages(&ConversationId::from("slow")).await.is_empty());

    committer.gate.notify_one();
    let report = slow.commit.wait().await.unwrap();
    assert!(report.persisted);
    assert_eq!(store.get_messages(&ConversationId::from("slow")).await.len(), 2);
}

#[tokio::test]
async fn runner_sees_system_prompt_and_history_window() {
    let harness = TestHarness::builder()
        .with_history_window(3)
        .with_system_prompt("be terse")
        .build()
        .await
        .unwrap();

    for turn in 0..3 {
        harness
            .send_message("w", &format!("turn {turn}"))
            .await
            .unwrap();
    }

    let contexts = harness.runner.contexts().await;
    assert_eq!(contexts.len(), 3);
    assert!(contexts[0].history.is_empty());
    assert_eq!(contexts[1].history.len(), 2);
    assert_eq!(contexts[2].history.len(), 3);
    assert_eq!(contexts[2].history[0].role, Role::Assistant);
    assert_eq!(contexts[2].system_prompt.as_deref(), Some("be terse"));
    assert_eq!(contexts[2].input, "turn 2");
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_commits() {
    let harness = TestHarness::builder()
        .with_scripts(vec![
            Script::new()
                .delay(Duration::from_millis(20))
                .text("late"),
        ])
        .build()
        .await
        .unwrap();

    let invocation = harness
        .agent
        .run(ConversationId::from("s"), "hi", CancellationToken::new())
        .await
        .unwrap();
    drop(invocation.live);

    assert!(harness.agent.shutdown(Duration::from_secs(5)).await);
    assert_eq!(harness.agent.in_flight(), 0);
    let history = harness.store.get_messages(&ConversationId::from("s")).await;
    assert_eq!(history[1].content, "late");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn committed_reply_equals_streamed_text(
        texts in prop::collection::vec("[a-zA-Z0-9 ,.]{0,8}", 0..20),
        buffer in 1usize..6,
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let (streamed, stored) = rt.block_on(async {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let harness = TestHarness::builder()
                .with_branch_buffer(buffer)
                .with_scripts(vec![Script::texts(&refs)])
                .build()
                .await
                .unwrap();
            let outcome = harness.send_message("p", "q").await.unwrap();
            let history = harness.store.get_messages(&ConversationId::from("p")).await;
            (outcome.live_text(), history[1].content.clone())
        });
        prop_assert_eq!(&streamed, &texts.concat());
        prop_assert_eq!(streamed, stored);
    }
}
