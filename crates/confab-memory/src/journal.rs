// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation JSON lines journal.
//!
//! File names are the hex SHA-256 of the conversation id, so arbitrary ids
//! map to safe paths.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use confab_core::types::{ConversationId, Message};
use confab_core::ConfabError;
use sha2::{Digest, Sha256};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

fn storage_error(err: impl std::error::Error + Send + Sync + 'static) -> ConfabError {
    ConfabError::Storage {
        source: Box::new(err),
    }
}

/// Directory of `<sha256(id)>.jsonl` files.
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    /// Opens (creating if needed) the journal directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ConfabError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(storage_error)?;
        debug!(dir = %dir.display(), "conversation journal opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the journal file for `conversation_id`.
    pub fn path_for(&self, conversation_id: &ConversationId) -> PathBuf {
        let digest = Sha256::digest(conversation_id.as_str().as_bytes());
        self.dir.join(format!("{}.jsonl", hex::encode(digest)))
    }

    /// Whether a journal file exists for `conversation_id`.
    pub async fn contains(&self, conversation_id: &ConversationId) -> bool {
        fs::try_exists(self.path_for(conversation_id))
            .await
            .unwrap_or(false)
    }

    /// Reads every message recorded for a conversation.
    ///
    /// A missing file is an empty history. Lines that fail to parse,
    /// including lines that are not valid UTF-8, are skipped with a warning.
    pub async fn load(&self, conversation_id: &ConversationId) -> Result<Vec<Message>, ConfabError> {
        let path = self.path_for(conversation_id);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(storage_error(err)),
        };

        // Decoded per line so a torn or non-UTF-8 line costs only itself.
        let mut messages = Vec::new();
        for (line_no, line) in content.split(|b| *b == b'\n').enumerate() {
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<Message>(line) {
                Ok(message) => messages.push(message),
                Err(err) => warn!(
                    conversation_id = %conversation_id,
                    line = line_no + 1,
                    error = %err,
                    "skipping unreadable journal line"
                ),
            }
        }
        Ok(messages)
    }

    /// Appends `messages` in one write.
    pub async fn append(
        &self,
        conversation_id: &ConversationId,
        messages: &[Message],
    ) -> Result<(), ConfabError> {
        let mut buf = Vec::new();
        for message in messages {
            serde_json::to_writer(&mut buf, message).map_err(storage_error)?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(conversation_id))
            .await
            .map_err(storage_error)?;
        file.write_all(&buf).await.map_err(storage_error)?;
        file.flush().await.map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[tokio::test]
    async fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path()).await.unwrap();
        let messages = journal.load(&ConversationId::from("nobody")).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn appended_messages_load_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path()).await.unwrap();
        let id = ConversationId::from("42");

        journal
            .append(&id, &[Message::user("q1"), Message::assistant("a1")])
            .await
            .unwrap();
        journal.append(&id, &[Message::user("q2")]).await.unwrap();

        let contents: Vec<_> = journal
            .load(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["q1", "a1", "q2"]);
    }

    #[test]
    fn path_is_hashed_id() {
        let journal = Journal {
            dir: PathBuf::from("/data"),
        };
        let path = journal.path_for(&ConversationId::from("../etc/passwd"));
        assert_eq!(path.parent(), Some(Path::new("/data")));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + ".jsonl".len());
    }

    #[traced_test]
    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path()).await.unwrap();
        let id = ConversationId::from("c");
        journal.append(&id, &[Message::user("ok")]).await.unwrap();
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(journal.path_for(&id))
            .await
            .unwrap()
            .write_all(b"{not json\n")
            .await
            .unwrap();

        let messages = journal.load(&id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(logs_contain("skipping unreadable journal line"));
    }
    #[traced_test]
    #[tokio::test]
    async fn non_utf8_line_does_not_hide_neighbours() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path()).await.unwrap();
        let id = ConversationId::from("bytes");
        journal
            .append(&id, &[Message::user("q"), Message::assistant("a")])
            .await
            .unwrap();
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(journal.path_for(&id))
            .await
            .unwrap()
            .write_all(b"\xff\xfe garbage\n")
            .await
            .unwrap();
        journal.append(&id, &[Message::user("after")]).await.unwrap();

        let contents: Vec<_> = journal
            .load(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["q", "a", "after"]);
        assert!(logs_contain("line=3"));
    }
}
