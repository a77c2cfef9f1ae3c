//! File-backed [`PatternMemoryAdapter`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::entry::{Correction, PatternQuery, PatternQueryResult};
use super::manager::{apply_correction, MemoryManager};
use crate::protocol::adapters::PatternMemoryAdapter;

/// Buffers corrections in memory and persists them on `flush`.
///
/// Queries see buffered corrections before they are flushed.
#[derive(Debug)]
pub struct FilePatternMemory {
    manager: MemoryManager,
    pending: Mutex<Vec<(Correction, DateTime<Utc>)>>,
}

impl FilePatternMemory {
    pub fn new(manager: MemoryManager) -> Self {
        Self {
            manager,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn manager(&self) -> &MemoryManager {
        &self.manager
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[async_trait]
impl PatternMemoryAdapter for FilePatternMemory {
    async fn initialize(&self) -> anyhow::Result<()> {
        // Surface corruption once at bootstrap; later loads degrade to empty.
        if let Err(e) = self.manager.try_load().await {
            tracing::warn!(error = %e, "pattern memory unreadable, starting empty");
        }
        Ok(())
    }

    async fn query(&self, query: &PatternQuery) -> anyhow::Result<PatternQueryResult> {
        let mut entries = self.manager.load().await;
        for (correction, at) in self.pending.lock().await.iter() {
            apply_correction(&mut entries, correction, *at);
        }
        Ok(PatternQueryResult {
            entries: query.apply(&entries),
        })
    }

    async fn learn_from_correction(&self, correction: Correction) -> anyhow::Result<()> {
        self.pending.lock().await.push((correction, Utc::now()));
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut pending = self.pending.lock().await;
        if pending.is_empty() {
            return Ok(());
        }
        let report = self.manager.record_outcomes(&pending).await?;
        tracing::debug!(
            corrections = pending.len(),
            entries = report.entries_written,
            "pattern memory flushed"
        );
        pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_sees_unflushed_corrections() {
        let dir = tempfile::tempdir().unwrap();
        let memory = FilePatternMemory::new(MemoryManager::for_workspace(dir.path()));
        memory
            .learn_from_correction(Correction::success("sql-injection", 0.9))
            .await
            .unwrap();

        let result = memory
            .query(&PatternQuery::for_types(["sql-injection"]))
            .await
            .unwrap();
        assert_eq!(result.entries.len(), 1);
        assert!(!memory.manager().path().exists());
    }

    #[tokio::test]
    async fn test_flush_persists_and_clears_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let memory = FilePatternMemory::new(MemoryManager::for_workspace(dir.path()));
        memory
            .learn_from_correction(Correction::failure("xss"))
            .await
            .unwrap();
        memory.flush().await.unwrap();

        assert_eq!(memory.pending_len().await, 0);
        let stored = memory.manager().try_load().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].failures, 1);
    }
}
