use super::*;

/// In-memory sink for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct InMemorySnapshotSink {
    batches: Mutex<Vec<SnapshotBatch>>,
    fail_remaining: AtomicUsize,
}

impl InMemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` appends fail.
    pub fn fail_next(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Every batch appended so far, in append order.
    pub fn batches(&self) -> Vec<SnapshotBatch> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All snapshots of one grouping, in append order.
    pub fn snapshots(&self, grouping: Grouping) -> Vec<KpiSnapshot> {
        self.batches()
            .into_iter()
            .filter(|b| b.grouping() == grouping)
            .flat_map(|b| b.records)
            .collect()
    }
}

#[async_trait]
impl SnapshotSink for InMemorySnapshotSink {
    async fn append(&self, batch: &SnapshotBatch) -> Result<String> {
        let failing = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("sink unavailable"));
        }
        let mut batches = self.batches.lock().unwrap_or_else(PoisonError::into_inner);
        batches.push(batch.clone());
        Ok(format!(
            "memory://{}/{}",
            batch.grouping().partition(),
            batch.object_name()
        ))
    }
}
