use super::*;

/// File-system sink.
///
/// Layout: `<base>/time-based/` and `<base>/time-and-country-based/`, one
/// file per [`SnapshotBatch`], created with create-new semantics.
#[derive(Debug, Clone)]
pub struct FsSnapshotSink {
    base_path: PathBuf,
}

impl FsSnapshotSink {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        for grouping in [Grouping::Time, Grouping::TimeAndCountry] {
            let dir = base_path.join(grouping.partition());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create sink directory {}", dir.display()))?;
        }
        Ok(Self { base_path })
    }

    fn object_path(&self, batch: &SnapshotBatch) -> PathBuf {
        self.base_path
            .join(batch.grouping().partition())
            .join(batch.object_name())
    }
}

#[async_trait]
impl SnapshotSink for FsSnapshotSink {
    async fn append(&self, batch: &SnapshotBatch) -> Result<String> {
        use tokio::io::AsyncWriteExt;

        let path = self.object_path(batch);
        let content = batch.to_json_lines()?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create sink directory {}", dir.display()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(content.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("failed to sync {}", path.display()))?;
        Ok(path.display().to_string())
    }
}
