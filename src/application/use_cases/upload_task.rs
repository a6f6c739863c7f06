// ============================================================
// UPLOAD TASK
// ============================================================
// Run an upload off the async runtime and hand back its result

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use super::equipment_analytics::EquipmentAnalytics;
use crate::domain::error::{AppError, Result};
use crate::domain::upload::{OwnerId, UploadRecord};

/// Handle to an upload running on the blocking thread pool.
///
/// Dropping or discarding the handle does not cancel the upload; it still
/// completes or fails atomically, only the result is lost.
pub struct UploadTask {
    owner: OwnerId,
    handle: JoinHandle<Result<UploadRecord>>,
}

impl UploadTask {
    /// Start an upload. Must be called from within a tokio runtime.
    pub fn spawn(
        analytics: Arc<EquipmentAnalytics>,
        owner: OwnerId,
        filename: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let filename = filename.into();
        let task_owner = owner.clone();
        let handle = tokio::task::spawn_blocking(move || {
            analytics.upload(&task_owner, &filename, &bytes)
        });

        debug!(owner = %owner, "Upload task spawned");
        Self { owner, handle }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the upload to finish.
    pub async fn wait(self) -> Result<UploadRecord> {
        self.handle
            .await
            .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))?
    }

    /// Stop listening for the result.
    pub fn discard(self) {
        debug!(owner = %self.owner, "Upload task discarded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use crate::infrastructure::config::AppConfig;
    use crate::infrastructure::db::MemoryHistoryRepository;
    use crate::infrastructure::storage::MemoryBlobStore;

    const SAMPLE: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature
Pump-1,Pump,120,5.2,110
Valve-1,Valve,60,4.1,105
";

    fn analytics() -> Arc<EquipmentAnalytics> {
        Arc::new(
            EquipmentAnalytics::new(
                AppConfig::default(),
                Arc::new(MemoryHistoryRepository::new()),
                Arc::new(MemoryBlobStore::new()),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_wait_returns_record() {
        let analytics = analytics();
        let owner = OwnerId::from("alice");

        let task = UploadTask::spawn(
            analytics.clone(),
            owner.clone(),
            "plant.csv",
            SAMPLE.as_bytes().to_vec(),
        );
        assert_eq!(task.owner(), &owner);

        let record = task.wait().await.unwrap();
        assert_eq!(record.summary.total_count, 2);
        assert_eq!(analytics.latest_summary(&owner).unwrap(), record.summary);
    }

    #[tokio::test]
    async fn test_wait_returns_validation_error() {
        let task = UploadTask::spawn(
            analytics(),
            OwnerId::from("alice"),
            "plant.csv",
            b"Equipment Name,Type\nP1,Pump\n".to_vec(),
        );

        let err = task.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[tokio::test]
    async fn test_discarded_upload_still_completes() {
        let analytics = analytics();
        let owner = OwnerId::from("bob");

        let task = UploadTask::spawn(
            analytics.clone(),
            owner.clone(),
            "plant.csv",
            SAMPLE.as_bytes().to_vec(),
        );
        task.discard();

        let mut admitted = false;
        for _ in 0..200 {
            if analytics.latest_summary(&owner).is_ok() {
                admitted = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(admitted);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_for_different_owners() {
        let analytics = analytics();
        let tasks: Vec<UploadTask> = ["alice", "bob", "carol"]
            .into_iter()
            .map(|name| {
                UploadTask::spawn(
                    analytics.clone(),
                    OwnerId::from(name),
                    "plant.csv",
                    SAMPLE.as_bytes().to_vec(),
                )
            })
            .collect();

        for task in tasks {
            task.wait().await.unwrap();
        }
        for name in ["alice", "bob", "carol"] {
            assert_eq!(analytics.history(&OwnerId::from(name)).unwrap().len(), 1);
        }
    }
}
