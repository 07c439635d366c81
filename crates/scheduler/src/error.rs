use parabens_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid cron expression: {0}")]
    InvalidCron(String),
}
