use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Stream error: {0}")]
    Stream(#[from] sb_stream::StreamError),

    #[error("Store error: {0}")]
    Store(#[from] sb_store::StoreError),

    #[error("Notification error: {0}")]
    Notify(#[from] sb_notify::NotifyError),
}
