use thiserror::Error;

/// Document scanning related errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Document not loaded")]
    DocumentNotLoaded,

    #[error("Selector rejected: {selector}")]
    InvalidSelector { selector: String },

    #[error("Scan failed: {reason}")]
    ScanFailed { reason: String },
}

/// Messaging/channel related errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No receiving end for channel: {channel}")]
    NoReceiver { channel: String },

    #[error("Channel disconnected: {channel}")]
    Disconnected { channel: String },

    #[error("Broadcast failed: {reason}")]
    BroadcastFailed { reason: String },
}

/// Remote entitlement related errors
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("Payment backend not configured")]
    NotConfigured,

    #[error("Entitlement call failed: {reason}")]
    CallFailed { reason: String },

    #[error("Entitlement service returned an empty payload")]
    EmptyPayload,

    #[error("Payment page could not be opened: {reason}")]
    PaymentPageFailed { reason: String },
}

/// Local persistence related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage read failed for key {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Storage write failed for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Stored value for key {key} could not be decoded")]
    DecodeFailed { key: String },

    #[error("Storage backend unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Download planning related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Daily free quota exhausted")]
    QuotaExhausted,

    #[error("Download rejected by collaborator: {reason}")]
    Rejected { reason: String },
}

/// Main error type for the workspace
#[derive(Debug, Error)]
pub enum PageMediaError {
    #[error("Scan error: {source}")]
    Scan {
        #[from]
        source: ScanError,
    },

    #[error("Transport error: {source}")]
    Transport {
        #[from]
        source: TransportError,
    },

    #[error("Entitlement error: {source}")]
    Entitlement {
        #[from]
        source: EntitlementError,
    },

    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: StorageError,
    },

    #[error("Download error: {source}")]
    Download {
        #[from]
        source: DownloadError,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PageMediaError>;
