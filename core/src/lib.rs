pub mod types;
pub mod errors;
pub mod messages;

pub use types::*;
pub use errors::*;
pub use messages::*;

// Re-export commonly used types
pub use uuid::Uuid;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
