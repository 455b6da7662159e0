pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod input;
pub mod policy;
pub mod state;
pub mod store;
pub mod submit;

// Re-export main types for convenience
pub use client::UpliftClient;
pub use config::Config;
pub use error::{PlaygroundError, Result};
pub use gate::can_submit;
pub use input::{InputSlot, InputSource, OutputFormat, SlotId, UploadedFile};
pub use policy::{AllowPattern, ContextFetchPolicy, FetchStatus, RemoteFetchPolicy};
pub use state::FormState;
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageKey};
pub use submit::{SubmissionRequest, SubmissionResult, Ticket, UpliftOutput};
