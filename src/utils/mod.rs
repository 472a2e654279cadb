pub mod command;
pub mod drive;

// Trait-based abstractions for testability
pub mod executor;
pub mod fs_ops;
pub mod remote_store;

// Re-export commonly used types and traits (used by test crate)
pub use executor::{CommandExecutor, RealExecutor};
pub use fs_ops::{LocalArtifact, LocalFileOps, RealFileOps};
pub use remote_store::{DeleteOutcome, RemoteObject, RemoteStore};
