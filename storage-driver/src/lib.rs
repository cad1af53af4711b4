//! # Storage driver contract
//!
//! The handle the registry core passes to manifest-service factories. The
//! core never talks to a concrete backend itself; it only carries a
//! [`Driver`] from configuration to whichever service is constructed.

mod driver;
mod error;
mod memory;

pub use driver::check_path;
pub use driver::Driver;
pub use driver::Metadata;
pub use error::{StorageError, StorageErrorBuilder, StorageErrorKind};
pub use memory::MemoryDriver;
