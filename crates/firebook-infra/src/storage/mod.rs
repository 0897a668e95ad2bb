//! File storage - a directory of uploaded files named by upload time.

mod disk;
mod naming;

pub use disk::{DiskStorage, StoredFile};
pub use naming::FileNamer;
