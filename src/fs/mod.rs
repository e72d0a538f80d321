//! Filesystem plumbing shared by the file-backed stores.

mod compensate;
mod layout;
mod lock;
mod session;

pub use compensate::{FileDeleter, FileSaver, JsonStream, StreamProvider};
pub use layout::{AttachmentFiles, StoreLayout};
pub use lock::{LockHolder, StoreLock};
pub use session::{FsProvider, FsSession};
