//! Output storage collaborator

pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::Storage;
