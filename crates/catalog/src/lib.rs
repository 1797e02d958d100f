//! Data access for memorial records.
//!
//! Rows from the hosted backend are loosely shaped; they are converted once into
//! typed records here and nothing downstream sees the wire form.

pub mod auth;
pub mod detail;
pub mod draft;
pub mod error;
pub mod language;
pub mod photo;
pub mod record;
pub mod session_storage;
pub mod store;
pub mod tags;
pub mod upload;

pub use auth::*;
pub use detail::*;
pub use draft::*;
pub use error::*;
pub use language::*;
pub use photo::*;
pub use record::*;
pub use session_storage::LocalStorageSessionStore;
pub use store::*;
pub use tags::*;
pub use upload::*;
