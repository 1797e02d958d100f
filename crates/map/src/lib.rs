//! Interactive memorial map: camera state, clustered markers and the view that
//! ties them to a rendering surface.
//!
//! Everything here runs on one thread. The only asynchronous piece is the
//! initial record fetch in [`loader`].

pub mod config;
pub mod controller;
pub mod loader;
pub mod markers;
pub mod surface;
pub mod view;
pub mod viewport;

pub use config::*;
pub use controller::*;
pub use loader::*;
pub use markers::*;
pub use surface::*;
pub use view::*;
pub use viewport::*;
