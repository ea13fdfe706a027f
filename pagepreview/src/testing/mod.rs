//! Testing utilities.
//!
//! In-memory stand-ins for the transport, rendering and image-search
//! collaborators, usable from downstream crates as well.

mod mocks;

pub use mocks::{MockImageSearch, MockRenderer, MockTransport};
