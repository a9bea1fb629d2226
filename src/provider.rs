//! Provider-facing descriptor (data) and client (behavior).
//!
//! `descriptor` exposes validated metadata ([`ProviderDescriptor`]) covering the uid namespace
//! and the HTTPS-only verification and profile endpoints. `line` wraps those endpoints in a
//! bearer-authenticated client that turns provider responses into typed values.

pub mod descriptor;
pub mod line;

pub use descriptor::*;
pub use line::*;
