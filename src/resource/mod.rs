//! File-system resource subsystem.
//!
//! # Data Flow
//! ```text
//! registerResource("/web", "program:web")
//!     → portable.rs (parse logical path, resolve against roots)
//!     → chain.rs (ResourceResolver builds ordered stages)
//!         preference:web → program:web → not found
//!     → mounted as a Resource handler
//!
//! Per request:
//!     sub-path → stage 1 → (404) → stage 2 → (404) → terminal 404
//! ```

pub mod chain;
pub mod portable;

pub use chain::{ResourceChain, ResourceResolver, Stage};
pub use portable::{uri_for_portable_path, PortablePath, PortableRoots, Root};
