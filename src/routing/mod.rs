//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! register*(pattern, ...)
//!     → matcher.rs (validate pattern, derive prefix)
//!     → registry.rs (conflict policy)
//!     → handler factory (build mount)
//!     → table.rs (commit under lock, publish snapshot)
//!
//! Incoming Request (path)
//!     → router.rs (longest-prefix lookup on the snapshot)
//!     → Mount::serve
//! ```
//!
//! # Design Decisions
//! - The registry is the single source of truth for conflicts
//! - Precedence between kinds on one pattern comes from registration order
//!   plus the overwrite/refuse rules
//! - Dispatch picks the longest matching prefix; distinct patterns with an
//!   equal prefix (`/admin`, `/admin/*`) tie-break by kind precedence
//! - Deterministic: same input always matches same mount

pub mod matcher;
pub mod registry;
pub mod router;
pub mod table;

pub use matcher::{PatternError, UrlPattern};
pub use registry::{Admission, ConflictError, RegistrationKind, Registry};
pub use router::HandlerTree;
pub use table::{RegistrationError, RouteTable, ServletRegistration};
