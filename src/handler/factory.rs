//! Handler factory.
//!
//! Converts a registration into a mount bound to one URL pattern. This is the
//! only place that dispatches on the registration kind.

use crate::handler::{Mount, MountHandler, Registration};
use crate::resource::ResourceResolver;
use crate::routing::UrlPattern;

/// Build the mount for `registration` under `pattern`.
pub fn build(pattern: UrlPattern, registration: Registration, resolver: &ResourceResolver) -> Mount {
    let handler = match registration {
        Registration::Denial => MountHandler::Denial,
        Registration::Redirection { target } => MountHandler::Redirection { target },
        Registration::Resource { path } => {
            MountHandler::Resource(resolver.resolve(pattern.as_str(), &path))
        }
        Registration::Servlet { name, servlet } => MountHandler::Servlet { name, servlet },
    };
    Mount::new(pattern, handler)
}
