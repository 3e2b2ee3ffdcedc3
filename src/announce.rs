//! Service-discovery announcement.
//!
//! The controller publishes one announcement when the transport is ready and
//! withdraws it when stopping. Broadcasting is left to a [`ServiceAnnouncer`]
//! implementation; [`LogAnnouncer`] only records the event in the log.

use std::collections::BTreeMap;

use crate::config::AnnouncementConfig;

/// Property key advertising the JSON protocol.
pub const JSON_PROPERTY: &str = "json";

/// JSON protocol version advertised to clients.
pub const JSON_PROTOCOL_VERSION: &str = "5.0.0";

/// A service record to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub service_type: String,
    pub port: u16,
    pub properties: BTreeMap<String, String>,
}

impl Announcement {
    /// The record for this web server bound on `port`.
    pub fn web_server(config: &AnnouncementConfig, port: u16) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("path".to_string(), config.path.clone());
        properties.insert(JSON_PROPERTY.to_string(), JSON_PROTOCOL_VERSION.to_string());
        Self {
            service_type: config.service_type.clone(),
            port,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("service announcement failed: {0}")]
pub struct AnnounceError(pub String);

/// Publishes and withdraws service records.
pub trait ServiceAnnouncer: Send + Sync {
    fn publish(&self, announcement: &Announcement) -> Result<(), AnnounceError>;
    fn withdraw(&self, announcement: &Announcement) -> Result<(), AnnounceError>;
}

/// Announcer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnnouncer;

impl ServiceAnnouncer for LogAnnouncer {
    fn publish(&self, announcement: &Announcement) -> Result<(), AnnounceError> {
        tracing::info!(
            service_type = %announcement.service_type,
            port = announcement.port,
            properties = ?announcement.properties,
            "Publishing service announcement"
        );
        Ok(())
    }

    fn withdraw(&self, announcement: &Announcement) -> Result<(), AnnounceError> {
        tracing::info!(
            service_type = %announcement.service_type,
            port = announcement.port,
            "Withdrawing service announcement"
        );
        Ok(())
    }
}
