//! Session configuration and beacon scan filters.

use tracing::warn;
use uuid::Uuid;

/// Default capacity of the device event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default capacity of the beacon detection channel.
pub const DEFAULT_DETECTION_CAPACITY: usize = 64;

/// Default capacity of the driver command queue.
pub const DEFAULT_COMMAND_CAPACITY: usize = 32;

/// Channel sizing for a [`DeviceManager`](crate::DeviceManager) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManagerConfig {
    /// Buffered device events per subscriber before lagging.
    pub event_capacity: usize,
    /// Buffered beacon detections per subscriber before lagging.
    pub detection_capacity: usize,
    /// Commands queued for the radio driver.
    pub command_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            detection_capacity: DEFAULT_DETECTION_CAPACITY,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

impl ManagerConfig {
    /// Create a configuration with default capacities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device event channel capacity (at least 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the beacon detection channel capacity (at least 1).
    pub fn with_detection_capacity(mut self, capacity: usize) -> Self {
        self.detection_capacity = capacity.max(1);
        self
    }

    /// Set the driver command queue capacity (at least 1).
    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }
}

/// Ordered list of beacon UUID filters.
///
/// An empty list accepts every beacon.
///
/// # Example
///
/// ```
/// use gatt_central::ScanConfiguration;
/// use uuid::Uuid;
///
/// let mut config = ScanConfiguration::new();
/// assert!(config.add_uuid_str("E2C56DB5-DFFB-48D2-B060-D0F5A71096E0"));
///
/// let uuid = Uuid::parse_str("e2c56db5-dffb-48d2-b060-d0f5a71096e0").unwrap();
/// assert!(config.accepts(&uuid));
/// assert!(!config.accepts(&Uuid::nil()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanConfiguration {
    uuids: Vec<Uuid>,
}

impl ScanConfiguration {
    /// Create an empty (accept-all) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add_uuid`](Self::add_uuid).
    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.add_uuid(uuid);
        self
    }

    /// Append a filter. Duplicates are ignored.
    pub fn add_uuid(&mut self, uuid: Uuid) {
        if !self.uuids.contains(&uuid) {
            self.uuids.push(uuid);
        }
    }

    /// Parse and append a filter.
    ///
    /// Returns `false` (and logs) if the string is not a UUID.
    pub fn add_uuid_str(&mut self, uuid: &str) -> bool {
        match Uuid::parse_str(uuid.trim()) {
            Ok(uuid) => {
                self.add_uuid(uuid);
                true
            }
            Err(e) => {
                warn!("Ignoring invalid scan filter {:?}: {}", uuid, e);
                false
            }
        }
    }

    /// Remove a filter. Returns `true` if it was present.
    pub fn remove_uuid(&mut self, uuid: &Uuid) -> bool {
        let before = self.uuids.len();
        self.uuids.retain(|u| u != uuid);
        self.uuids.len() != before
    }

    /// Get the filters in insertion order.
    pub fn uuids(&self) -> &[Uuid] {
        &self.uuids
    }

    /// Check if there are no filters.
    pub fn is_empty(&self) -> bool {
        self.uuids.is_empty()
    }

    /// Check if a beacon UUID passes the filter.
    pub fn accepts(&self, uuid: &Uuid) -> bool {
        self.uuids.is_empty() || self.uuids.contains(uuid)
    }
}

impl FromIterator<Uuid> for ScanConfiguration {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        let mut config = Self::new();
        for uuid in iter {
            config.add_uuid(uuid);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_config_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.event_capacity, 256);
        assert_eq!(config.detection_capacity, 64);
        assert_eq!(config.command_capacity, 32);

        let config = ManagerConfig::new()
            .with_event_capacity(0)
            .with_detection_capacity(8);
        assert_eq!(config.event_capacity, 1);
        assert_eq!(config.detection_capacity, 8);
    }

    #[test]
    fn test_scan_configuration_order_and_dedup() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let mut config = ScanConfiguration::new().with_uuid(b).with_uuid(a);
        config.add_uuid(b);
        assert_eq!(config.uuids(), &[b, a]);

        assert!(config.remove_uuid(&b));
        assert!(!config.remove_uuid(&b));
        assert_eq!(config.uuids(), &[a]);
    }

    #[test]
    fn test_empty_accepts_all() {
        let config = ScanConfiguration::new();
        assert!(config.is_empty());
        assert!(config.accepts(&Uuid::from_u128(42)));
    }

    #[test]
    fn test_add_uuid_str() {
        let mut config = ScanConfiguration::new();
        assert!(!config.add_uuid_str("not-a-uuid"));
        assert!(config.add_uuid_str("F7826DA6-4FA2-4E98-8024-BC5B71E0893E"));
        assert!(config.add_uuid_str("f7826da6-4fa2-4e98-8024-bc5b71e0893e"));
        assert_eq!(config.uuids().len(), 1);
    }
}
