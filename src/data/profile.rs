//! Profile (GATT service) nodes.

use uuid::Uuid;

use crate::ble::specs::service_label;
use crate::data::characteristic::Characteristic;

/// Service classification reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProfileType {
    /// Primary service.
    #[default]
    Primary,
    /// Secondary (included) service.
    Secondary,
    /// Any other driver-specific classification.
    Custom(String),
}

impl ProfileType {
    /// Parse a driver type token such as `"Primary Service"`.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("Primary Service") || token.eq_ignore_ascii_case("primary")
        {
            Self::Primary
        } else if token.eq_ignore_ascii_case("Secondary Service")
            || token.eq_ignore_ascii_case("secondary")
        {
            Self::Secondary
        } else {
            Self::Custom(token.to_string())
        }
    }

    /// Check if this is a primary service.
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary)
    }
}

impl std::fmt::Display for ProfileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "Primary Service"),
            Self::Secondary => write!(f, "Secondary Service"),
            Self::Custom(token) => write!(f, "{}", token),
        }
    }
}

/// A GATT service on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Profile {
    /// Service UUID.
    pub uuid: Uuid,
    /// Service classification.
    pub kind: ProfileType,
    /// Characteristics in discovery order, unique by UUID.
    pub characteristics: Vec<Characteristic>,
}

impl Profile {
    /// Create a profile with no characteristics.
    pub fn new(uuid: Uuid, kind: ProfileType) -> Self {
        Self {
            uuid,
            kind,
            characteristics: Vec::new(),
        }
    }

    /// Find a characteristic by UUID.
    pub fn characteristic(&self, uuid: &Uuid) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.uuid == *uuid)
    }

    /// Find a characteristic by UUID for mutation.
    pub fn characteristic_mut(&mut self, uuid: &Uuid) -> Option<&mut Characteristic> {
        self.characteristics.iter_mut().find(|c| c.uuid == *uuid)
    }

    /// Specification name, or "Custom Service".
    pub fn label(&self) -> String {
        service_label(&self.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::HEART_RATE_SERVICE_UUID;

    #[test]
    fn test_profile_type_tokens() {
        assert_eq!(ProfileType::from_token("Primary Service"), ProfileType::Primary);
        assert_eq!(
            ProfileType::from_token("secondary service"),
            ProfileType::Secondary
        );
        assert_eq!(
            ProfileType::from_token("Vendor"),
            ProfileType::Custom("Vendor".to_string())
        );
        assert_eq!(ProfileType::Secondary.to_string(), "Secondary Service");
        assert!(ProfileType::default().is_primary());
    }

    #[test]
    fn test_profile_label() {
        let profile = Profile::new(HEART_RATE_SERVICE_UUID, ProfileType::Primary);
        assert_eq!(profile.label(), "Heart Rate");
        assert!(profile.characteristic(&HEART_RATE_SERVICE_UUID).is_none());

        let custom = Profile::new(Uuid::from_u128(7), ProfileType::Primary);
        assert_eq!(custom.label(), "Custom Service");
    }
}
