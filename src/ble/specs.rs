//! GATT assigned numbers.
//!
//! Lookup tables mapping 16-bit assigned numbers to specification names.
//! Services and descriptors are complete for the adopted GATT profiles this
//! crate knows about; characteristics cover the ones the value codec
//! decodes plus common device-information entries.
//!
//! See <https://www.bluetooth.com/specifications/assigned-numbers/>.

use uuid::Uuid;

use crate::ble::uuids::{self, assigned_number, format_token, from_assigned_number, is_base_uuid};

macro_rules! assigned_numbers {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($spec:literal, $number:literal),)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $(
                #[doc = $spec]
                $variant,
            )+
        }

        impl $name {
            /// Every entry in the table, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Human-readable specification name.
            pub fn specification_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $spec,)+
                }
            }

            /// 16-bit assigned number.
            pub fn assigned_number(&self) -> u16 {
                match self {
                    $($name::$variant => $number,)+
                }
            }

            /// Full 128-bit UUID built on the Bluetooth base template.
            pub fn uuid(&self) -> Uuid {
                from_assigned_number(self.assigned_number())
            }

            /// Look up an entry by assigned number.
            pub fn from_assigned_number(number: u16) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|entry| entry.assigned_number() == number)
            }

            /// Look up an entry by UUID. Custom (non-base) UUIDs never match.
            pub fn from_uuid(uuid: &Uuid) -> Option<Self> {
                if !is_base_uuid(uuid) {
                    return None;
                }
                Self::from_assigned_number(assigned_number(uuid))
            }

            /// Look up an entry by its exact specification name.
            pub fn from_specification_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|entry| entry.specification_name() == name)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.specification_name())
            }
        }
    };
}

assigned_numbers! {
    /// Adopted GATT services.
    pub enum GattService {
        AlertNotification => ("Alert Notification Service", 0x1811),
        AutomationIo => ("Automation IO", 0x1815),
        Battery => ("Battery Service", 0x180F),
        BloodPressure => ("Blood Pressure", 0x1810),
        BodyComposition => ("Body Composition", 0x181B),
        BondManagement => ("Bond Management", 0x181E),
        ContinuousGlucoseMonitoring => ("Continuous Glucose Monitoring", 0x181F),
        CurrentTime => ("Current Time Service", 0x1805),
        CyclingPower => ("Cycling Power", 0x1818),
        CyclingSpeedAndCadence => ("Cycling Speed and Cadence", 0x1816),
        DeviceInformation => ("Device Information", 0x180A),
        EnvironmentalSensing => ("Environmental Sensing", 0x181A),
        FitnessMachine => ("Fitness Machine", 0x1826),
        GenericAccess => ("Generic Access", 0x1800),
        GenericAttribute => ("Generic Attribute", 0x1801),
        Glucose => ("Glucose", 0x1808),
        HealthThermometer => ("Health Thermometer", 0x1809),
        HeartRate => ("Heart Rate", 0x180D),
        HttpProxy => ("HTTP Proxy", 0x1823),
        HumanInterfaceDevice => ("Human Interface Device", 0x1812),
        ImmediateAlert => ("Immediate Alert", 0x1802),
        IndoorPositioning => ("Indoor Positioning", 0x1821),
        InternetProtocolSupport => ("Internet Protocol Support", 0x1820),
        LinkLoss => ("Link Loss", 0x1803),
        LocationAndNavigation => ("Location and Navigation", 0x1819),
        NextDstChange => ("Next DST Change Service", 0x1807),
        ObjectTransfer => ("Object Transfer", 0x1825),
        PhoneAlertStatus => ("Phone Alert Status Service", 0x180E),
        PulseOximeter => ("Pulse Oximeter", 0x1822),
        ReferenceTimeUpdate => ("Reference Time Update Service", 0x1806),
        RunningSpeedAndCadence => ("Running Speed and Cadence", 0x1814),
        ScanParameters => ("Scan Parameters", 0x1813),
        TransportDiscovery => ("Transport Discovery", 0x1824),
        TxPower => ("Tx Power", 0x1804),
        UserData => ("User Data", 0x181C),
        WeightScale => ("Weight Scale", 0x181D),
    }
}

assigned_numbers! {
    /// Adopted GATT characteristics.
    pub enum GattCharacteristic {
        AerobicHeartRateLowerLimit => ("Aerobic Heart Rate Lower Limit", 0x2A7E),
        AerobicHeartRateUpperLimit => ("Aerobic Heart Rate Upper Limit", 0x2A84),
        AerobicThreshold => ("Aerobic Threshold", 0x2A7F),
        Age => ("Age", 0x2A80),
        AlertLevel => ("Alert Level", 0x2A06),
        AnaerobicHeartRateLowerLimit => ("Anaerobic Heart Rate Lower Limit", 0x2A81),
        AnaerobicHeartRateUpperLimit => ("Anaerobic Heart Rate Upper Limit", 0x2A82),
        AnaerobicThreshold => ("Anaerobic Threshold", 0x2A83),
        Appearance => ("Appearance", 0x2A01),
        BatteryLevel => ("Battery Level", 0x2A19),
        BodySensorLocation => ("Body Sensor Location", 0x2A38),
        DeviceName => ("Device Name", 0x2A00),
        EmailAddress => ("Email Address", 0x2A87),
        FatBurnHeartRateLowerLimit => ("Fat Burn Heart Rate Lower Limit", 0x2A88),
        FatBurnHeartRateUpperLimit => ("Fat Burn Heart Rate Upper Limit", 0x2A89),
        FirmwareRevisionString => ("Firmware Revision String", 0x2A26),
        FirstName => ("First Name", 0x2A8A),
        HardwareRevisionString => ("Hardware Revision String", 0x2A27),
        HeartRateControlPoint => ("Heart Rate Control Point", 0x2A39),
        HeartRateMax => ("Heart Rate Max", 0x2A8D),
        HeartRateMeasurement => ("Heart Rate Measurement", 0x2A37),
        HttpEntityBody => ("HTTP Entity Body", 0x2AB9),
        HttpHeaders => ("HTTP Headers", 0x2AB7),
        Language => ("Language", 0x2AA2),
        LastName => ("Last Name", 0x2A90),
        LocationName => ("Location Name", 0x2AB5),
        ManufacturerNameString => ("Manufacturer Name String", 0x2A29),
        MaximumRecommendedHeartRate => ("Maximum Recommended Heart Rate", 0x2A91),
        ModelNumberString => ("Model Number String", 0x2A24),
        ObjectName => ("Object Name", 0x2ABE),
        PeripheralPreferredConnectionParameters => ("Peripheral Preferred Connection Parameters", 0x2A04),
        PeripheralPrivacyFlag => ("Peripheral Privacy Flag", 0x2A02),
        PnpId => ("PnP ID", 0x2A50),
        RestingHeartRate => ("Resting Heart Rate", 0x2A92),
        SerialNumberString => ("Serial Number String", 0x2A25),
        ServiceChanged => ("Service Changed", 0x2A05),
        SoftwareRevisionString => ("Software Revision String", 0x2A28),
        SystemId => ("System ID", 0x2A23),
        TemperatureMeasurement => ("Temperature Measurement", 0x2A1C),
        TemperatureType => ("Temperature Type", 0x2A1D),
        TxPowerLevel => ("Tx Power Level", 0x2A07),
        Uri => ("URI", 0x2AB6),
    }
}

assigned_numbers! {
    /// Adopted GATT descriptors.
    pub enum GattDescriptor {
        CharacteristicAggregateFormat => ("Characteristic Aggregate Format", 0x2905),
        CharacteristicExtendedProperties => ("Characteristic Extended Properties", 0x2900),
        CharacteristicPresentationFormat => ("Characteristic Presentation Format", 0x2904),
        CharacteristicUserDescription => ("Characteristic User Description", 0x2901),
        ClientCharacteristicConfiguration => ("Client Characteristic Configuration", 0x2902),
        EnvironmentalSensingConfiguration => ("Environmental Sensing Configuration", 0x290B),
        EnvironmentalSensingMeasurement => ("Environmental Sensing Measurement", 0x290C),
        EnvironmentalSensingTriggerSetting => ("Environmental Sensing Trigger Setting", 0x290D),
        ExternalReportReference => ("External Report Reference", 0x2907),
        NumberOfDigitals => ("Number of Digitals", 0x2909),
        ReportReference => ("Report Reference", 0x2908),
        ServerCharacteristicConfiguration => ("Server Characteristic Configuration", 0x2903),
        TimeTriggerSetting => ("Time Trigger Setting", 0x290E),
        ValidRange => ("Valid Range", 0x2906),
        ValueTriggerSetting => ("Value Trigger Setting", 0x290A),
    }
}

impl GattService {
    /// Look up a service by name, accepting the name with or without a
    /// trailing " Service".
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_specification_name(name)
            .or_else(|| Self::from_specification_name(&format!("{} Service", name)))
    }
}

/// Short token for a known service, or the full UUID string otherwise.
pub fn service_token(uuid: &Uuid) -> String {
    match GattService::from_uuid(uuid) {
        Some(service) => format_token(service.assigned_number()),
        None => uuid.to_string(),
    }
}

/// Short token for a known characteristic, or the full UUID string otherwise.
pub fn characteristic_token(uuid: &Uuid) -> String {
    match GattCharacteristic::from_uuid(uuid) {
        Some(characteristic) => format_token(characteristic.assigned_number()),
        None => uuid.to_string(),
    }
}

/// Resolve a service by specification name, token, or UUID literal.
pub fn uuid_from_service_name(name: &str) -> Option<Uuid> {
    match GattService::from_name(name) {
        Some(service) => Some(service.uuid()),
        None => uuids::resolve(name),
    }
}

/// Resolve a characteristic by specification name, token, or UUID literal.
pub fn uuid_from_characteristic_name(name: &str) -> Option<Uuid> {
    match GattCharacteristic::from_specification_name(name) {
        Some(characteristic) => Some(characteristic.uuid()),
        None => uuids::resolve(name),
    }
}

/// Resolve a descriptor by specification name, token, or UUID literal.
pub fn uuid_from_descriptor_name(name: &str) -> Option<Uuid> {
    match GattDescriptor::from_specification_name(name) {
        Some(descriptor) => Some(descriptor.uuid()),
        None => uuids::resolve(name),
    }
}

/// Human-readable label for a service UUID.
pub fn service_label(uuid: &Uuid) -> String {
    GattService::from_uuid(uuid)
        .map(|s| s.specification_name().to_string())
        .unwrap_or_else(|| "Custom Service".to_string())
}

/// Human-readable label for a characteristic UUID.
pub fn characteristic_label(uuid: &Uuid) -> String {
    GattCharacteristic::from_uuid(uuid)
        .map(|c| c.specification_name().to_string())
        .unwrap_or_else(|| "Custom Characteristic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{HEART_RATE_MEASUREMENT_UUID, HEART_RATE_SERVICE_UUID};

    #[test]
    fn test_lookup_by_number() {
        assert_eq!(
            GattService::from_assigned_number(0x180D),
            Some(GattService::HeartRate)
        );
        assert_eq!(
            GattCharacteristic::from_uuid(&HEART_RATE_MEASUREMENT_UUID),
            Some(GattCharacteristic::HeartRateMeasurement)
        );
        assert_eq!(GattDescriptor::from_assigned_number(0x1234), None);
    }

    #[test]
    fn test_custom_uuid_does_not_match() {
        let custom = Uuid::parse_str("6e40180d-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(GattService::from_uuid(&custom), None);
        assert_eq!(service_token(&custom), custom.to_string());
    }

    #[test]
    fn test_tokens() {
        assert_eq!(service_token(&HEART_RATE_SERVICE_UUID), "180d");
        assert_eq!(characteristic_token(&HEART_RATE_MEASUREMENT_UUID), "2a37");
    }

    #[test]
    fn test_names() {
        assert_eq!(GattService::from_name("Battery"), Some(GattService::Battery));
        assert_eq!(
            GattService::from_name("Battery Service"),
            Some(GattService::Battery)
        );
        assert_eq!(
            uuid_from_service_name("Heart Rate"),
            Some(HEART_RATE_SERVICE_UUID)
        );
        assert_eq!(uuid_from_service_name("180d"), Some(HEART_RATE_SERVICE_UUID));
        assert_eq!(
            uuid_from_descriptor_name("Client Characteristic Configuration")
                .map(|u| u.to_string()),
            Some("00002902-0000-1000-8000-00805f9b34fb".to_string())
        );
        assert_eq!(uuid_from_characteristic_name("No Such Thing"), None);
        assert_eq!(service_label(&HEART_RATE_SERVICE_UUID), "Heart Rate");
    }

    #[test]
    fn test_tables_have_unique_numbers() {
        for (i, a) in GattCharacteristic::ALL.iter().enumerate() {
            for b in &GattCharacteristic::ALL[i + 1..] {
                assert_ne!(a.assigned_number(), b.assigned_number(), "{} / {}", a, b);
            }
        }
    }
}
