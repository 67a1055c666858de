//! Beacon advertisement parsing, ranging and payload encoding.
//!
//! Advertisement frames are a sequence of length-prefixed AD records. Beacon
//! identity lives in the manufacturer-specific record (type `0xFF`):
//!
//! ```text
//! len FF | mID0 mID1 | bID1 bID0 | uuid (16, big-endian) | M1 M0 | m1 m0 | tx
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::ScanConfiguration;
use crate::error::{Error, Result};

/// AD type of a manufacturer-specific data record.
pub const MANUFACTURER_SPECIFIC_DATA: u8 = 0xFF;

/// Company identifier written into broadcast frames.
pub const BEACON_COMPANY_ID: u16 = 0x004C;

/// Beacon type prefix (0x0215) that starts every broadcast payload.
pub const BEACON_PREFIX: [u8; 2] = [0x02, 0x15];

/// Calibrated power advertised in broadcast payloads, in dBm.
pub const CALIBRATED_POWER: i8 = -69;

/// Length of the broadcast payload: prefix, UUID, major, minor and power.
pub const PAYLOAD_LEN: usize = 23;

/// Proximity band estimated from signal attenuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Proximity {
    /// Accuracy could not be determined.
    #[default]
    Unknown = 0,
    /// Within half a meter.
    Immediate = 1,
    /// Within a few meters.
    Near = 2,
    /// Further away.
    Far = 3,
}

impl Proximity {
    /// Create from raw value.
    pub fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Immediate,
            2 => Self::Near,
            3 => Self::Far,
            _ => Self::Unknown,
        }
    }

    /// Classify an accuracy estimate.
    ///
    /// Band edges belong to the band above: 0.5 is Near and 4.0 is Far.
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy < 0.0 {
            Self::Unknown
        } else if accuracy < 0.5 {
            Self::Immediate
        } else if accuracy < 4.0 {
            Self::Near
        } else {
            Self::Far
        }
    }

    /// Classify from calibrated power and live signal strength.
    pub fn from_signal(tx_power: i16, rssi: i16) -> Self {
        Self::from_accuracy(accuracy(tx_power, rssi))
    }
}

impl std::fmt::Display for Proximity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Immediate => write!(f, "Immediate"),
            Self::Near => write!(f, "Near"),
            Self::Far => write!(f, "Far"),
        }
    }
}

/// Estimate the distance accuracy from calibrated power and RSSI.
///
/// Returns `-1.0` when either input is zero. The curve constants are an
/// empirical fit and must not be tuned.
///
/// # Example
///
/// ```
/// use gatt_central::ble::advertising::accuracy;
///
/// assert_eq!(accuracy(0, -60), -1.0);
/// assert!((accuracy(-69, -69) - 1.01076).abs() < 1e-9);
/// ```
pub fn accuracy(tx_power: i16, rssi: i16) -> f64 {
    if tx_power == 0 || rssi == 0 {
        return -1.0;
    }

    let ratio = rssi as f64 / tx_power as f64;
    if ratio < 1.0 {
        ratio.powi(10)
    } else {
        0.89976 * ratio.powf(7.7095) + 0.111
    }
}

/// Beacon identity decoded from a manufacturer-specific record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeaconAdvertisement {
    /// Company identifier (little-endian on the wire).
    pub manufacturer_id: u16,
    /// Beacon type identifier.
    pub beacon_id: u16,
    /// Proximity UUID.
    pub uuid: Uuid,
    /// Major value.
    pub major: u16,
    /// Minor value.
    pub minor: u16,
    /// Calibrated power at one meter, in dBm.
    pub tx_power: i16,
}

impl BeaconAdvertisement {
    /// Length of the record data after the type byte.
    pub const RECORD_LEN: usize = 25;

    /// Parse manufacturer-specific record data (without length and type).
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::RECORD_LEN {
            return Err(Error::InvalidData {
                context: format!(
                    "Beacon record too short: {} bytes (need at least {})",
                    data.len(),
                    Self::RECORD_LEN
                ),
            });
        }

        let manufacturer_id = u16::from_le_bytes([data[0], data[1]]);
        let beacon_id = u16::from_be_bytes([data[2], data[3]]);

        let mut uuid_bytes = [0u8; 16];
        uuid_bytes.copy_from_slice(&data[4..20]);
        let uuid = Uuid::from_bytes(uuid_bytes);

        let major = u16::from_be_bytes([data[20], data[21]]);
        let minor = u16::from_be_bytes([data[22], data[23]]);

        // Power is an unsigned byte rebased by 256.
        let tx_power = data[24] as i16 - 256;

        Ok(Self {
            manufacturer_id,
            beacon_id,
            uuid,
            major,
            minor,
            tx_power,
        })
    }

    /// Parse every beacon record in an advertisement frame.
    ///
    /// Manufacturer records too short to hold a beacon are skipped. A record
    /// whose length runs past the end of the frame is an error.
    pub fn parse_frame(frame: &[u8]) -> Result<Vec<Self>> {
        let mut beacons = Vec::new();
        for record in manufacturer_records(frame)? {
            match Self::parse(record) {
                Ok(beacon) => beacons.push(beacon),
                Err(e) => trace!("Skipping manufacturer record: {}", e),
            }
        }
        Ok(beacons)
    }
}

/// Collect the data of all manufacturer-specific records in a frame.
///
/// A zero length byte ends the frame.
pub fn manufacturer_records(frame: &[u8]) -> Result<Vec<&[u8]>> {
    let mut records = Vec::new();
    let mut index = 0;

    while index < frame.len() {
        let length = frame[index] as usize;
        index += 1;
        if length == 0 {
            break;
        }

        let end = index + length;
        let record = frame.get(index..end).ok_or_else(|| Error::InvalidData {
            context: format!(
                "AD record of {} bytes at offset {} overruns {}-byte frame",
                length,
                index - 1,
                frame.len()
            ),
        })?;

        if record[0] == MANUFACTURER_SPECIFIC_DATA {
            records.push(&record[1..]);
        }
        index = end;
    }

    Ok(records)
}

/// Build a manufacturer-specific AD record.
///
/// Returns `None` if the data does not fit a single record.
pub fn manufacturer_record(company_id: u16, data: &[u8]) -> Option<Bytes> {
    let length = u8::try_from(data.len() + 3).ok()?;

    let mut record = BytesMut::with_capacity(length as usize + 1);
    record.put_u8(length);
    record.put_u8(MANUFACTURER_SPECIFIC_DATA);
    record.put_u16_le(company_id);
    record.put_slice(data);
    Some(record.freeze())
}

/// Encode the broadcast payload for a beacon identity.
pub fn encode_payload(uuid: &Uuid, major: u16, minor: u16) -> [u8; PAYLOAD_LEN] {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[0..2].copy_from_slice(&BEACON_PREFIX);
    payload[2..18].copy_from_slice(uuid.as_bytes());
    payload[18..20].copy_from_slice(&major.to_be_bytes());
    payload[20..22].copy_from_slice(&minor.to_be_bytes());
    payload[22] = CALIBRATED_POWER as u8;
    payload
}

/// Wrap a broadcast payload into a complete advertisement frame.
pub fn advertisement_frame(payload: &[u8; PAYLOAD_LEN]) -> Bytes {
    let mut frame = BytesMut::with_capacity(PAYLOAD_LEN + 4);
    frame.put_u8(PAYLOAD_LEN as u8 + 3);
    frame.put_u8(MANUFACTURER_SPECIFIC_DATA);
    frame.put_u16_le(BEACON_COMPANY_ID);
    frame.put_slice(payload);
    frame.freeze()
}

/// A ranged beacon sighting.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanDetection {
    /// Proximity UUID.
    pub uuid: Uuid,
    /// Major value.
    pub major: u16,
    /// Minor value.
    pub minor: u16,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// Estimated proximity.
    pub proximity: Proximity,
    /// When the frame was received.
    pub detected_at: DateTime<Utc>,
}

impl std::fmt::Display for ScanDetection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} major={} minor={} rssi={} proximity={}",
            self.uuid, self.major, self.minor, self.rssi, self.proximity
        )
    }
}

/// Turns raw advertisement frames into filtered [`ScanDetection`]s.
#[derive(Debug, Clone, Default)]
pub struct BeaconRanger {
    filter: ScanConfiguration,
}

impl BeaconRanger {
    /// Create a ranger for the given UUID filter.
    pub fn new(filter: ScanConfiguration) -> Self {
        Self { filter }
    }

    /// Get the active filter.
    pub fn filter(&self) -> &ScanConfiguration {
        &self.filter
    }

    /// Range every accepted beacon in a frame.
    pub fn detect(&self, frame: &[u8], rssi: i16) -> Result<Vec<ScanDetection>> {
        let detected_at = Utc::now();
        let detections = BeaconAdvertisement::parse_frame(frame)?
            .into_iter()
            .filter(|beacon| {
                let accepted = self.filter.accepts(&beacon.uuid);
                if !accepted {
                    trace!("Beacon {} not in scan filter", beacon.uuid);
                }
                accepted
            })
            .map(|beacon| {
                let proximity = Proximity::from_signal(beacon.tx_power, rssi);
                debug!(
                    "Beacon {} major={} minor={} power={} rssi={} -> {}",
                    beacon.uuid, beacon.major, beacon.minor, beacon.tx_power, rssi, proximity
                );
                ScanDetection {
                    uuid: beacon.uuid,
                    major: beacon.major,
                    minor: beacon.minor,
                    rssi,
                    proximity,
                    detected_at,
                }
            })
            .collect();

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEACON_UUID: &str = "e2c56db5-dffb-48d2-b060-d0f5a71096e0";

    fn beacon_uuid() -> Uuid {
        Uuid::parse_str(BEACON_UUID).unwrap()
    }

    #[test]
    fn test_proximity_bands() {
        assert_eq!(Proximity::from_accuracy(-1.0), Proximity::Unknown);
        assert_eq!(Proximity::from_accuracy(0.0), Proximity::Immediate);
        assert_eq!(Proximity::from_accuracy(0.4999), Proximity::Immediate);
        assert_eq!(Proximity::from_accuracy(0.5), Proximity::Near);
        assert_eq!(Proximity::from_accuracy(3.999), Proximity::Near);
        assert_eq!(Proximity::from_accuracy(4.0), Proximity::Far);
    }

    #[test]
    fn test_proximity_from_signal() {
        assert_eq!(Proximity::from_signal(0, -60), Proximity::Unknown);
        assert_eq!(Proximity::from_signal(-69, 0), Proximity::Unknown);
        // Stronger than calibrated: ratio < 1.
        assert_eq!(Proximity::from_signal(-69, -40), Proximity::Immediate);
        // Equal to calibrated: about one meter.
        assert_eq!(Proximity::from_signal(-69, -69), Proximity::Near);
        assert_eq!(Proximity::from_signal(-69, -95), Proximity::Far);
    }

    #[test]
    fn test_proximity_raw() {
        assert_eq!(Proximity::from_raw(2), Proximity::Near);
        assert_eq!(Proximity::from_raw(9), Proximity::Unknown);
        assert_eq!(Proximity::Far as u8, 3);
    }

    #[test]
    fn test_encode_payload_layout() {
        let payload = encode_payload(&beacon_uuid(), 1, 0x0203);
        assert_eq!(&payload[0..2], &[0x02, 0x15]);
        assert_eq!(&payload[2..6], &[0xE2, 0xC5, 0x6D, 0xB5]);
        assert_eq!(&payload[18..22], &[0x00, 0x01, 0x02, 0x03]);
        assert_eq!(payload[22], 0xBB);
    }

    #[test]
    fn test_frame_roundtrip() {
        let payload = encode_payload(&beacon_uuid(), 100, 7);
        let frame = advertisement_frame(&payload);
        assert_eq!(&frame[..4], &[0x1A, 0xFF, 0x4C, 0x00]);

        let beacons = BeaconAdvertisement::parse_frame(&frame).unwrap();
        assert_eq!(beacons.len(), 1);
        let beacon = beacons[0];
        assert_eq!(beacon.manufacturer_id, BEACON_COMPANY_ID);
        assert_eq!(beacon.beacon_id, 0x0215);
        assert_eq!(beacon.uuid, beacon_uuid());
        assert_eq!(beacon.major, 100);
        assert_eq!(beacon.minor, 7);
        assert_eq!(beacon.tx_power, -69);
    }

    #[test]
    fn test_frame_with_other_records() {
        let payload = encode_payload(&beacon_uuid(), 1, 2);
        let mut frame = vec![0x02, 0x01, 0x06]; // flags record
        frame.extend_from_slice(&advertisement_frame(&payload));
        frame.extend_from_slice(&[0x00, 0xAA, 0xBB]); // terminator and padding

        let beacons = BeaconAdvertisement::parse_frame(&frame).unwrap();
        assert_eq!(beacons.len(), 1);
        assert_eq!(beacons[0].minor, 2);
    }

    #[test]
    fn test_short_manufacturer_record_is_skipped() {
        let record = manufacturer_record(0x0059, &[0x01, 0x02]).unwrap();
        assert_eq!(&record[..], &[0x05, 0xFF, 0x59, 0x00, 0x01, 0x02]);
        assert!(BeaconAdvertisement::parse_frame(&record).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_frame() {
        let payload = encode_payload(&beacon_uuid(), 1, 2);
        let frame = advertisement_frame(&payload);
        let result = BeaconAdvertisement::parse_frame(&frame[..10]);
        assert!(matches!(result, Err(Error::InvalidData { .. })));

        assert!(BeaconAdvertisement::parse(&[0x4C, 0x00]).is_err());
    }

    #[test]
    fn test_manufacturer_record_too_long() {
        assert!(manufacturer_record(0x004C, &[0u8; 253]).is_none());
        assert!(manufacturer_record(0x004C, &[0u8; 252]).is_some());
    }

    #[test]
    fn test_ranger_filter() {
        let frame = advertisement_frame(&encode_payload(&beacon_uuid(), 1, 2));

        let ranger = BeaconRanger::default();
        let detections = ranger.detect(&frame, -69).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].rssi, -69);
        assert_eq!(detections[0].proximity, Proximity::Near);

        let ranger = BeaconRanger::new(ScanConfiguration::new().with_uuid(beacon_uuid()));
        assert_eq!(ranger.detect(&frame, -50).unwrap().len(), 1);

        let other = Uuid::parse_str("f7826da6-4fa2-4e98-8024-bc5b71e0893e").unwrap();
        let ranger = BeaconRanger::new(ScanConfiguration::new().with_uuid(other));
        assert!(ranger.detect(&frame, -50).unwrap().is_empty());
    }
}
