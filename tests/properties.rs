//! Property tests for the pure codecs.

use gatt_central::ble::advertising::{
    accuracy, advertisement_frame, encode_payload, BeaconAdvertisement, Proximity,
};
use gatt_central::ble::uuids::{compress, expand};
use proptest::prelude::*;
use uuid::Uuid;

proptest! {
    #[test]
    fn token_survives_expand_and_compress(token in "[0-9a-f]{4}") {
        let uuid = expand(&token).unwrap();
        prop_assert_eq!(compress(&uuid), token);
    }

    #[test]
    fn uppercase_tokens_compress_to_lowercase(token in "[0-9A-F]{4}") {
        let uuid = expand(&token).unwrap();
        prop_assert_eq!(compress(&uuid), token.to_ascii_lowercase());
    }

    #[test]
    fn beacon_payload_decodes_to_identity(
        bytes in any::<[u8; 16]>(),
        major in any::<u16>(),
        minor in any::<u16>(),
    ) {
        let uuid = Uuid::from_bytes(bytes);
        let frame = advertisement_frame(&encode_payload(&uuid, major, minor));

        let beacons = BeaconAdvertisement::parse_frame(&frame).unwrap();
        prop_assert_eq!(beacons.len(), 1);
        prop_assert_eq!(beacons[0].uuid, uuid);
        prop_assert_eq!(beacons[0].major, major);
        prop_assert_eq!(beacons[0].minor, minor);
        prop_assert_eq!(beacons[0].tx_power, -69);
    }

    #[test]
    fn zero_inputs_are_unknown(value in any::<i16>()) {
        prop_assert_eq!(Proximity::from_signal(0, value), Proximity::Unknown);
        prop_assert_eq!(Proximity::from_signal(value, 0), Proximity::Unknown);
    }

    #[test]
    fn proximity_is_pure(tx_power in -100i16..0, rssi in -120i16..0) {
        let first = Proximity::from_signal(tx_power, rssi);
        prop_assert_eq!(first, Proximity::from_signal(tx_power, rssi));
        prop_assert_eq!(first, Proximity::from_accuracy(accuracy(tx_power, rssi)));
        prop_assert_ne!(first, Proximity::Unknown);
    }

    #[test]
    fn truncated_frames_never_panic(frame in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = BeaconAdvertisement::parse_frame(&frame);
    }
}

#[test]
fn band_edges_belong_to_the_band_above() {
    assert_eq!(Proximity::from_accuracy(0.5), Proximity::Near);
    assert_eq!(Proximity::from_accuracy(4.0), Proximity::Far);
    assert_eq!(Proximity::from_accuracy(0.4999), Proximity::Immediate);
    assert_eq!(Proximity::from_accuracy(3.9999), Proximity::Near);
}
