//! Generic little-endian integer decoding.
//!
//! Format codes follow the GATT characteristic presentation format: the low
//! nibble is the width in bytes, the high nibble the signedness.

/// Integer format of a characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FormatType {
    /// Unsigned 8-bit.
    Uint8 = 0x11,
    /// Unsigned 16-bit.
    Uint16 = 0x12,
    /// Unsigned 32-bit.
    Uint32 = 0x14,
    /// Signed 8-bit.
    Sint8 = 0x21,
    /// Signed 16-bit.
    Sint16 = 0x22,
    /// Signed 32-bit.
    Sint32 = 0x24,
}

impl FormatType {
    /// Create from raw format code.
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0x11 => Some(Self::Uint8),
            0x12 => Some(Self::Uint16),
            0x14 => Some(Self::Uint32),
            0x21 => Some(Self::Sint8),
            0x22 => Some(Self::Sint16),
            0x24 => Some(Self::Sint32),
            _ => None,
        }
    }

    /// Width of the value in bytes.
    pub fn width(&self) -> usize {
        (*self as u8 & 0x0F) as usize
    }

    /// Check if the format is two's-complement signed.
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Sint8 | Self::Sint16 | Self::Sint32)
    }
}

/// Read an integer at `offset`.
///
/// Returns `None` if `offset + width` exceeds the buffer.
///
/// # Example
///
/// ```
/// use gatt_central::protocol::format::{read_int, FormatType};
///
/// assert_eq!(read_int(&[0xFE, 0xFF], FormatType::Sint16, 0), Some(-2));
/// assert_eq!(read_int(&[0xFE, 0xFF], FormatType::Uint16, 0), Some(65534));
/// assert_eq!(read_int(&[0xFE, 0xFF], FormatType::Uint16, 1), None);
/// ```
pub fn read_int(value: &[u8], format: FormatType, offset: usize) -> Option<i64> {
    let end = offset.checked_add(format.width())?;
    let b = value.get(offset..end)?;

    let result = match format {
        FormatType::Uint8 => b[0] as i64,
        FormatType::Uint16 => u16::from_le_bytes([b[0], b[1]]) as i64,
        FormatType::Uint32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
        FormatType::Sint8 => b[0] as i8 as i64,
        FormatType::Sint16 => i16::from_le_bytes([b[0], b[1]]) as i64,
        FormatType::Sint32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
    };

    Some(result)
}

/// Read an unsigned byte at `offset`.
pub fn read_u8(value: &[u8], offset: usize) -> Option<u8> {
    value.get(offset).copied()
}

/// Read a little-endian `u16` at `offset`.
pub fn read_u16(value: &[u8], offset: usize) -> Option<u16> {
    read_int(value, FormatType::Uint16, offset).map(|v| v as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_widths() {
        assert_eq!(FormatType::Uint8.width(), 1);
        assert_eq!(FormatType::Sint16.width(), 2);
        assert_eq!(FormatType::Uint32.width(), 4);
        assert!(FormatType::Sint32.is_signed());
        assert!(!FormatType::Uint32.is_signed());
        assert_eq!(FormatType::from_raw(0x22), Some(FormatType::Sint16));
        assert_eq!(FormatType::from_raw(0x32), None);
    }

    #[test]
    fn test_unsigned() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_int(&data, FormatType::Uint8, 3), Some(4));
        assert_eq!(read_int(&data, FormatType::Uint16, 0), Some(0x0201));
        assert_eq!(read_int(&data, FormatType::Uint32, 0), Some(0x0403_0201));
        assert_eq!(
            read_int(&[0xFF; 4], FormatType::Uint32, 0),
            Some(u32::MAX as i64)
        );
    }

    #[test]
    fn test_signed() {
        assert_eq!(read_int(&[0x80], FormatType::Sint8, 0), Some(-128));
        assert_eq!(read_int(&[0x7F], FormatType::Sint8, 0), Some(127));
        assert_eq!(read_int(&[0x00, 0x80], FormatType::Sint16, 0), Some(-32768));
        assert_eq!(
            read_int(&[0xFF, 0xFF, 0xFF, 0xFF], FormatType::Sint32, 0),
            Some(-1)
        );
    }

    #[test]
    fn test_out_of_bounds() {
        assert_eq!(read_int(&[], FormatType::Uint8, 0), None);
        assert_eq!(read_int(&[0x01, 0x02, 0x03], FormatType::Uint32, 0), None);
        assert_eq!(read_int(&[0x01, 0x02], FormatType::Uint16, 1), None);
        assert_eq!(read_int(&[0x01], FormatType::Uint8, usize::MAX), None);
        assert_eq!(read_u16(&[0x34, 0x12], 0), Some(0x1234));
        assert_eq!(read_u8(&[0x34], 1), None);
    }
}
