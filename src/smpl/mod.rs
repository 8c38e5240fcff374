//! The `smpl` chunk: sampler metadata carrying a sample's root note.
//!
//! Only the fixed header is interpreted. Loop records and sampler-specific
//! data that follow it are kept as an opaque tail so that re-encoding a
//! decoded chunk reproduces it byte for byte.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::SmplError;
use crate::midi::DevicePitch;

/// The FourCC identifier for the sampler chunk.
pub const SMPL_CHUNK_ID: [u8; 4] = *b"smpl";

/// Width of the fixed header: two FourCCs and seven `u32` fields.
pub const SMPL_HEADER_LEN: usize = 4 + 4 + 4 * 7;

/// Nanoseconds per sample at 44.1 kHz.
const DEFAULT_SAMPLE_PERIOD: u32 = 22675;

const DEFAULT_UNITY_NOTE: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmplRecord {
    pub manufacturer: [u8; 4],
    pub product: [u8; 4],
    pub sample_period: u32,
    pub unity_note: u32,
    pub pitch_fraction: u32,
    pub smpte_format: u32,
    pub smpte_offset: u32,
    pub num_sample_loops: u32,
    pub sample_data: u32,
    /// Everything after the fixed header, verbatim.
    pub tail: Vec<u8>,
}

impl Default for SmplRecord {
    fn default() -> Self {
        Self {
            manufacturer: [0; 4],
            product: [0; 4],
            sample_period: DEFAULT_SAMPLE_PERIOD,
            unity_note: DEFAULT_UNITY_NOTE,
            pitch_fraction: 0,
            smpte_format: 0,
            smpte_offset: 0,
            num_sample_loops: 0,
            sample_data: 0,
            tail: Vec::new(),
        }
    }
}

impl SmplRecord {
    /// Decode a chunk payload.
    ///
    /// # Errors
    ///
    /// Returns [`SmplError::TruncatedRecord`] if `data` is shorter than the
    /// fixed header.
    pub fn decode(data: &[u8]) -> Result<Self, SmplError> {
        if data.len() < SMPL_HEADER_LEN {
            return Err(SmplError::TruncatedRecord {
                len: data.len(),
                expected: SMPL_HEADER_LEN,
            });
        }

        let (header, tail) = data.split_at(SMPL_HEADER_LEN);
        let mut manufacturer = [0u8; 4];
        let mut product = [0u8; 4];
        manufacturer.copy_from_slice(&header[0..4]);
        product.copy_from_slice(&header[4..8]);

        let mut fields = [0u32; 7];
        let mut cursor = Cursor::new(&header[8..]);
        cursor
            .read_u32_into::<LittleEndian>(&mut fields)
            .map_err(|_| SmplError::TruncatedRecord {
                len: data.len(),
                expected: SMPL_HEADER_LEN,
            })?;
        let [sample_period, unity_note, pitch_fraction, smpte_format, smpte_offset, num_sample_loops, sample_data] =
            fields;

        Ok(Self {
            manufacturer,
            product,
            sample_period,
            unity_note,
            pitch_fraction,
            smpte_format,
            smpte_offset,
            num_sample_loops,
            sample_data,
            tail: tail.to_vec(),
        })
    }

    /// Encode the record as a chunk payload (no chunk header).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SMPL_HEADER_LEN + self.tail.len());
        out.extend_from_slice(&self.manufacturer);
        out.extend_from_slice(&self.product);
        for value in [
            self.sample_period,
            self.unity_note,
            self.pitch_fraction,
            self.smpte_format,
            self.smpte_offset,
            self.num_sample_loops,
            self.sample_data,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&self.tail);
        out
    }

    pub fn device_pitch(&self) -> DevicePitch {
        DevicePitch::new(self.unity_note, self.pitch_fraction)
    }

    /// Copy of this record with the root note and fine tune replaced.
    pub fn with_device_pitch(&self, pitch: DevicePitch) -> Self {
        Self {
            unity_note: pitch.unity_note,
            pitch_fraction: pitch.pitch_fraction,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"\x01\x00\x00\x01");
        data.extend_from_slice(b"ABCD");
        for v in [22675u32, 57, 0x4000_0000, 25, 0x0102_0304, 1, 4] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        // One loop record plus sampler data
        for v in [0u32, 0, 100, 2000, 0, 0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[9, 8, 7, 6]);
        data
    }

    #[test]
    fn test_decode_fields() {
        let record = SmplRecord::decode(&sample_payload()).unwrap();
        assert_eq!(&record.manufacturer, b"\x01\x00\x00\x01");
        assert_eq!(&record.product, b"ABCD");
        assert_eq!(record.sample_period, 22675);
        assert_eq!(record.unity_note, 57);
        assert_eq!(record.pitch_fraction, 0x4000_0000);
        assert_eq!(record.smpte_format, 25);
        assert_eq!(record.smpte_offset, 0x0102_0304);
        assert_eq!(record.num_sample_loops, 1);
        assert_eq!(record.sample_data, 4);
        assert_eq!(record.tail.len(), 28);
        assert_eq!(&record.tail[24..], &[9, 8, 7, 6]);
    }

    #[test]
    fn test_round_trip_preserves_tail() {
        let payload = sample_payload();
        let record = SmplRecord::decode(&payload).unwrap();
        assert_eq!(record.encode(), payload);
    }

    #[test]
    fn test_round_trip_arbitrary_bytes() {
        for len in [SMPL_HEADER_LEN, SMPL_HEADER_LEN + 1, SMPL_HEADER_LEN + 61] {
            let payload: Vec<u8> = (0..len).map(|i| (i * 37 % 251) as u8).collect();
            let record = SmplRecord::decode(&payload).unwrap();
            assert_eq!(record.encode(), payload);
        }
    }

    #[test]
    fn test_encode_field_layout() {
        let record = SmplRecord::default().with_device_pitch(DevicePitch::new(69, 0x8000_0001));
        let bytes = record.encode();
        assert_eq!(&bytes[12..16], &[69, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &[0x01, 0, 0, 0x80]);
        assert_eq!(&bytes[28..36], &[0u8; 8]);
    }

    #[test]
    fn test_truncated_record() {
        let payload = vec![0u8; SMPL_HEADER_LEN - 1];
        let err = SmplRecord::decode(&payload).unwrap_err();
        assert!(matches!(
            err,
            SmplError::TruncatedRecord {
                len: 35,
                expected: 36
            }
        ));
        assert!(SmplRecord::decode(&[]).is_err());
    }

    #[test]
    fn test_default_record() {
        let record = SmplRecord::default();
        let bytes = record.encode();
        assert_eq!(bytes.len(), SMPL_HEADER_LEN);
        assert_eq!(&bytes[0..8], &[0u8; 8]);
        assert_eq!(&bytes[8..12], &22675u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &60u32.to_le_bytes());
        assert!(bytes[16..].iter().all(|&b| b == 0));
        assert_eq!(SmplRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_with_device_pitch_replaces_only_pitch() {
        let original = SmplRecord::decode(&sample_payload()).unwrap();
        let updated = original.with_device_pitch(DevicePitch::new(69, 12345));
        assert_eq!(updated.device_pitch(), DevicePitch::new(69, 12345));
        assert_eq!(original.device_pitch(), DevicePitch::new(57, 0x4000_0000));
        assert_eq!(updated.tail, original.tail);
        assert_eq!(updated.smpte_offset, original.smpte_offset);
        assert_eq!(updated.num_sample_loops, original.num_sample_loops);
    }
}
