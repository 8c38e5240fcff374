//! RIFF/WAVE container framing.
//!
//! The file is held as an ordered list of chunks so that a single chunk can be
//! replaced and the whole container written back with every other chunk intact.

use crate::error::RiffError;

/// The FourCC identifier for RIFF.
pub const RIFF_ID: [u8; 4] = *b"RIFF";

/// The FourCC identifier for the WAVE format.
pub const WAVE_FORMAT_ID: [u8; 4] = *b"WAVE";

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// A single chunk: FourCC plus payload, without framing or pad byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffChunk {
    pub id: [u8; 4],
    pub data: Vec<u8>,
}

impl RiffChunk {
    pub fn new(id: [u8; 4], data: Vec<u8>) -> Self {
        Self { id, data }
    }
}

/// A parsed RIFF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffFile {
    pub form_type: [u8; 4],
    pub chunks: Vec<RiffChunk>,
}

impl RiffFile {
    pub fn new(chunks: Vec<RiffChunk>) -> Self {
        Self {
            form_type: WAVE_FORMAT_ID,
            chunks,
        }
    }

    /// Parse a RIFF/WAVE file and extract all chunks.
    ///
    /// Anything that cannot be framed is an error, since writing the
    /// container back would silently drop it: a chunk that claims more data
    /// than the file holds, or bytes left over past the size declared in the
    /// RIFF header. Only the pad byte of a final odd-sized chunk may sit
    /// outside the declared size.
    pub fn parse(data: &[u8]) -> Result<Self, RiffError> {
        if data.len() < HEADER_LEN {
            return Err(RiffError::TooSmall(data.len()));
        }
        if data[0..4] != RIFF_ID {
            return Err(RiffError::NotRiff);
        }
        if data[8..12] != WAVE_FORMAT_ID {
            return Err(RiffError::NotWave);
        }

        let riff_size = read_u32_le(&data[4..8]) as usize;
        let end = riff_size.saturating_add(CHUNK_HEADER_LEN).min(data.len());

        let mut chunks = Vec::new();
        let mut offset = HEADER_LEN;

        while offset < end {
            if offset + CHUNK_HEADER_LEN > end {
                return Err(RiffError::TruncatedChunk {
                    id: String::from_utf8_lossy(&data[offset..end]).into_owned(),
                    offset,
                });
            }

            let mut id = [0u8; 4];
            id.copy_from_slice(&data[offset..offset + 4]);
            let chunk_size = read_u32_le(&data[offset + 4..offset + 8]) as usize;

            let data_start = offset + CHUNK_HEADER_LEN;
            let data_end = match data_start.checked_add(chunk_size) {
                Some(data_end) if data_end <= end => data_end,
                _ => {
                    return Err(RiffError::TruncatedChunk {
                        id: String::from_utf8_lossy(&id).into_owned(),
                        offset,
                    })
                }
            };

            chunks.push(RiffChunk::new(id, data[data_start..data_end].to_vec()));

            // Chunks are word-aligned; a missing final pad byte is tolerated
            offset = data_end + (chunk_size % 2);
        }

        if offset.max(end) < data.len() {
            return Err(RiffError::SizeMismatch {
                declared: riff_size,
                actual: data.len() - CHUNK_HEADER_LEN,
            });
        }

        Ok(Self {
            form_type: WAVE_FORMAT_ID,
            chunks,
        })
    }

    /// All chunks with the given FourCC, in file order.
    pub fn chunks_with_id<'a>(&'a self, id: &'a [u8; 4]) -> impl Iterator<Item = &'a RiffChunk> {
        self.chunks.iter().filter(move |chunk| &chunk.id == id)
    }

    /// Serialize the container with a freshly computed RIFF size.
    ///
    /// Fails with [`RiffError::TooLarge`] when a chunk or the whole file
    /// does not fit the 32-bit size fields.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RiffError> {
        let body_len: usize = self
            .chunks
            .iter()
            .map(|chunk| CHUNK_HEADER_LEN + chunk.data.len() + chunk.data.len() % 2)
            .sum();

        let riff_size = size_field(body_len.saturating_add(4))?;

        let mut out = Vec::with_capacity(HEADER_LEN + body_len);
        out.extend_from_slice(&RIFF_ID);
        out.extend_from_slice(&riff_size.to_le_bytes());
        out.extend_from_slice(&self.form_type);

        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.id);
            out.extend_from_slice(&size_field(chunk.data.len())?.to_le_bytes());
            out.extend_from_slice(&chunk.data);
            if chunk.data.len() % 2 != 0 {
                out.push(0);
            }
        }

        Ok(out)
    }
}

fn size_field(len: usize) -> Result<u32, RiffError> {
    u32::try_from(len).map_err(|_| RiffError::TooLarge(len))
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> RiffFile {
        RiffFile::new(vec![
            RiffChunk::new(*b"fmt ", vec![1; 16]),
            RiffChunk::new(*b"data", vec![2, 3, 4]),
            RiffChunk::new(*b"LIST", vec![5; 6]),
        ])
    }

    #[test]
    fn test_to_bytes_layout() {
        let bytes = sample_file().to_bytes().unwrap();
        // header + fmt (8+16) + data (8+3+1 pad) + LIST (8+6)
        assert_eq!(bytes.len(), 12 + 24 + 12 + 14);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize,
            bytes.len() - 8
        );
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 3);
        assert_eq!(bytes[47], 0);
    }

    #[test]
    fn test_parse_round_trip() {
        let file = sample_file();
        let bytes = file.to_bytes().unwrap();
        let parsed = RiffFile::parse(&bytes).unwrap();
        assert_eq!(parsed, file);
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_chunks_with_id() {
        let mut file = sample_file();
        file.chunks.push(RiffChunk::new(*b"smpl", vec![1]));
        file.chunks.insert(0, RiffChunk::new(*b"smpl", vec![0]));
        let found: Vec<_> = file.chunks_with_id(b"smpl").collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].data, vec![0]);
        assert_eq!(found[1].data, vec![1]);
        assert_eq!(file.chunks_with_id(b"cue ").count(), 0);
    }

    #[test]
    fn test_missing_final_pad_is_tolerated() {
        let mut bytes = RiffFile::new(vec![RiffChunk::new(*b"data", vec![7; 3])])
            .to_bytes()
            .unwrap();
        bytes.pop();
        let size = (bytes.len() - 8) as u32;
        bytes[4..8].copy_from_slice(&size.to_le_bytes());
        let parsed = RiffFile::parse(&bytes).unwrap();
        assert_eq!(parsed.chunks[0].data, vec![7; 3]);
    }

    #[test]
    fn test_bytes_past_riff_size_are_rejected() {
        let mut bytes = sample_file().to_bytes().unwrap();
        bytes.extend_from_slice(b"junk");
        assert!(matches!(
            RiffFile::parse(&bytes),
            Err(RiffError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_undersized_riff_header_is_rejected() {
        let mut bytes = sample_file().to_bytes().unwrap();
        let actual = bytes.len() - 8;
        bytes[4..8].copy_from_slice(&4u32.to_le_bytes());
        match RiffFile::parse(&bytes) {
            Err(RiffError::SizeMismatch { declared, actual: found }) => {
                assert_eq!(declared, 4);
                assert_eq!(found, actual);
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_pad_byte_outside_declared_size_is_tolerated() {
        let mut bytes = RiffFile::new(vec![RiffChunk::new(*b"data", vec![7; 3])])
            .to_bytes()
            .unwrap();
        // Size field that leaves out the trailing pad byte
        let size = (bytes.len() - 9) as u32;
        bytes[4..8].copy_from_slice(&size.to_le_bytes());
        let parsed = RiffFile::parse(&bytes).unwrap();
        assert_eq!(parsed.chunks[0].data, vec![7; 3]);
    }

    #[test]
    fn test_size_field_overflow() {
        assert_eq!(size_field(36).unwrap(), 36);
        assert_eq!(size_field(u32::MAX as usize).unwrap(), u32::MAX);
        assert!(matches!(
            size_field(u32::MAX as usize + 1),
            Err(RiffError::TooLarge(_))
        ));
    }

    #[test]
    fn test_truncated_chunk() {
        let mut bytes = sample_file().to_bytes().unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            RiffFile::parse(&bytes),
            Err(RiffError::TruncatedChunk { .. })
        ));
    }

    #[test]
    fn test_invalid_riff() {
        assert!(matches!(RiffFile::parse(b"RIFF"), Err(RiffError::TooSmall(4))));
        assert!(matches!(
            RiffFile::parse(b"not a riff file"),
            Err(RiffError::NotRiff)
        ));
        assert!(matches!(
            RiffFile::parse(b"RIFF\x04\x00\x00\x00AVI "),
            Err(RiffError::NotWave)
        ));
    }
}
