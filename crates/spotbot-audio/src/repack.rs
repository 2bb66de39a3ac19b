//! Byte-to-sample repacking.
//!
//! The service decoder hands over interleaved 16-bit little-endian PCM as raw bytes.
//! [`Repacker`] walks one chunk of those bytes and fills a caller-owned `i16` buffer
//! as many times as needed, so the device always receives at most `buffer.len()`
//! samples per write. Channels are left interleaved.

/// Cursor over the bytes of a single chunk.
///
/// Finite and not restartable: once every complete byte pair has been consumed,
/// [`Repacker::fill`] keeps returning `None`.
pub struct Repacker<'a> {
    pairs: std::slice::ChunksExact<'a, u8>,
}

impl<'a> Repacker<'a> {
    /// A trailing odd byte is never part of a pair and is ignored.
    pub fn new(frames: &'a [u8]) -> Self {
        Self {
            pairs: frames.chunks_exact(2),
        }
    }

    /// Samples left to produce.
    pub fn remaining(&self) -> usize {
        self.pairs.len()
    }

    /// Fill `buffer` from the front and return the filled prefix.
    ///
    /// The prefix is shorter than `buffer` only on the final fill. Returns `None`
    /// when the input is exhausted or `buffer` is empty.
    pub fn fill<'b>(&mut self, buffer: &'b mut [i16]) -> Option<&'b [i16]> {
        if buffer.is_empty() {
            return None;
        }
        let mut written = 0;
        for (slot, pair) in buffer.iter_mut().zip(self.pairs.by_ref()) {
            *slot = i16::from_le_bytes([pair[0], pair[1]]);
            written += 1;
        }
        if written == 0 {
            None
        } else {
            Some(&buffer[..written])
        }
    }
}

/// Encode interleaved samples the way the decoder delivers them.
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(bytes: &[u8], capacity: usize) -> Vec<Vec<i16>> {
        let mut buffer = vec![0i16; capacity];
        let mut repacker = Repacker::new(bytes);
        let mut out = Vec::new();
        while let Some(filled) = repacker.fill(&mut buffer) {
            out.push(filled.to_vec());
        }
        out
    }

    #[test]
    fn combines_little_endian_pairs() {
        let parts = drain(&[0x34, 0x12, 0xff, 0xff, 0x00, 0x80], 8);
        assert_eq!(parts, vec![vec![0x1234, -1, i16::MIN]]);
    }

    #[test]
    fn splits_into_capacity_sized_fills_with_short_tail() {
        let samples: Vec<i16> = (0..10).map(|v| v * 100 - 300).collect();
        let parts = drain(&encode_samples(&samples), 4);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 2);
        assert_eq!(parts.concat(), samples);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let samples = [1i16, 2, 3, 4, 5, 6];
        let parts = drain(&encode_samples(&samples), 3);
        assert_eq!(parts, vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn odd_length_input_drops_trailing_byte() {
        let mut bytes = encode_samples(&[7, -7, 300]);
        bytes.push(0x55);
        let mut repacker = Repacker::new(&bytes);
        assert_eq!(repacker.remaining(), 3);

        let mut buffer = [0i16; 16];
        assert_eq!(repacker.fill(&mut buffer), Some(&[7i16, -7, 300][..]));
        assert_eq!(repacker.fill(&mut buffer), None);
    }

    #[test]
    fn single_dangling_byte_produces_nothing() {
        assert!(drain(&[0x01], 4).is_empty());
    }

    #[test]
    fn empty_input_or_buffer_yields_none() {
        assert!(drain(&[], 4).is_empty());
        let bytes = encode_samples(&[1, 2]);
        let mut repacker = Repacker::new(&bytes);
        assert_eq!(repacker.fill(&mut []), None);
        assert_eq!(repacker.remaining(), 2);
    }

    #[test]
    fn exhausted_repacker_stays_exhausted() {
        let bytes = encode_samples(&[9]);
        let mut repacker = Repacker::new(&bytes);
        let mut buffer = [0i16; 2];
        assert!(repacker.fill(&mut buffer).is_some());
        assert!(repacker.fill(&mut buffer).is_none());
        assert!(repacker.fill(&mut buffer).is_none());
    }
}
