//! Binary wire format of a frame.
//!
//! Little-endian, packed, no padding:
//!
//! | offset | field | type |
//! |---|---|---|
//! | 0 | magic | u32 |
//! | 4 | sample_count | u32 |
//! | 8 | rms | f32 |
//! | 12 | centroid | f32 |
//! | 16 | gain | f32 |
//! | 20 | scene | u8 |
//! | 21 | samples_in | i16 × sample_count |
//! | 21 + 2n | samples_out | i16 × sample_count |

use byteorder::{ByteOrder, LittleEndian};
use ds_core::frame::{
    Classification, FRAME_MAGIC, Features, Frame, Scene, WIRE_HEADER_LEN, wire_len,
};
use thiserror::Error;

const OFF_MAGIC: usize = 0;
const OFF_COUNT: usize = 4;
const OFF_RMS: usize = 8;
const OFF_CENTROID: usize = 12;
const OFF_GAIN: usize = 16;
const OFF_SCENE: usize = 20;

/// Errors raised while encoding or decoding a frame.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WireError {
    /// Sentinel mismatch: corrupted or improperly built frame.
    #[error("magic invalide : {0:#010x}")]
    BadMagic(u32),

    /// Destination too small; nothing was written.
    #[error("buffer trop petit : {needed} octets requis, {available} disponibles")]
    BufferTooSmall {
        /// Bytes the frame needs.
        needed: usize,
        /// Bytes the destination offers.
        available: usize,
    },

    /// Packet shorter than its header or announced payload.
    #[error("paquet tronqué : {expected} octets attendus, {actual} reçus")]
    Truncated {
        /// Bytes the header announces.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Packet longer than its announced payload.
    #[error("octets en trop : {expected} attendus, {actual} reçus")]
    TrailingBytes {
        /// Bytes the header announces.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },

    /// Scene byte outside the known labels.
    #[error("scène inconnue : {0}")]
    UnknownScene(u8),
}

/// Bytes needed to encode a frame of `sample_count` samples: `21 + 4·n`.
///
/// # Example
/// ```
/// assert_eq!(ds_pipeline::wire::encoded_len(512), 2069);
/// ```
#[inline]
#[must_use]
pub fn encoded_len(sample_count: usize) -> usize {
    wire_len(sample_count)
}

/// Encode `frame` into `dst`.
///
/// The magic is checked first. The whole frame is written or nothing is:
/// a too-small destination leaves `dst` untouched.
///
/// Returns the number of bytes written.
///
/// # Errors
/// [`WireError::BadMagic`] if the sentinel is wrong,
/// [`WireError::BufferTooSmall`] if `dst` cannot hold the frame.
///
/// # Example
/// ```
/// use ds_core::frame::{Classification, Features, Frame, Scene};
/// use ds_pipeline::wire::serialize;
///
/// let frame = Frame::new(
///     Features { rms: 0.5, centroid: 1000.0 },
///     Classification { scene: Scene::Speech, gain: 1.0 },
///     vec![1i16, 2].into_boxed_slice(),
///     vec![3i16, 4].into_boxed_slice(),
/// ).unwrap();
///
/// let mut buf = [0u8; 64];
/// let n = serialize(&frame, &mut buf).unwrap();
/// assert_eq!(n, 29);
/// assert_eq!(buf[20], 1); // scene byte
/// ```
pub fn serialize(frame: &Frame, dst: &mut [u8]) -> Result<usize, WireError> {
    if !frame.has_valid_magic() {
        return Err(WireError::BadMagic(frame.magic));
    }

    let count = frame.samples_in().len();
    let total = encoded_len(count);
    if dst.len() < total {
        return Err(WireError::BufferTooSmall {
            needed: total,
            available: dst.len(),
        });
    }

    let out = &mut dst[..total];
    LittleEndian::write_u32(&mut out[OFF_MAGIC..], frame.magic);
    LittleEndian::write_u32(&mut out[OFF_COUNT..], frame.sample_count());
    LittleEndian::write_f32(&mut out[OFF_RMS..], frame.rms);
    LittleEndian::write_f32(&mut out[OFF_CENTROID..], frame.centroid);
    LittleEndian::write_f32(&mut out[OFF_GAIN..], frame.gain);
    out[OFF_SCENE] = frame.scene.as_u8();

    let (samples_in, samples_out) = out[WIRE_HEADER_LEN..].split_at_mut(2 * count);
    LittleEndian::write_i16_into(frame.samples_in(), samples_in);
    LittleEndian::write_i16_into(frame.samples_out(), samples_out);

    Ok(total)
}

/// Decode one packet produced by [`serialize`].
///
/// The packet must be exactly one frame long.
///
/// # Errors
/// Returns a [`WireError`] describing the first inconsistency found.
///
/// # Example
/// ```
/// use ds_core::frame::{Classification, Features, Frame, Scene};
/// use ds_pipeline::wire::{parse_frame, serialize};
///
/// let frame = Frame::new(
///     Features { rms: 0.1, centroid: 2000.0 },
///     Classification { scene: Scene::Noise, gain: 0.5 },
///     vec![-7i16].into_boxed_slice(),
///     vec![-3i16].into_boxed_slice(),
/// ).unwrap();
/// let mut buf = vec![0u8; 25];
/// serialize(&frame, &mut buf).unwrap();
///
/// let parsed = parse_frame(&buf).unwrap();
/// assert_eq!(parsed.samples_in(), &[-7]);
/// assert_eq!(parsed.scene, Scene::Noise);
/// ```
pub fn parse_frame(bytes: &[u8]) -> Result<Frame, WireError> {
    if bytes.len() < WIRE_HEADER_LEN {
        return Err(WireError::Truncated {
            expected: WIRE_HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let magic = LittleEndian::read_u32(&bytes[OFF_MAGIC..]);
    if magic != FRAME_MAGIC {
        return Err(WireError::BadMagic(magic));
    }

    let count = LittleEndian::read_u32(&bytes[OFF_COUNT..]) as usize;
    let expected = count
        .checked_mul(4)
        .and_then(|payload| payload.checked_add(WIRE_HEADER_LEN))
        .unwrap_or(usize::MAX);
    if bytes.len() < expected {
        return Err(WireError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        return Err(WireError::TrailingBytes {
            expected,
            actual: bytes.len(),
        });
    }

    let scene_byte = bytes[OFF_SCENE];
    let scene = Scene::from_u8(scene_byte).ok_or(WireError::UnknownScene(scene_byte))?;

    let features = Features {
        rms: LittleEndian::read_f32(&bytes[OFF_RMS..]),
        centroid: LittleEndian::read_f32(&bytes[OFF_CENTROID..]),
    };
    let classification = Classification {
        scene,
        gain: LittleEndian::read_f32(&bytes[OFF_GAIN..]),
    };

    let (raw_in, raw_out) = bytes[WIRE_HEADER_LEN..].split_at(2 * count);
    let mut samples_in = vec![0i16; count];
    let mut samples_out = vec![0i16; count];
    LittleEndian::read_i16_into(raw_in, &mut samples_in);
    LittleEndian::read_i16_into(raw_out, &mut samples_out);

    // Lengths are equal and bounded by the packet size checked above.
    Frame::new(
        features,
        classification,
        samples_in.into_boxed_slice(),
        samples_out.into_boxed_slice(),
    )
    .map_err(|_| WireError::Truncated {
        expected,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(count: usize, scene: Scene) -> Frame {
        let samples_in: Vec<i16> = (0..count).map(|i| (i as i16).wrapping_mul(97)).collect();
        let samples_out: Vec<i16> = samples_in.iter().map(|s| s.saturating_mul(-3)).collect();
        Frame::new(
            Features {
                rms: 0.073_215_6,
                centroid: 1234.567,
            },
            Classification { scene, gain: 0.5 },
            samples_in.into_boxed_slice(),
            samples_out.into_boxed_slice(),
        )
        .unwrap()
    }

    fn assert_same(a: &Frame, b: &Frame) {
        assert_eq!(a.magic, b.magic);
        assert_eq!(a.sample_count(), b.sample_count());
        assert_eq!(a.rms.to_bits(), b.rms.to_bits());
        assert_eq!(a.centroid.to_bits(), b.centroid.to_bits());
        assert_eq!(a.gain.to_bits(), b.gain.to_bits());
        assert_eq!(a.scene, b.scene);
        assert_eq!(a.samples_in(), b.samples_in());
        assert_eq!(a.samples_out(), b.samples_out());
    }

    #[test]
    fn round_trip_is_bit_exact() {
        for (count, scene) in [(0, Scene::Quiet), (512, Scene::Speech), (64, Scene::Noise)] {
            let frame = frame_with(count, scene);
            let mut buf = vec![0u8; encoded_len(count)];
            let written = serialize(&frame, &mut buf).unwrap();
            assert_eq!(written, 21 + 4 * count);

            let parsed = parse_frame(&buf[..written]).unwrap();
            assert_same(&frame, &parsed);
        }
    }

    #[test]
    fn header_layout_is_little_endian_and_packed() {
        let frame = frame_with(2, Scene::Noise);
        let mut buf = [0u8; 29];
        serialize(&frame, &mut buf).unwrap();

        assert_eq!(&buf[0..4], &FRAME_MAGIC.to_le_bytes());
        assert_eq!(&buf[4..8], &2u32.to_le_bytes());
        assert_eq!(&buf[8..12], &frame.rms.to_le_bytes());
        assert_eq!(&buf[12..16], &frame.centroid.to_le_bytes());
        assert_eq!(&buf[16..20], &0.5f32.to_le_bytes());
        assert_eq!(buf[20], 2);
        assert_eq!(&buf[21..23], &frame.samples_in()[0].to_le_bytes());
        assert_eq!(&buf[23..25], &frame.samples_in()[1].to_le_bytes());
        assert_eq!(&buf[25..27], &frame.samples_out()[0].to_le_bytes());
        assert_eq!(&buf[27..29], &frame.samples_out()[1].to_le_bytes());
    }

    #[test]
    fn small_destination_writes_nothing() {
        let frame = frame_with(512, Scene::Speech);
        let mut buf = vec![0xAAu8; encoded_len(512) - 1];
        let err = serialize(&frame, &mut buf).unwrap_err();
        assert_eq!(
            err,
            WireError::BufferTooSmall {
                needed: 2069,
                available: 2068
            }
        );
        assert!(buf.iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn bad_magic_is_refused_before_writing() {
        let mut frame = frame_with(4, Scene::Quiet);
        frame.magic = 0x1234_5678;
        let mut buf = [0u8; 64];
        assert_eq!(
            serialize(&frame, &mut buf),
            Err(WireError::BadMagic(0x1234_5678))
        );
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn parser_rejects_malformed_packets() {
        let frame = frame_with(4, Scene::Speech);
        let mut buf = vec![0u8; encoded_len(4)];
        serialize(&frame, &mut buf).unwrap();

        assert!(matches!(
            parse_frame(&buf[..10]),
            Err(WireError::Truncated { .. })
        ));
        assert!(matches!(
            parse_frame(&buf[..buf.len() - 1]),
            Err(WireError::Truncated { .. })
        ));

        let mut longer = buf.clone();
        longer.push(0);
        assert!(matches!(
            parse_frame(&longer),
            Err(WireError::TrailingBytes { .. })
        ));

        let mut bad_scene = buf.clone();
        bad_scene[20] = 9;
        assert_eq!(parse_frame(&bad_scene).unwrap_err(), WireError::UnknownScene(9));

        let mut bad_magic = buf;
        bad_magic[0] ^= 0xFF;
        assert!(matches!(parse_frame(&bad_magic), Err(WireError::BadMagic(_))));
    }

    #[test]
    fn huge_announced_count_is_truncation_not_allocation() {
        let mut buf = [0u8; 21];
        LittleEndian::write_u32(&mut buf[0..], FRAME_MAGIC);
        LittleEndian::write_u32(&mut buf[4..], u32::MAX);
        assert!(matches!(parse_frame(&buf), Err(WireError::Truncated { .. })));
    }
}
