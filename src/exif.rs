//! EXIF orientation parsing straight from JPEG bytes
//!
//! Only the orientation tag in IFD0 is of interest, so instead of a full EXIF
//! reader this walks the JPEG marker segments until the first APP1 block and
//! scans its first image file directory. Any malformed or truncated input
//! degrades to [`Orientation::Normal`].

use crate::domain::Orientation;

/// Bytes inspected from the start of the file; EXIF lives in the leading segments
pub const SCAN_LIMIT: usize = 64 * 1024;

const SOI: u16 = 0xFFD8;
const APP1: u16 = 0xFFE1;
const SOS: u16 = 0xFFDA;
const EXIF_SIGNATURE: &[u8; 4] = b"Exif";
const ORIENTATION_TAG: u16 = 0x0112;
const IFD_ENTRY_SIZE: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

fn read_u16(bytes: &[u8], offset: usize, order: ByteOrder) -> Option<u16> {
    let raw: [u8; 2] = bytes.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
    Some(match order {
        ByteOrder::Little => u16::from_le_bytes(raw),
        ByteOrder::Big => u16::from_be_bytes(raw),
    })
}

fn read_u32(bytes: &[u8], offset: usize, order: ByteOrder) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
    Some(match order {
        ByteOrder::Little => u32::from_le_bytes(raw),
        ByteOrder::Big => u32::from_be_bytes(raw),
    })
}

/// Read the EXIF orientation of a JPEG, returning `Normal` when there is none
///
/// Never fails: non-JPEG input, a missing or foreign APP1 block, truncated
/// directories and out-of-range values all mean "no correction".
pub fn parse_exif_orientation(bytes: &[u8]) -> Orientation {
    let bytes = &bytes[..bytes.len().min(SCAN_LIMIT)];
    match find_orientation_value(bytes) {
        Some(value) => match Orientation::from_exif(value) {
            Some(orientation) => {
                log::debug!("EXIF orientation: {} ({:?})", value, orientation);
                orientation
            }
            None => {
                log::debug!("Ignoring out-of-range EXIF orientation {}", value);
                Orientation::Normal
            }
        },
        None => Orientation::Normal,
    }
}

/// Walk marker segments after SOI and hand the first APP1 payload to the TIFF reader
fn find_orientation_value(bytes: &[u8]) -> Option<u16> {
    if read_u16(bytes, 0, ByteOrder::Big)? != SOI {
        log::debug!("Not a JPEG, skipping EXIF orientation");
        return None;
    }

    let mut offset = 2;
    while offset < bytes.len() {
        let marker = read_u16(bytes, offset, ByteOrder::Big)?;
        offset += 2;

        if marker == APP1 {
            return read_app1(bytes, offset);
        }
        if marker & 0xFF00 != 0xFF00 || marker == SOS {
            // Lost sync or reached entropy-coded data
            return None;
        }

        let length = read_u16(bytes, offset, ByteOrder::Big)? as usize;
        if length < 2 {
            return None;
        }
        offset += length;
    }
    None
}

/// Parse an APP1 segment whose length field starts at `offset`
fn read_app1(bytes: &[u8], offset: usize) -> Option<u16> {
    if bytes.get(offset + 2..offset + 6)? != EXIF_SIGNATURE {
        log::debug!("APP1 segment is not EXIF");
        return None;
    }

    // "Exif\0\0" is followed by the TIFF header
    let tiff = offset + 8;
    let order = match bytes.get(tiff..tiff + 2)? {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return None,
    };

    let ifd = tiff.checked_add(read_u32(bytes, tiff + 4, order)? as usize)?;
    let entries = read_u16(bytes, ifd, order)? as usize;

    for i in 0..entries {
        let entry = ifd + 2 + i * IFD_ENTRY_SIZE;
        if read_u16(bytes, entry, order)? == ORIENTATION_TAG {
            // Type SHORT, count 1: the value sits inline at the start of the value field
            return read_u16(bytes, entry + 8, order);
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build an APP1/EXIF segment (marker included) with IFD0 holding `tags`
    fn exif_segment(tags: &[(u16, u16)], little_endian: bool) -> Vec<u8> {
        let u16b = |v: u16| {
            if little_endian {
                v.to_le_bytes()
            } else {
                v.to_be_bytes()
            }
        };
        let u32b = |v: u32| {
            if little_endian {
                v.to_le_bytes()
            } else {
                v.to_be_bytes()
            }
        };

        let mut tiff = Vec::new();
        tiff.extend_from_slice(if little_endian { b"II" } else { b"MM" });
        tiff.extend_from_slice(&u16b(42));
        tiff.extend_from_slice(&u32b(8));
        tiff.extend_from_slice(&u16b(tags.len() as u16));
        for &(tag, value) in tags {
            tiff.extend_from_slice(&u16b(tag));
            tiff.extend_from_slice(&u16b(3)); // SHORT
            tiff.extend_from_slice(&u32b(1));
            tiff.extend_from_slice(&u16b(value));
            tiff.extend_from_slice(&[0, 0]);
        }
        tiff.extend_from_slice(&u32b(0)); // no next IFD

        let mut segment = vec![0xFF, 0xE1];
        let length = (2 + 6 + tiff.len()) as u16;
        segment.extend_from_slice(&length.to_be_bytes());
        segment.extend_from_slice(b"Exif\0\0");
        segment.extend_from_slice(&tiff);
        segment
    }

    /// JFIF APP0 segment, placed before APP1 to exercise the marker walk
    fn app0_segment() -> Vec<u8> {
        let mut segment = vec![0xFF, 0xE0, 0x00, 0x10];
        segment.extend_from_slice(b"JFIF\0");
        segment.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
        segment
    }

    /// Minimal JPEG header stream carrying the given orientation
    pub(crate) fn jpeg_with_orientation(value: u16, little_endian: bool) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend(app0_segment());
        bytes.extend(exif_segment(
            &[(0x010F, 0x4142), (ORIENTATION_TAG, value)],
            little_endian,
        ));
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        bytes
    }

    /// Splice an EXIF orientation segment right after the SOI of an encoded JPEG
    pub(crate) fn insert_orientation(jpeg: &[u8], value: u16) -> Vec<u8> {
        let mut bytes = jpeg[..2].to_vec();
        bytes.extend(exif_segment(&[(ORIENTATION_TAG, value)], false));
        bytes.extend_from_slice(&jpeg[2..]);
        bytes
    }

    #[test]
    fn test_reads_every_orientation_in_both_byte_orders() {
        for value in 1..=8u16 {
            for little_endian in [true, false] {
                let bytes = jpeg_with_orientation(value, little_endian);
                assert_eq!(
                    parse_exif_orientation(&bytes).code(),
                    value,
                    "value {value}, little endian {little_endian}"
                );
            }
        }
    }

    #[test]
    fn test_non_jpeg_is_identity() {
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(parse_exif_orientation(&png_header), Orientation::Normal);
        assert_eq!(parse_exif_orientation(&[]), Orientation::Normal);
        assert_eq!(parse_exif_orientation(&[0xFF]), Orientation::Normal);
        assert_eq!(parse_exif_orientation(b"plain text"), Orientation::Normal);
    }

    #[test]
    fn test_jpeg_without_exif_is_identity() {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend(app0_segment());
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34]);
        assert_eq!(parse_exif_orientation(&bytes), Orientation::Normal);
    }

    #[test]
    fn test_foreign_app1_is_identity() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x0C];
        bytes.extend_from_slice(b"http://ns");
        bytes.push(0);
        assert_eq!(parse_exif_orientation(&bytes), Orientation::Normal);
    }

    #[test]
    fn test_missing_tag_is_identity() {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend(exif_segment(&[(0x010F, 1), (0x0110, 2)], true));
        assert_eq!(parse_exif_orientation(&bytes), Orientation::Normal);
    }

    #[test]
    fn test_out_of_range_value_is_identity() {
        let bytes = jpeg_with_orientation(9, true);
        assert_eq!(parse_exif_orientation(&bytes), Orientation::Normal);
        let bytes = jpeg_with_orientation(0, false);
        assert_eq!(parse_exif_orientation(&bytes), Orientation::Normal);
    }

    #[test]
    fn test_truncated_input_never_panics() {
        let bytes = jpeg_with_orientation(6, true);
        for len in 0..bytes.len() {
            let _ = parse_exif_orientation(&bytes[..len]);
        }
    }

    #[test]
    fn test_bad_byte_order_is_identity() {
        let mut bytes = jpeg_with_orientation(6, true);
        // SOI (2) + APP0 (18) + APP1 marker/length (4) + "Exif\0\0" (6)
        let tiff = 2 + 18 + 4 + 6;
        bytes[tiff] = b'X';
        bytes[tiff + 1] = b'X';
        assert_eq!(parse_exif_orientation(&bytes), Orientation::Normal);
    }

    #[test]
    fn test_huge_ifd_offset_is_identity() {
        let mut bytes = jpeg_with_orientation(6, false);
        let tiff = 2 + 18 + 4 + 6;
        bytes[tiff + 4..tiff + 8].copy_from_slice(&u32::MAX.to_be_bytes());
        assert_eq!(parse_exif_orientation(&bytes), Orientation::Normal);
    }
}
