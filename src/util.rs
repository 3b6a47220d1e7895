use crc::{Crc, CRC_32_ISCSI};

pub(crate) const PADDING_MULTIPLE: usize = 4;

pub(crate) fn get_padding_size(len: usize) -> usize {
    (PADDING_MULTIPLE - (len % PADDING_MULTIPLE)) % PADDING_MULTIPLE
}

/// Rounds a chunk length up to the 4-byte boundary it occupies on the wire.
pub(crate) fn pad4(len: usize) -> usize {
    len + get_padding_size(len)
}

pub(crate) const ISCSI_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// CRC32-C of a serialized packet, with the checksum field treated as zero.
///
/// Works both on buffers whose checksum field is still cleared and on
/// finished packets being verified.
pub(crate) fn generate_packet_checksum(raw: &[u8]) -> u32 {
    let mut digest = ISCSI_CRC.digest();
    digest.update(&raw[0..8]);
    digest.update(&[0u8; 4]);
    digest.update(&raw[12..]);
    digest.finalize()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_padding_size() {
        let tests = vec![(0, 0), (1, 3), (2, 2), (3, 1), (4, 0), (5, 3), (6, 2), (7, 1), (8, 0)];
        for (len, expected) in tests {
            assert_eq!(
                get_padding_size(len),
                expected,
                "padding of len={len} should be {expected}"
            );
            assert_eq!(pad4(len) % PADDING_MULTIPLE, 0, "pad4({len}) should be 4-aligned");
        }
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut raw = vec![
            0x13, 0x88, 0x13, 0x88, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00,
            0x00, 0x04,
        ];
        let cleared = generate_packet_checksum(&raw);
        raw[8..12].copy_from_slice(&cleared.to_le_bytes());
        let filled = generate_packet_checksum(&raw);
        assert_eq!(cleared, filled, "checksum field must not affect the digest");
    }
}
