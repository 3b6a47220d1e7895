use bytes::Bytes;

use super::chunk_auth::ChunkAuth;
use super::chunk_cookie_echo::ChunkCookieEcho;
use super::chunk_heartbeat::ChunkHeartbeat;
use super::chunk_payload_data::ChunkPayloadData;
use super::chunk_selective_ack::{ChunkSelectiveAck, GapAckBlock};
use super::chunk_type::*;
use super::*;
use crate::auth::HmacAlgorithm;
use crate::error::Result;

#[test]
fn test_chunk_type_string() {
    let tests = vec![
        (CT_PAYLOAD_DATA, "DATA"),
        (CT_SACK, "SACK"),
        (CT_HEARTBEAT, "HEARTBEAT"),
        (CT_COOKIE_ECHO, "COOKIE-ECHO"),
        (CT_AUTH, "AUTH"),
        (CT_FORWARD_TSN, "FORWARD-TSN"),
        (ChunkType(255), "Unknown ChunkType: 255"),
    ];

    for (ct, expected) in tests {
        assert_eq!(
            ct.to_string(),
            expected,
            "failed to stringify chunkType {ct}, expected {expected}"
        );
    }
}

#[test]
fn test_data_chunk_marshal() -> Result<()> {
    let chunk = ChunkPayloadData {
        tsn: 0x01020304,
        stream_identifier: 0x0506,
        stream_sequence_number: 0x0708,
        payload_protocol_identifier: 0x090a0b0c,
        user_data: Bytes::from_static(&[0xde, 0xad, 0xbe]),
        ..Default::default()
    };

    let raw = chunk.marshal()?;
    assert_eq!(
        raw.as_ref(),
        &[
            0x00, 0x03, 0x00, 0x13, // type, B|E flags, length 19
            0x01, 0x02, 0x03, 0x04, // tsn
            0x05, 0x06, 0x07, 0x08, // stream id, ssn
            0x09, 0x0a, 0x0b, 0x0c, // ppi
            0xde, 0xad, 0xbe, // user data, no padding at this layer
        ],
        "marshaled DATA chunk mismatch"
    );
    assert_eq!(chunk.data_size(), 3);
    assert_eq!(chunk.serialized_len(), 19);

    Ok(())
}

#[test]
fn test_data_chunk_flags() {
    let chunk = ChunkPayloadData {
        unordered: true,
        beginning_fragment: false,
        ending_fragment: false,
        immediate_sack: true,
        ..Default::default()
    };
    let header = chunk.header();
    assert_eq!(header.flags, 0b1100, "U and I bits expected");

    let chunk = ChunkPayloadData::default();
    assert_eq!(chunk.header().flags, 0b0011, "B and E bits expected");
}

#[test]
fn test_sack_marshal() -> Result<()> {
    let sack = ChunkSelectiveAck {
        cumulative_tsn_ack: 0x00000064,
        advertised_receiver_window_credit: 0x00010000,
        gap_ack_blocks: vec![GapAckBlock { start: 2, end: 3 }],
        duplicate_tsn: vec![0x00000065],
    };

    let raw = sack.marshal()?;
    assert_eq!(
        raw.as_ref(),
        &[
            0x03, 0x00, 0x00, 0x18, // type, flags, length 24
            0x00, 0x00, 0x00, 0x64, // cumulative tsn ack
            0x00, 0x01, 0x00, 0x00, // a_rwnd
            0x00, 0x01, 0x00, 0x01, // 1 gap block, 1 duplicate
            0x00, 0x02, 0x00, 0x03, // gap 2-3
            0x00, 0x00, 0x00, 0x65, // duplicate tsn
        ],
        "marshaled SACK mismatch"
    );

    Ok(())
}

#[test]
fn test_auth_chunk_marshal() -> Result<()> {
    let auth = ChunkAuth::new(0x0102, HmacAlgorithm::Sha256);
    assert_eq!(auth.value_length(), 4 + 32);

    let raw = auth.marshal()?;
    assert_eq!(raw[0], 0x0f, "AUTH chunk type");
    assert_eq!(raw[1], 0, "AUTH flags must be zero");
    assert_eq!(
        u16::from_be_bytes([raw[2], raw[3]]),
        40,
        "AUTH length counts header, ids and MAC"
    );
    assert_eq!(&raw[4..6], &[0x01, 0x02], "shared key identifier");
    assert_eq!(&raw[6..8], &[0x00, 0x03], "HMAC identifier for SHA-256");
    assert!(raw[8..].iter().all(|b| *b == 0), "MAC must start zeroed");

    Ok(())
}

#[test]
fn test_cookie_echo_marshal() -> Result<()> {
    let cookie = ChunkCookieEcho {
        cookie: Bytes::from_static(&[0xaa, 0xbb]),
    };
    let raw = cookie.marshal()?;
    assert_eq!(raw.as_ref(), &[0x0a, 0x00, 0x00, 0x06, 0xaa, 0xbb]);
    Ok(())
}

#[test]
fn test_heartbeat_marshal() -> Result<()> {
    let hb = ChunkHeartbeat {
        info: Bytes::from_static(&[1, 2, 3, 4, 5]),
    };
    let raw = hb.marshal()?;
    assert_eq!(raw.as_ref(), &[0x04, 0x00, 0x00, 0x09, 1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn test_outbound_chunk_lengths() {
    let chunk = OutboundChunk::Control(Box::new(ChunkHeartbeat {
        info: Bytes::from_static(&[0; 5]),
    }));
    assert_eq!(chunk.chunk_type(), CT_HEARTBEAT);
    assert_eq!(chunk.serialized_len(), 9);
    assert_eq!(chunk.padded_len(), 12, "padded to the 4-byte boundary");

    let chunk = OutboundChunk::Data(ChunkPayloadData {
        user_data: Bytes::from_static(&[0; 8]),
        ..Default::default()
    });
    assert_eq!(chunk.serialized_len(), 24);
    assert_eq!(chunk.padded_len(), 24, "aligned lengths gain no padding");
    assert!(chunk.is_data());
}

#[test]
fn test_oversized_chunk_refused() {
    let chunk = OutboundChunk::Control(Box::new(ChunkHeartbeat {
        info: Bytes::from(vec![0u8; 70_000]),
    }));
    let mut buf = bytes::BytesMut::new();
    assert_eq!(
        chunk.marshal_to(&mut buf),
        Err(crate::error::Error::ErrChunkValueTooLong),
        "a chunk that overflows the length field must be refused"
    );
}
