//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use bytes::Bytes;
use emberkv::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, Response, Status, MAX_PAYLOAD_SIZE,
};
use emberkv::EmberError;

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_get() {
    let cmd = Command::Get {
        key: "hello".to_string(),
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();
    assert_eq!(decoded, cmd);
}

#[test]
fn test_encode_decode_set() {
    let cmd = Command::Set {
        key: "mykey".to_string(),
        value: Bytes::from_static(b"myvalue"),
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();

    match decoded {
        Command::Set { key, value } => {
            assert_eq!(key, "mykey");
            assert_eq!(&value[..], b"myvalue");
        }
        _ => panic!("Expected SET command"),
    }
}

#[test]
fn test_encode_decode_delete_and_ping() {
    let delete = Command::Delete {
        key: "todelete".to_string(),
    };
    assert_eq!(decode_command(&encode_command(&delete)).unwrap(), delete);
    assert_eq!(
        decode_command(&encode_command(&Command::Ping)).unwrap(),
        Command::Ping
    );
}

#[test]
fn test_encode_decode_empty_key_and_value() {
    let cmd = Command::Set {
        key: String::new(),
        value: Bytes::new(),
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();
    assert_eq!(decoded, cmd);
}

#[test]
fn test_encode_decode_binary_value() {
    let cmd = Command::Set {
        key: "bin".to_string(),
        value: Bytes::from_static(b"\x00\x01\xFF\xFE\x00"),
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();
    assert_eq!(decoded, cmd);
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_response_ok() {
    let response = Response::ok(Some(Bytes::from_static(b"value")));
    let decoded = decode_response(&encode_response(&response)).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert_eq!(&decoded.payload[..], b"value");
}

#[test]
fn test_encode_decode_response_ok_no_payload() {
    let decoded = decode_response(&encode_response(&Response::ok(None))).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert!(decoded.payload.is_empty());
}

#[test]
fn test_encode_decode_response_not_found() {
    let decoded = decode_response(&encode_response(&Response::not_found())).unwrap();
    assert_eq!(decoded.status, Status::NotFound);
}

#[test]
fn test_encode_decode_response_error() {
    let decoded = decode_response(&encode_response(&Response::error("boom"))).unwrap();

    assert_eq!(decoded.status, Status::Error);
    assert_eq!(decoded.error_message().as_deref(), Some("boom"));
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let result = decode_command(&[0x01, 0x00]);
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

#[test]
fn test_incomplete_payload() {
    // Claims 10 bytes of payload, carries 2
    let result = decode_command(&[0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00]);
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

#[test]
fn test_unknown_command_type() {
    let result = decode_command(&[0x7F, 0x00, 0x00, 0x00, 0x00]);
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

#[test]
fn test_unknown_response_status() {
    let result = decode_response(&[0x09, 0x00, 0x00, 0x00, 0x00]);
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

#[test]
fn test_get_missing_key_length() {
    let result = decode_command(&[0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00]);
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

#[test]
fn test_non_utf8_key_rejected() {
    let frame = [0x01, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x02, 0xFF, 0xFE];
    let result = decode_command(&frame);
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

#[test]
fn test_get_and_delete_reject_trailing_bytes() {
    // type | len=7 | key_len=2 | "ab" | 0xFF
    for type_byte in [0x01, 0x03] {
        let frame = [
            type_byte, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x02, b'a', b'b', 0xFF,
        ];
        let result = decode_command(&frame);
        assert!(matches!(result, Err(EmberError::Protocol(_))));
    }
}

#[test]
fn test_ping_with_unexpected_payload() {
    let result = decode_command(&[0x04, 0x00, 0x00, 0x00, 0x01, 0xAA]);
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

#[test]
fn test_oversized_payload_rejected() {
    let mut frame = vec![0x02];
    frame.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    let result = read_command(&mut Cursor::new(frame));
    assert!(matches!(result, Err(EmberError::Protocol(_))));
}

// =============================================================================
// Stream Tests
// =============================================================================

#[test]
fn test_stream_multiple_commands() {
    let commands = vec![
        Command::Set {
            key: "a".to_string(),
            value: Bytes::from_static(b"1"),
        },
        Command::Get {
            key: "a".to_string(),
        },
        Command::Delete {
            key: "a".to_string(),
        },
        Command::Ping,
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), expected);
    }
    assert!(matches!(read_command(&mut cursor), Err(EmberError::Io(_))));
}

#[test]
fn test_stream_write_read_response() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::ok(Some(Bytes::from_static(b"v")))).unwrap();
    write_response(&mut buffer, &Response::not_found()).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(&read_response(&mut cursor).unwrap().payload[..], b"v");
    assert_eq!(read_response(&mut cursor).unwrap().status, Status::NotFound);
}

// =============================================================================
// Wire Format Tests
// =============================================================================

#[test]
fn test_wire_format_get() {
    let encoded = encode_command(&Command::Get {
        key: "ab".to_string(),
    });

    // type | len=6 | key_len=2 | "ab"
    assert_eq!(
        &encoded[..],
        &[0x01, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x02, b'a', b'b']
    );
}

#[test]
fn test_wire_format_response_ok() {
    let encoded = encode_response(&Response::ok(Some(Bytes::from_static(b"xy"))));
    assert_eq!(&encoded[..], &[0x00, 0x00, 0x00, 0x00, 0x02, b'x', b'y']);
}
