//! Tests for control frames

use crate::{ControlMessage, ErrorFrame, ProtocolError};

#[test]
fn test_empty_text_clears() {
    assert_eq!(ControlMessage::from_text(""), ControlMessage::Clear);
    assert_eq!(ControlMessage::from_text("  \n"), ControlMessage::Clear);
}

#[test]
fn test_text_is_filter() {
    let msg = ControlMessage::from_text(r#" {"==":[1,1]} "#);
    assert_eq!(msg, ControlMessage::Filter(r#"{"==":[1,1]}"#));
}

#[test]
fn test_binary_frame_must_be_utf8() {
    assert_eq!(
        ControlMessage::from_bytes(b"").unwrap(),
        ControlMessage::Clear
    );
    assert!(matches!(
        ControlMessage::from_bytes(&[0xff, 0xfe]),
        Err(ProtocolError::InvalidUtf8)
    ));
}

#[test]
fn test_error_frame_encode() {
    let frame = ErrorFrame::new("unknown operator 'foo'");
    assert_eq!(frame.encode(), r#"{"error":"unknown operator 'foo'"}"#);
}
