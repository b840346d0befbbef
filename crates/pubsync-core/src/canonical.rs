//! Canonical CBOR encoding for document signatures.
//!
//! This module implements RFC 8949 Core Deterministic Encoding for the
//! subset of values a document header needs:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 microseconds)
//!
//! Every field except the signature goes into the signed bytes, so two
//! peers agree on the message regardless of how they serialized the
//! document on the wire.

use ciborium::value::Value;

use crate::document::Document;
use crate::error::CoreError;

/// Document field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const FORMAT: u64 = 0;
    pub const WORKSPACE: u64 = 1;
    pub const PATH: u64 = 2;
    pub const AUTHOR: u64 = 3;
    pub const CONTENT_HASH: u64 = 4;
    pub const TIMESTAMP: u64 = 5;
    pub const DELETE_AFTER: u64 = 6;
}

/// The bytes an author signs for this document.
pub fn signing_bytes(doc: &Document) -> Result<Vec<u8>, CoreError> {
    let value = document_to_cbor_value(doc);
    encode_cbor_value_canonical(&value)
}

fn document_to_cbor_value(doc: &Document) -> Value {
    let text = |key: u64, s: &str| (Value::Integer(key.into()), Value::Text(s.to_string()));

    let delete_after = match doc.delete_after {
        Some(t) => Value::Integer(t.into()),
        None => Value::Null,
    };

    Value::Map(vec![
        text(keys::FORMAT, &doc.format),
        text(keys::WORKSPACE, &doc.workspace),
        text(keys::PATH, &doc.path),
        text(keys::AUTHOR, &doc.author),
        text(keys::CONTENT_HASH, &doc.content_hash),
        (
            Value::Integer(keys::TIMESTAMP.into()),
            Value::Integer(doc.timestamp.into()),
        ),
        (Value::Integer(keys::DELETE_AFTER.into()), delete_after),
    ])
}

fn encode_cbor_value_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document {
            format: "es.4".into(),
            workspace: "+test.abc".into(),
            path: "/hello".into(),
            author: format!("@suzy.{}", "ab".repeat(32)),
            content: "hi".into(),
            content_hash: crate::crypto::content_hash("hi"),
            timestamp: 1_736_870_400_000_000,
            delete_after: None,
            signature: String::new(),
        }
    }

    #[test]
    fn test_signing_bytes_deterministic() {
        let doc = sample();
        assert_eq!(signing_bytes(&doc).unwrap(), signing_bytes(&doc).unwrap());
    }

    #[test]
    fn test_signing_bytes_ignore_signature_and_content() {
        let mut a = sample();
        let b = sample();
        a.signature = "deadbeef".into();
        assert_eq!(signing_bytes(&a).unwrap(), signing_bytes(&b).unwrap());

        // Content is covered through its hash
        a.content_hash = crate::crypto::content_hash("other");
        assert_ne!(signing_bytes(&a).unwrap(), signing_bytes(&b).unwrap());
    }

    #[test]
    fn test_signing_bytes_decode_as_cbor_map() {
        let bytes = signing_bytes(&sample()).unwrap();
        let value: Value = ciborium::from_reader(bytes.as_slice()).unwrap();
        match value {
            Value::Map(entries) => {
                assert_eq!(entries.len(), 7);
                assert_eq!(entries[0].0, Value::Integer(0.into()));
                assert_eq!(entries[6].1, Value::Null);
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_integer(&mut buf, (-1i64).into());
        assert_eq!(buf, vec![0x20]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Integer(6.into()), Value::Null),
            (Value::Integer(0.into()), Value::Integer(0.into())),
            (Value::Integer(5.into()), Value::Integer(50.into())),
        ];
        encode_map_canonical(&mut buf, &entries).unwrap();

        assert_eq!(buf, vec![0xa3, 0x00, 0x00, 0x05, 0x18, 50, 0x06, 0xf6]);
    }
}
