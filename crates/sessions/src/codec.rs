//! Session record ⇄ bytes.
//!
//! Records are written as a versioned JSON envelope.  Encoding is total
//! over [`Value`] except for non-finite floats, which JSON cannot carry
//! without loss.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use gd_domain::error::{EncodeError, Error, Result};

use crate::session::{Session, Value};

/// Envelope format written by [`encode`].
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    session: &'a Session,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    session: Session,
}

/// Serialize a session record.
pub fn encode(session: &Session) -> Result<Vec<u8>> {
    for value in session.data().values() {
        check_encodable(value)?;
    }

    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        session,
    };
    serde_json::to_vec(&envelope)
        .map_err(|e| Error::Encode(EncodeError::Serialize(e)))
}

/// Deserialize a session record.  A corrupt or foreign payload is an
/// error, never an empty session.
pub fn decode(bytes: &[u8]) -> Result<Session> {
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(Error::Decode)?;
    if envelope.format_version != FORMAT_VERSION {
        return Err(Error::Decode(serde_json::Error::custom(format!(
            "unsupported session format version {}",
            envelope.format_version
        ))));
    }
    Ok(envelope.session)
}

fn check_encodable(value: &Value) -> Result<()> {
    match value {
        Value::Float(n) if !n.is_finite() => {
            Err(EncodeError::UnsupportedType("non-finite float").into())
        }
        Value::Map(map) => map.values().try_for_each(check_encodable),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::sample_session;
    use crate::session::SessionData;
    use chrono::Utc;

    #[test]
    fn round_trip_preserves_every_field() {
        let mut session = sample_session(Utc::now());
        let mut nested = SessionData::new();
        nested.insert("theme".into(), Value::from("dark"));
        nested.insert("scale".into(), Value::from(1.25));
        session.insert("user_id", 42);
        session.insert("name", "alice");
        session.insert("admin", false);
        session.insert("avatar", vec![0u8, 255, 7]);
        session.insert("prefs", nested);
        session.insert("ratio", 0.1);

        let bytes = encode(&session).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded, session);
        assert_eq!(decoded.get("user_id"), Some(&Value::Int(42)));
        assert_eq!(decoded.get("avatar"), Some(&Value::Bytes(vec![0, 255, 7])));
    }

    #[test]
    fn integer_and_float_stay_distinct() {
        let mut session = sample_session(Utc::now());
        session.insert("i", 1);
        session.insert("f", 1.0);
        let decoded = decode(&encode(&session).unwrap()).unwrap();
        assert!(matches!(decoded.get("i"), Some(Value::Int(1))));
        assert!(matches!(decoded.get("f"), Some(Value::Float(_))));
    }

    #[test]
    fn nan_is_unsupported() {
        let mut session = sample_session(Utc::now());
        let mut nested = SessionData::new();
        nested.insert("bad".into(), Value::Float(f64::NAN));
        session.insert("outer", nested);

        let err = encode(&session).unwrap_err();
        assert!(matches!(
            err,
            Error::Encode(EncodeError::UnsupportedType(_))
        ));
    }

    #[test]
    fn corrupt_payload_is_a_decode_error() {
        let err = decode(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let session = sample_session(Utc::now());
        let mut json: serde_json::Value =
            serde_json::from_slice(&encode(&session).unwrap()).unwrap();
        json["format_version"] = serde_json::json!(99);
        let err = decode(&serde_json::to_vec(&json).unwrap()).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }
}
