//! Session identifier generation.
//!
//! Identifiers are 32 bytes from the operating system CSPRNG, hex-encoded.
//! Nothing about the manager or the clock goes into them.

use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per identifier (256 bits).
pub const SESSION_ID_BYTES: usize = 32;

/// Length of a generated identifier in characters.
pub const SESSION_ID_LEN: usize = SESSION_ID_BYTES * 2;

/// Generate a fresh, unguessable session identifier.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Cheap shape check for identifiers arriving from clients, so obviously
/// malformed values never reach the backend.
pub fn is_well_formed(id: &str) -> bool {
    id.len() == SESSION_ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}
