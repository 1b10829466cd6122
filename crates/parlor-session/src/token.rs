//! Reconnection tokens.

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Issued once per room membership and required to reclaim the member
/// slot after a dropped connection. 128 bits keeps guessing a live
/// token computationally infeasible.
pub fn reconnect_token() -> String {
    use rand::Rng;
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
