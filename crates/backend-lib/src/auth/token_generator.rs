// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Signing secret generation
Produces random, URL-safe secrets suitable for `auth.token_secret`. */
use rand::RngCore;

/// Default secret size in bytes (48 bytes = 384 bits of entropy, 64 characters)
const DEFAULT_SECRET_BYTES: usize = 48;

/** Generate a random signing secret
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_signing_secret() -> String {
    generate_signing_secret_with_size(DEFAULT_SECRET_BYTES)
}

/** Generate a random signing secret with the given amount of entropy
# Arguments
* `bytes` - Number of random bytes before encoding */
pub fn generate_signing_secret_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
