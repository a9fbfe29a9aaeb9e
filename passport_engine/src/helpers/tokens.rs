use md5::{Digest, Md5};

/// A fresh, random access token: 16 random bytes, hex encoded.
pub fn generate_access_token() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// The stored form of an account password: the lowercase hex MD5 digest.
pub fn hash_password(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}
