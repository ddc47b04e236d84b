//! XXTEA payload cipher
//!
//! The eTRV encrypts every multi-byte characteristic with XXTEA under the
//! 16-byte secret key, with the byte order of each 32-bit word reversed on
//! the wire. Reads reverse the words and then decrypt; writes encrypt and
//! then reverse.

use shared::ProtocolError;

/// The 16-byte secret key retrieved from the valve in pairing mode
pub type SecretKey = [u8; 16];

const DELTA: u32 = 0x9e37_79b9;

fn mx(sum: u32, y: u32, z: u32, p: usize, e: u32, key: &[u32; 4]) -> u32 {
    (((z >> 5) ^ (y << 2)).wrapping_add((y >> 3) ^ (z << 4)))
        ^ ((sum ^ y).wrapping_add(key[(p & 3) ^ e as usize] ^ z))
}

fn key_words(key: &SecretKey) -> [u32; 4] {
    let mut k = [0u32; 4];
    for (i, chunk) in key.chunks_exact(4).enumerate() {
        k[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    k
}

fn to_words(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn from_words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn encrypt_words(v: &mut [u32], key: &[u32; 4]) {
    let n = v.len();
    if n < 2 {
        return;
    }
    let rounds = 6 + 52 / n;
    let mut sum: u32 = 0;
    let mut z = v[n - 1];
    for _ in 0..rounds {
        sum = sum.wrapping_add(DELTA);
        let e = (sum >> 2) & 3;
        for p in 0..n {
            let y = v[(p + 1) % n];
            v[p] = v[p].wrapping_add(mx(sum, y, z, p, e, key));
            z = v[p];
        }
    }
}

fn decrypt_words(v: &mut [u32], key: &[u32; 4]) {
    let n = v.len();
    if n < 2 {
        return;
    }
    let rounds = 6 + 52 / n;
    let mut sum = (rounds as u32).wrapping_mul(DELTA);
    let mut y = v[0];
    for _ in 0..rounds {
        let e = (sum >> 2) & 3;
        for p in (0..n).rev() {
            let z = v[(p + n - 1) % n];
            v[p] = v[p].wrapping_sub(mx(sum, y, z, p, e, key));
            y = v[p];
        }
        sum = sum.wrapping_sub(DELTA);
    }
}

/// Reverse the byte order of each 4-byte word.
///
/// Input length must be a multiple of 4; every encrypted characteristic on
/// the valve satisfies this.
pub fn reverse_words(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if data.len() % 4 != 0 {
        return Err(ProtocolError::RaggedPayload(data.len()));
    }
    let mut out = Vec::with_capacity(data.len());
    for chunk in data.chunks_exact(4) {
        out.extend(chunk.iter().rev());
    }
    Ok(out)
}

/// Encrypt a plaintext payload, zero-padding to a whole number of words.
/// The result carries the padded length.
pub fn encrypt(data: &[u8], key: &SecretKey) -> Vec<u8> {
    let mut padded = data.to_vec();
    while padded.len() % 4 != 0 || padded.len() < 8 {
        padded.push(0);
    }
    let mut words = to_words(&padded);
    encrypt_words(&mut words, &key_words(key));
    from_words(&words)
}

/// Decrypt an encrypted payload. Length must be a whole number of words.
pub fn decrypt(data: &[u8], key: &SecretKey) -> Result<Vec<u8>, ProtocolError> {
    if data.len() % 4 != 0 || data.len() < 8 {
        return Err(ProtocolError::UnexpectedLength {
            handle: 0,
            expected: 8,
            actual: data.len(),
        });
    }
    let mut words = to_words(data);
    decrypt_words(&mut words, &key_words(key));
    Ok(from_words(&words))
}

/// Decode a raw characteristic read: reverse words, then decrypt.
pub fn decode_payload(raw: &[u8], key: &SecretKey) -> Result<Vec<u8>, ProtocolError> {
    decrypt(&reverse_words(raw)?, key)
}

/// Encode a plaintext payload for a characteristic write: encrypt, then
/// reverse words.
pub fn encode_payload(plain: &[u8], key: &SecretKey) -> Result<Vec<u8>, ProtocolError> {
    reverse_words(&encrypt(plain, key))
}
