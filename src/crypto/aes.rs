use std::fmt;

use openssl::symm::{self, Cipher, Crypter};
use snafu::{ensure, ResultExt};

use crate::crypto::common::repeating_block;
use crate::util::{CipherSnafu, Error, InvalidKeySnafu, UnalignedInputSnafu};

pub mod cbc;
pub mod ecb;

pub const BLOCK_SIZE: usize = 16;

/// A single-block transform with a fixed block size.
pub trait BlockCipher {
    fn block_size(&self) -> usize;
    fn encrypt_block(&self, key: &[u8], block: &[u8]) -> Result<Vec<u8>, Error>;
    fn decrypt_block(&self, key: &[u8], block: &[u8]) -> Result<Vec<u8>, Error>;
}

/// AES-128 through openssl's unpadded ECB, one block per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128;

impl Aes128 {
    fn apply(&self, mode: symm::Mode, key: &[u8], block: &[u8]) -> Result<Vec<u8>, Error> {
        ensure!(key.len() == BLOCK_SIZE, InvalidKeySnafu { len: key.len(), expected: BLOCK_SIZE });
        ensure!(block.len() == BLOCK_SIZE, UnalignedInputSnafu { len: block.len(), block_size: BLOCK_SIZE });

        let mut crypter = Crypter::new(Cipher::aes_128_ecb(), mode, key, None).context(CipherSnafu)?;
        crypter.pad(false);
        let mut out = vec![0u8; 2 * BLOCK_SIZE];
        let mut count = crypter.update(block, &mut out).context(CipherSnafu)?;
        count += crypter.finalize(&mut out[count..]).context(CipherSnafu)?;
        out.truncate(count);
        Ok(out)
    }
}

impl BlockCipher for Aes128 {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn encrypt_block(&self, key: &[u8], block: &[u8]) -> Result<Vec<u8>, Error> {
        self.apply(symm::Mode::Encrypt, key, block)
    }

    fn decrypt_block(&self, key: &[u8], block: &[u8]) -> Result<Vec<u8>, Error> {
        self.apply(symm::Mode::Decrypt, key, block)
    }
}

#[test]
fn test_aes128_block_known_answer() {
    let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    let plaintext = hex!("6bc1bee22e409f96e93d7e117393172a");
    let ciphertext = hex!("3ad77bb40d7a3660a89ecaf32466ef97");
    assert_eq!(Aes128.encrypt_block(&key, &plaintext).unwrap(), ciphertext);
    assert_eq!(Aes128.decrypt_block(&key, &ciphertext).unwrap(), plaintext);
}

#[test]
fn test_aes128_block_rejects_bad_lengths() {
    let key = b"YELLOW SUBMARINE";
    assert!(matches!(Aes128.encrypt_block(b"short", &[0; 16]), Err(Error::InvalidKey { len: 5, expected: 16 })));
    assert!(matches!(Aes128.encrypt_block(key, &[0; 15]), Err(Error::UnalignedInput { len: 15, .. })));
    assert!(matches!(Aes128.decrypt_block(key, &[0; 32]), Err(Error::UnalignedInput { len: 32, .. })));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Ecb,
    Cbc,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Ecb => write!(f, "ECB"),
            Mode::Cbc => write!(f, "CBC"),
        }
    }
}

/// ECB if any two whole blocks are identical, otherwise CBC. Only reliable
/// when the plaintext contained repeated blocks, see [`detection_probe`].
pub fn detect_mode(ciphertext: &[u8]) -> Mode {
    detect_mode_with_block_size(ciphertext, BLOCK_SIZE)
}

pub fn detect_mode_with_block_size(ciphertext: &[u8], block_size: usize) -> Mode {
    match repeating_block(ciphertext, block_size) {
        Some(_) => Mode::Ecb,
        None    => Mode::Cbc,
    }
}

#[test]
fn test_detect_mode() {
    let repeated = [[7u8; 16], [1u8; 16], [7u8; 16]].concat();
    assert_eq!(detect_mode(&repeated), Mode::Ecb);
    assert_eq!(detect_mode(&repeated[..32]), Mode::Cbc);
    assert_eq!(detect_mode(b""), Mode::Cbc);
    assert_eq!(detect_mode_with_block_size(b"abcdabcd", 4), Mode::Ecb);
    assert_eq!(detect_mode_with_block_size(b"abcdabcd", 0), Mode::Cbc);
    assert_eq!(Mode::Ecb.to_string(), "ECB");
    assert_eq!(Mode::Cbc.to_string(), "CBC");
}

/// Four blocks of one repeated byte. Whatever up to one block of wrapper
/// precedes it, at least two whole blocks of the probe line up.
pub fn detection_probe(block_size: usize) -> Vec<u8> {
    vec![b'X'; 4 * block_size]
}

/// Feeds the probe to an encryption oracle and classifies what comes back.
pub fn detect_oracle_mode(oracle: impl FnOnce(&[u8]) -> Vec<u8>) -> Mode {
    detect_mode(&oracle(&detection_probe(BLOCK_SIZE)))
}

/// Index of the first ciphertext with a repeated block.
pub fn find_ecb_ciphertext<T: AsRef<[u8]>>(ciphertexts: &[T]) -> Option<usize> {
    ciphertexts.iter()
        .position(|c| detect_mode(c.as_ref()) == Mode::Ecb)
}

#[test]
fn test_find_ecb_ciphertext() {
    use rand::{rngs::StdRng, SeedableRng};
    use crate::crypto::common::random_bytes;

    let mut rng = StdRng::seed_from_u64(8);
    let key = random_bytes(&mut rng, BLOCK_SIZE);
    let mut ciphertexts: Vec<Vec<u8>> = (0..6).map(|_| random_bytes(&mut rng, 160)).collect();
    let plaintext = [b"a prefix block!!".as_slice(), &detection_probe(BLOCK_SIZE)].concat();
    ciphertexts[4] = ecb::ecb_encrypt(&Aes128, &key, &plaintext).unwrap();

    assert_eq!(find_ecb_ciphertext(&ciphertexts), Some(4));
    assert_eq!(find_ecb_ciphertext(&ciphertexts[..4]), None);
}
