use std::iter::once;

use snafu::ensure;

use crate::crypto::aes::{Aes128, BlockCipher};
use crate::crypto::common::ensure_aligned;
use crate::crypto::xor::xor_bytes;
use crate::util::{Error, InvalidIvSnafu};

#[cfg(test)]
use openssl::symm::{encrypt, decrypt, Cipher};
#[cfg(test)]
use crate::crypto::common::{pad_pkcs7, strip_pkcs7};

fn check_chain(buf: &[u8], iv: &[u8], block_size: usize) -> Result<(), Error> {
    ensure!(iv.len() == block_size, InvalidIvSnafu { len: iv.len(), block_size });
    ensure_aligned(buf, block_size)
}

/// Each plaintext block is XORed with the previous ciphertext block (the IV
/// for the first) and then encrypted, so blocks are produced strictly in order.
pub fn cbc_encrypt(cipher: &impl BlockCipher, key: &[u8], iv: &[u8], buf: &[u8]) -> Result<Vec<u8>, Error> {
    let block_size = cipher.block_size();
    check_chain(buf, iv, block_size)?;

    let mut ciphertext = Vec::with_capacity(buf.len());
    let mut previous = iv.to_vec();
    for block in buf.chunks_exact(block_size) {
        let mixed = xor_bytes(block, &previous)?;
        previous = cipher.encrypt_block(key, &mixed)?;
        ciphertext.extend_from_slice(&previous);
    }
    Ok(ciphertext)
}

/// Blocks are decrypted independently, then each is XORed with the
/// ciphertext block before it (the IV for the first).
pub fn cbc_decrypt(cipher: &impl BlockCipher, key: &[u8], iv: &[u8], buf: &[u8]) -> Result<Vec<u8>, Error> {
    let block_size = cipher.block_size();
    check_chain(buf, iv, block_size)?;

    let decrypted = buf.chunks_exact(block_size)
        .map(|block| cipher.decrypt_block(key, block))
        .collect::<Result<Vec<_>, _>>()?;
    let previous_blocks = once(iv).chain(buf.chunks_exact(block_size));

    let mut plaintext = Vec::with_capacity(buf.len());
    for (block, previous) in decrypted.iter().zip(previous_blocks) {
        plaintext.extend(xor_bytes(block, previous)?);
    }
    Ok(plaintext)
}

pub fn aes_cbc_encrypt(buf: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, Error> {
    cbc_encrypt(&Aes128, key, iv, buf)
}

pub fn aes_cbc_decrypt(buf: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, Error> {
    cbc_decrypt(&Aes128, key, iv, buf)
}

#[test]
fn test_aes_cbc_known_answer() {
    let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    let iv = hex!("000102030405060708090a0b0c0d0e0f");
    let plaintext = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e5130c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710");
    let ciphertext = hex!("7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b273bed6b8e3c1743b7116e69e222295163ff1caa1681fac09120eca307586e1a7");
    assert_eq!(aes_cbc_encrypt(&plaintext, &key, &iv).unwrap(), ciphertext);
    assert_eq!(aes_cbc_decrypt(&ciphertext, &key, &iv).unwrap(), plaintext);
}

#[test]
fn test_aes_cbc_decrypt() {
    let ciphertext = hex!("091230aade3eb330dbaa4358f88d2a6cd5cf8355cb6823397ad43906df4344557fc4837693c1a8ee3b40acb2323fad396f4ef50cbf02f853d84873973e430c3053c02a6f8db2ed2708131056df66965b982677ad77c0563bc3f56e52da2c4b2f");
    let key = b"YELLOW SUBMARINE";
    let iv = [0u8; 16];
    let decrypted = aes_cbc_decrypt(&ciphertext, key, &iv).unwrap();
    let expected = b"I'm back and I'm ringin' the bell \nA rockin' on the mike while the fly girls yell \n";
    assert_eq!(strip_pkcs7(&decrypted, 16).unwrap(), expected);

    let reencrypted = aes_cbc_encrypt(&decrypted, key, &iv).unwrap();
    assert_eq!(reencrypted, ciphertext);
}

#[test]
fn test_aes_cbc_matches_openssl() {
    let key = b"YELLOW SUBMARINE";
    let iv = b"yellow submarine";
    let plaintext = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let padded = pad_pkcs7(plaintext, 16).unwrap();

    let native = encrypt(Cipher::aes_128_cbc(), key, Some(iv.as_slice()), plaintext).unwrap();
    let ciphertext = aes_cbc_encrypt(&padded, key, iv).unwrap();
    assert_eq!(ciphertext, native);

    let result = aes_cbc_decrypt(&native, key, iv).unwrap();
    assert_eq!(result, padded);
    assert_eq!(decrypt(Cipher::aes_128_cbc(), key, Some(iv.as_slice()), &ciphertext).unwrap(), plaintext);
}

#[test]
fn test_aes_cbc_round_trips() {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use crate::crypto::common::random_bytes;

    let mut rng = StdRng::seed_from_u64(10);
    for blocks in 0..8 {
        let key = random_bytes(&mut rng, 16);
        let iv = random_bytes(&mut rng, 16);
        let len = blocks * 16;
        let plaintext: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

        let ciphertext = aes_cbc_encrypt(&plaintext, &key, &iv).unwrap();
        assert_eq!(ciphertext.len(), len);
        assert_eq!(aes_cbc_decrypt(&ciphertext, &key, &iv).unwrap(), plaintext);

        // Any aligned buffer is a valid chain, so the other direction holds too.
        let decrypted = aes_cbc_decrypt(&plaintext, &key, &iv).unwrap();
        assert_eq!(aes_cbc_encrypt(&decrypted, &key, &iv).unwrap(), plaintext);
    }
}

#[test]
fn test_aes_cbc_chains_identical_blocks_apart() {
    let key = b"YELLOW SUBMARINE";
    let ciphertext = aes_cbc_encrypt(&[b'X'; 64], key, &[0u8; 16]).unwrap();
    let blocks: Vec<&[u8]> = ciphertext.chunks(16).collect();
    assert_ne!(blocks[0], blocks[1]);
    assert_ne!(blocks[1], blocks[2]);
}

#[test]
fn test_aes_cbc_rejects_invalid_chains() {
    let key = b"YELLOW SUBMARINE";
    let iv = [0u8; 16];
    assert!(matches!(aes_cbc_encrypt(&[0; 20], key, &iv), Err(Error::UnalignedInput { len: 20, block_size: 16 })));
    assert!(matches!(aes_cbc_decrypt(&[0; 31], key, &iv), Err(Error::UnalignedInput { len: 31, block_size: 16 })));
    assert!(matches!(aes_cbc_encrypt(&[0; 32], key, &iv[..8]), Err(Error::InvalidIv { len: 8, block_size: 16 })));
    assert!(matches!(aes_cbc_decrypt(&[0; 32], key, &[0; 17]), Err(Error::InvalidIv { len: 17, block_size: 16 })));
    assert!(matches!(aes_cbc_encrypt(&[0; 32], b"short key", &iv), Err(Error::InvalidKey { .. })));
    assert_eq!(aes_cbc_decrypt(b"", key, &iv).unwrap(), Vec::<u8>::new());
}
