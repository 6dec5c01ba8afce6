use crate::crypto::aes::BlockCipher;
use crate::crypto::common::ensure_aligned;
use crate::util::Error;

#[cfg(test)]
use openssl::symm::{encrypt, Cipher};
#[cfg(test)]
use crate::crypto::aes::Aes128;
#[cfg(test)]
use crate::crypto::common::pad_pkcs7;

pub fn ecb_encrypt(cipher: &impl BlockCipher, key: &[u8], buf: &[u8]) -> Result<Vec<u8>, Error> {
    let block_size = cipher.block_size();
    ensure_aligned(buf, block_size)?;
    buf.chunks_exact(block_size)
        .map(|block| cipher.encrypt_block(key, block))
        .collect::<Result<Vec<_>, _>>()
        .map(|blocks| blocks.concat())
}

pub fn ecb_decrypt(cipher: &impl BlockCipher, key: &[u8], buf: &[u8]) -> Result<Vec<u8>, Error> {
    let block_size = cipher.block_size();
    ensure_aligned(buf, block_size)?;
    buf.chunks_exact(block_size)
        .map(|block| cipher.decrypt_block(key, block))
        .collect::<Result<Vec<_>, _>>()
        .map(|blocks| blocks.concat())
}

#[test]
fn test_ecb_known_answer() {
    let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    let plaintext = hex!("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e5130c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710");
    let ciphertext = hex!("3ad77bb40d7a3660a89ecaf32466ef97f5d3d58503b9699de785895a96fdbaaf43b1cd7f598ece23881b00e3ed0306887b0c785e27e8ad3f8223207104725dd4");
    assert_eq!(ecb_encrypt(&Aes128, &key, &plaintext).unwrap(), ciphertext);
    assert_eq!(ecb_decrypt(&Aes128, &key, &ciphertext).unwrap(), plaintext);
}

#[test]
fn test_ecb_matches_openssl() {
    let key = b"YELLOW SUBMARINE";
    let plaintext = b"I'm back and I'm ringin' the bell \nA rockin' on the mike while the fly girls yell \n";
    let native = encrypt(Cipher::aes_128_ecb(), key, None, plaintext).unwrap();
    let padded = pad_pkcs7(plaintext, 16).unwrap();
    assert_eq!(ecb_encrypt(&Aes128, key, &padded).unwrap(), native);
    assert_eq!(ecb_decrypt(&Aes128, key, &native).unwrap(), padded);
}

#[test]
fn test_ecb_rejects_unaligned_input() {
    let key = b"YELLOW SUBMARINE";
    assert!(matches!(ecb_encrypt(&Aes128, key, &[0; 17]), Err(Error::UnalignedInput { len: 17, block_size: 16 })));
    assert!(matches!(ecb_decrypt(&Aes128, key, &[0; 15]), Err(Error::UnalignedInput { len: 15, block_size: 16 })));
    assert_eq!(ecb_encrypt(&Aes128, key, b"").unwrap(), Vec::<u8>::new());
}
