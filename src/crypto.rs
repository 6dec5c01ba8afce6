pub mod aes;
pub mod common;
pub mod oracle;
pub mod xor;

#[cfg(test)]
mod generic_tests {
    use base64::{Engine as _, engine::general_purpose};

    use crate::crypto::*;
    use crate::crypto::aes::{Aes128, Mode};
    use crate::crypto::common::{pad_pkcs7, random_bytes};

    #[test]
    fn test_detect_oracle_mode() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(20);
        let key = random_bytes(&mut rng, 16);
        let iv = random_bytes(&mut rng, 16);

        let ecb = |input: &[u8]| aes::ecb::ecb_encrypt(&Aes128, &key, &pad_pkcs7(input, 16).unwrap()).unwrap();
        assert_eq!(aes::detect_oracle_mode(ecb), Mode::Ecb);

        let cbc = |input: &[u8]| aes::cbc::aes_cbc_encrypt(&pad_pkcs7(input, 16).unwrap(), &key, &iv).unwrap();
        assert_eq!(aes::detect_oracle_mode(cbc), Mode::Cbc);
    }

    #[test]
    fn test_break_base64_repeating_key_xor() {
        let plaintext = b"Now that the party is jumping, the rhythm is a dancer and the beat goes on. \
We were all going direct to Heaven, we were all going direct the other way, and nobody \
noticed the difference until the music stopped and the lights came up over the floor.";
        let key = b"Vanilla";
        let encoded = general_purpose::STANDARD.encode(xor::xor_bytes(plaintext, key).unwrap());

        let decoded = general_purpose::STANDARD.decode(encoded).expect("Base64 decoding failed");
        let crack = xor::attack::attack_repeating_key_xor_cipher_fixed_keysize(&decoded, key.len())
            .unwrap()
            .unwrap();
        assert_eq!(crack.key, key);
        assert_eq!(crack.plaintext, plaintext);
    }

    #[test]
    fn test_aes_cbc_round_trip_with_padding() {
        let key = b"YELLOW SUBMARINE";
        let iv = [0u8; 16];
        let plaintext = b"I'm back and I'm ringin' the bell";
        let ciphertext = aes::cbc::aes_cbc_encrypt(&pad_pkcs7(plaintext, 16).unwrap(), key, &iv).unwrap();
        let decrypted = aes::cbc::aes_cbc_decrypt(&ciphertext, key, &iv).unwrap();
        assert_eq!(common::strip_pkcs7(&decrypted, 16).unwrap(), plaintext);
    }

    #[test]
    fn test_oracle_detection_trials() {
        let mut oracle = oracle::ModeOracle::seeded(21);
        let report = oracle::run_detection_trials(&mut oracle, 200).unwrap();
        assert_eq!(report.failures, 0);
    }
}
