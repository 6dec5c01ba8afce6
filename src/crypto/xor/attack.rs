use std::ops::RangeInclusive;

use itertools::Itertools;
use log::{debug, trace};
use snafu::{ensure, OptionExt};

use crate::crypto::common::normalised_hamming_distance;
use crate::crypto::xor::{byte_xor, xor_bytes};
use crate::stats::{LanguageModel, Score, ENGLISH};
use crate::util::{self, CiphertextTooShortSnafu, EmptyKeySnafu, Error, InvalidKeyLengthRangeSnafu};

/// Gram order candidates are scored at.
pub const SCORING_ORDER: usize = 2;

pub const DEFAULT_KEY_LENGTHS: RangeInclusive<usize> = 2..=40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleByteXorCrack {
    pub key: u8,
    pub plaintext: String,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingKeyXorCrack {
    pub key: Vec<u8>,
    pub plaintext: Vec<u8>,
}

pub fn attack_single_byte_xor_cipher(buf: &[u8]) -> Option<SingleByteXorCrack> {
    attack_single_byte_xor_cipher_with(&ENGLISH, buf)
}

/// Tries every key byte, keeping the best scoring candidate that decodes as
/// UTF-8. Ties go to the lower key byte. `None` when nothing decodes.
pub fn attack_single_byte_xor_cipher_with(model: &LanguageModel, buf: &[u8]) -> Option<SingleByteXorCrack> {
    let mut best: Option<SingleByteXorCrack> = None;
    for key in 0..=u8::MAX {
        let plaintext = match String::from_utf8(byte_xor(buf, key)) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                trace!("key byte {key:#04x} does not decode");
                continue;
            }
        };
        let score = model.score(&plaintext, SCORING_ORDER);
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(SingleByteXorCrack { key, plaintext, score });
        }
    }

    match &best {
        Some(crack) => debug!("best key byte {:#04x} scores {}", crack.key, crack.score),
        None => debug!("no key byte decodes {} bytes of ciphertext", buf.len()),
    }
    best
}

#[test]
fn test_attack_single_byte_xor_cipher() {
    let case: [u8; 34] = hex!("1b37373331363f78151b7f2b783431333d78397828372d363c78373e783a393b3736");
    let crack = attack_single_byte_xor_cipher(&case).unwrap();
    assert_eq!(crack.key, 0x58);
    assert_eq!(crack.plaintext, "Cooking MC's like a pound of bacon");
    assert_eq!(crack.score, ENGLISH.score("Cooking MC's like a pound of bacon", SCORING_ORDER));
}

#[test]
fn test_attack_single_byte_xor_cipher_without_viable_key() {
    // One of the two bytes always has its high bit set and can never finish
    // a valid UTF-8 sequence.
    assert_eq!(attack_single_byte_xor_cipher(&[0x00, 0x80]), None);
}

#[test]
fn test_attack_single_byte_xor_cipher_empty_input() {
    let crack = attack_single_byte_xor_cipher(b"").unwrap();
    assert_eq!(crack.key, 0);
    assert_eq!(crack.plaintext, "");
    assert_eq!(crack.score, 0);
}

/// Breaks each line and returns the index and crack of the one that reads
/// most like English. Only meaningful for lines of equal length.
pub fn detect_single_byte_xor<T: AsRef<[u8]>>(lines: &[T]) -> Option<(usize, SingleByteXorCrack)> {
    lines.iter()
        .enumerate()
        .filter_map(|(idx, line)| attack_single_byte_xor_cipher(line.as_ref()).map(|crack| (idx, crack)))
        .fold(None, |best: Option<(usize, SingleByteXorCrack)>, (idx, crack)| match best {
            Some((best_idx, b)) if b.score >= crack.score => Some((best_idx, b)),
            _ => Some((idx, crack)),
        })
}

#[test]
fn test_detect_single_byte_xor_encoded_string() {
    let lines: Vec<Vec<u8>> = [
        "3501026c15e723a9b26233a118609e47cd055494378d8c260d66c35b5d0e",
        "17001d1ea39547625c8ccddf89707ed28ca030c654040ab9649022541222",
        "6117a6db748aadd2dc1ffdf24aa500e87edc64c46b6a5fb00237cad28c8f",
        "7b5a4215415d544115415d5015455447414c155c46155f4058455c5b523f",
        "f951a25f1570eb8a6a6991b61ff53a5eb345ffe4b82c0d022175a50d18fc",
        "4a8d5e79aebdb5c88735ca449d06e48e92d9a690779e4f9a1a068ad8dc21",
    ].iter()
        .map(|x| hex::decode(x).expect("Hex decoding failed"))
        .collect();
    let (idx, crack) = detect_single_byte_xor(&lines).unwrap();
    assert_eq!(idx, 3);
    assert_eq!(crack.key, 0x35);
    assert_eq!(crack.plaintext, "Now that the party is jumping\n");

    assert_eq!(detect_single_byte_xor(&lines[..3]), None);
    assert_eq!(detect_single_byte_xor::<Vec<u8>>(&[]), None);
}

// Mean normalised distance over the pairs (0,1), (2,3), ... of whole
// `keysize` chunks, or `None` when not even one pair fits.
fn mean_chunk_distance(buf: &[u8], keysize: usize) -> Option<f64> {
    let distances: Vec<f64> = buf.chunks_exact(keysize)
        .tuples::<(&[u8], &[u8])>()
        .map(|(a, b)| normalised_hamming_distance(a, b))
        .collect();
    if distances.is_empty() {
        return None;
    }
    Some(distances.iter().sum::<f64>() / distances.len() as f64)
}

/// The candidate length whose chunk pairs differ least per byte. Ties go to
/// the shorter length.
pub fn estimate_key_length(buf: &[u8], lengths: RangeInclusive<usize>) -> Result<usize, Error> {
    let (min, max) = (*lengths.start(), *lengths.end());
    ensure!(min > 0 && min <= max, InvalidKeyLengthRangeSnafu { min, max });

    let mut best: Option<(usize, f64)> = None;
    for keysize in lengths {
        let distance = match mean_chunk_distance(buf, keysize) {
            Some(distance) => distance,
            None => continue,
        };
        trace!("keysize {keysize}: mean normalised distance {distance:.4}");
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((keysize, distance));
        }
    }

    let (keysize, distance) = best.context(CiphertextTooShortSnafu { len: buf.len(), min_len: 2 * min })?;
    debug!("estimated key length {keysize} (distance {distance:.4})");
    Ok(keysize)
}

#[cfg(test)]
const TALE: &[u8] = b"It was the best of times, it was the worst of times, it was the age of wisdom, \
it was the age of foolishness, it was the epoch of belief, it was the epoch of incredulity, \
it was the season of Light, it was the season of Darkness, it was the spring of hope, \
it was the winter of despair, we had everything before us, we had nothing before us, \
we were all going direct to Heaven, we were all going direct the other way. In short, \
the period was so far like the present period, that some of its noisiest authorities \
insisted on its being received, for good or for evil, in the superlative degree of comparison only.";

#[test]
fn test_estimate_key_length() {
    let key = hex!("8f13e25ac7319d");
    let ciphertext = xor_bytes(TALE, &key).unwrap();
    assert_eq!(estimate_key_length(&ciphertext, 2..=13).unwrap(), 7);

    let key = b"Terminator X: Bring the noise";
    let ciphertext = xor_bytes(TALE, key).unwrap();
    assert_eq!(estimate_key_length(&ciphertext, DEFAULT_KEY_LENGTHS).unwrap(), 29);
}

#[test]
fn test_estimate_key_length_skips_candidates_without_pairs() {
    // Only keysizes 2 and 3 fit a pair; 3 lines up exactly.
    let ciphertext = [1, 2, 3, 1, 2, 3, 9];
    assert_eq!(estimate_key_length(&ciphertext, 2..=10).unwrap(), 3);

    // Equal distances keep the smaller keysize.
    assert_eq!(estimate_key_length(&[0u8; 40], 2..=10).unwrap(), 2);
}

#[test]
fn test_estimate_key_length_rejects_bad_input() {
    assert!(matches!(estimate_key_length(b"abc", 2..=10), Err(Error::CiphertextTooShort { len: 3, min_len: 4 })));
    assert!(matches!(estimate_key_length(b"abcdef", 0..=3), Err(Error::InvalidKeyLengthRange { .. })));
    #[allow(clippy::reversed_empty_ranges)]
    let reversed = 5..=2;
    assert!(matches!(estimate_key_length(b"abcdef", reversed), Err(Error::InvalidKeyLengthRange { min: 5, max: 2 })));
}

/// Breaks each of the `keysize` transposed columns as a single-byte XOR and
/// joins the key bytes in column order. `Ok(None)` when some column has no
/// viable key byte.
pub fn attack_repeating_key_xor_cipher_fixed_keysize(buf: &[u8], keysize: usize) -> Result<Option<RepeatingKeyXorCrack>, Error> {
    ensure!(keysize > 0, EmptyKeySnafu);
    let mut key = Vec::with_capacity(keysize);
    for (column_idx, column) in util::transpose(buf, keysize).iter().enumerate() {
        match attack_single_byte_xor_cipher(column) {
            Some(crack) => key.push(crack.key),
            None => {
                debug!("column {column_idx} of {keysize} has no viable key byte");
                return Ok(None);
            }
        }
    }
    let plaintext = xor_bytes(buf, &key)?;
    Ok(Some(RepeatingKeyXorCrack { key, plaintext }))
}

#[test]
fn test_attack_repeating_key_xor_cipher_fixed_keysize() {
    for key in [b"ICEBERG".as_slice(), b"ICE", &hex!("8f13e25ac7319d")] {
        let ciphertext = xor_bytes(TALE, key).unwrap();
        let crack = attack_repeating_key_xor_cipher_fixed_keysize(&ciphertext, key.len())
            .unwrap()
            .unwrap();
        assert_eq!(crack.key, key);
        assert_eq!(crack.plaintext, TALE);
    }
}

#[test]
fn test_attack_repeating_key_xor_cipher_fixed_keysize_edge_cases() {
    assert!(matches!(attack_repeating_key_xor_cipher_fixed_keysize(b"abc", 0), Err(Error::EmptyKey)));
    // The second column holds only the undecodable pair.
    let ciphertext = [b'a', 0x00, b'b', 0x80];
    assert_eq!(attack_repeating_key_xor_cipher_fixed_keysize(&ciphertext, 2).unwrap(), None);
}

/// Estimates the key length within `lengths`, then breaks at that length.
pub fn attack_repeating_key_xor_cipher(buf: &[u8], lengths: RangeInclusive<usize>) -> Result<Option<RepeatingKeyXorCrack>, Error> {
    let keysize = estimate_key_length(buf, lengths)?;
    attack_repeating_key_xor_cipher_fixed_keysize(buf, keysize)
}

#[test]
fn test_attack_repeating_key_xor_cipher() {
    let key = b"Terminator X: Bring the noise";
    let ciphertext = xor_bytes(TALE, key).unwrap();
    let crack = attack_repeating_key_xor_cipher(&ciphertext, DEFAULT_KEY_LENGTHS)
        .unwrap()
        .unwrap();
    assert_eq!("Terminator X: Bring the noise", std::str::from_utf8(&crack.key).unwrap());
    assert_eq!(crack.plaintext, TALE);
}
