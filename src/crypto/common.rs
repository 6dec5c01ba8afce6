use rand::RngCore;
use std::collections::HashSet;

use snafu::ensure;

use crate::util::{Error, InvalidBlockSizeSnafu, InvalidPaddingSnafu, UnalignedInputSnafu};

pub fn hamming_distance(buf1: &[u8], buf2: &[u8]) -> u32 {
    assert_eq!(buf1.len(), buf2.len());
    buf1.iter()
        .zip(buf2.iter())
        .map(|(x,y)| x ^ y )
        .map(|z| z.count_ones() )
        .sum()
}

#[test]
fn test_hamming_distance() {
    let dist = hamming_distance(b"this is a test", b"wokka wokka!!!");
    assert_eq!(dist, 37);
    assert_eq!(hamming_distance(b"", b""), 0);
}

#[test]
#[should_panic]
fn test_hamming_distance_rejects_unequal_lengths() {
    hamming_distance(b"abc", b"ab");
}

pub fn normalised_hamming_distance(buf1: &[u8], buf2: &[u8]) -> f64 {
    (hamming_distance(buf1, buf2) as f64) / (buf1.len() as f64)
}

/// First block of `size` bytes that repeats an earlier one, with its index.
/// A zero block size has no blocks.
pub fn repeating_block(arr: &[u8], size: usize) -> Option<(usize, Vec<u8>)> {
    if size == 0 {
        return None;
    }
    let mut blocks: HashSet<&[u8]> = HashSet::new();
    for (idx, block) in arr.chunks_exact(size).enumerate() {
        if !blocks.insert(block) {
            return Some((idx, block.to_vec()));
        }
    }
    None
}

#[test]
fn test_repeating_block() {
    let arr = b"aaabbbcccaaa";
    assert_eq!(Some((3, b"aaa".to_vec())), repeating_block(arr, 3));
    assert_eq!(None,                       repeating_block(arr, 4));
    assert_eq!(None,                       repeating_block(b"abcdab", 4));
    assert_eq!(None,                       repeating_block(arr, 0));
}

pub fn ensure_aligned(buf: &[u8], block_size: usize) -> Result<(), Error> {
    ensure!(
        block_size > 0 && buf.len() % block_size == 0,
        UnalignedInputSnafu { len: buf.len(), block_size }
    );
    Ok(())
}

// Always appends 1..=block_size bytes, so a block-aligned input gains a full block.
pub fn pad_pkcs7(buf: &[u8], block_size: usize) -> Result<Vec<u8>, Error> {
    ensure!((1..=255).contains(&block_size), InvalidBlockSizeSnafu { block_size });
    let padding_length = block_size - buf.len() % block_size;
    Ok([buf, &vec![padding_length as u8; padding_length]].concat())
}

#[test]
fn test_pad_pkcs7() {
    let case = b"YELLOW SUBMARINE";
    let expected = b"YELLOW SUBMARINE\x04\x04\x04\x04".to_vec();
    assert_eq!(expected, pad_pkcs7(case, 20).unwrap());

    let expected_2 = [case.to_vec(), vec![16; 16]].concat();
    assert_eq!(expected_2, pad_pkcs7(case, case.len()).unwrap());

    assert_eq!(vec![4u8; 4], pad_pkcs7(b"", 4).unwrap());
    assert!(matches!(pad_pkcs7(case, 0), Err(Error::InvalidBlockSize { block_size: 0 })));
    assert!(matches!(pad_pkcs7(case, 256), Err(Error::InvalidBlockSize { .. })));
}

pub fn strip_pkcs7(buf: &[u8], block_size: usize) -> Result<Vec<u8>, Error> {
    ensure!((1..=255).contains(&block_size), InvalidBlockSizeSnafu { block_size });
    ensure_aligned(buf, block_size)?;
    let &final_byte = buf.last().ok_or(Error::InvalidPadding)?;
    let padding_len = final_byte as usize;
    ensure!(
        (1..=block_size).contains(&padding_len)
            && buf.iter().rev().take(padding_len).all(|&b| b == final_byte),
        InvalidPaddingSnafu
    );
    Ok(buf[..buf.len() - padding_len].to_vec())
}

#[test]
fn test_strip_pkcs7() {
    let case = b"YELLOW SUBMARINE\x04\x04\x04\x04";
    let expected = b"YELLOW SUBMARINE".to_vec();
    assert_eq!(expected, strip_pkcs7(case, 20).unwrap());
    assert!(matches!(strip_pkcs7(case, 16), Err(Error::UnalignedInput { len: 20, block_size: 16 })));

    let case_3 = [b"YELLOW SUBMARINE".as_slice(), &[16u8; 16]].concat();
    assert_eq!(expected, strip_pkcs7(&case_3, 16).unwrap());

    let case_4 = b"ICE ICE BABY\x04\x04\x04\x04";
    assert_eq!(b"ICE ICE BABY".to_vec(), strip_pkcs7(case_4, 16).unwrap());

    let case_5 = b"ICE ICE BABY\x05\x05\x05\x05";
    assert!(matches!(strip_pkcs7(case_5, 16), Err(Error::InvalidPadding)));

    let case_6 = b"ICE ICE BABY\x01\x02\x03\x04";
    assert!(matches!(strip_pkcs7(case_6, 16), Err(Error::InvalidPadding)));

    let case_7 = b"ICE ICE BABY\x04\x04\x04\x00";
    assert!(matches!(strip_pkcs7(case_7, 16), Err(Error::InvalidPadding)));
    assert!(matches!(strip_pkcs7(b"", 16), Err(Error::InvalidPadding)));
}

pub fn random_bytes<R: RngCore + ?Sized>(rng: &mut R, n: usize) -> Vec<u8> {
    let mut data = vec![0u8; n];
    rng.fill_bytes(&mut data);
    data
}

#[test]
fn test_random_bytes_are_reproducible_from_a_seed() {
    use rand::{rngs::StdRng, SeedableRng};

    let a = random_bytes(&mut StdRng::seed_from_u64(7), 16);
    let b = random_bytes(&mut StdRng::seed_from_u64(7), 16);
    let c = random_bytes(&mut StdRng::seed_from_u64(8), 16);
    assert_eq!(a.len(), 16);
    assert_eq!(a, b);
    assert_ne!(a, c);
}
