use std::num::ParseIntError;
use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("xor key must not be empty"))]
    EmptyKey,

    #[snafu(display("input of {len} bytes is not a multiple of the {block_size} byte block size"))]
    UnalignedInput { len: usize, block_size: usize },

    #[snafu(display("iv must be exactly {block_size} bytes, got {len}"))]
    InvalidIv { len: usize, block_size: usize },

    #[snafu(display("key must be exactly {expected} bytes, got {len}"))]
    InvalidKey { len: usize, expected: usize },

    #[snafu(display("block size {block_size} cannot be padded with PKCS#7"))]
    InvalidBlockSize { block_size: usize },

    #[snafu(display("invalid PKCS#7 padding"))]
    InvalidPadding,

    #[snafu(display("block cipher failure: {source}"))]
    Cipher { source: openssl::error::ErrorStack },

    #[snafu(display("key length range {min}..={max} is empty or starts at zero"))]
    InvalidKeyLengthRange { min: usize, max: usize },

    #[snafu(display("ciphertext of {len} bytes is too short, need at least {min_len}"))]
    CiphertextTooShort { len: usize, min_len: usize },

    #[snafu(display("could not read corpus {}: {source}", path.display()))]
    CorpusIo { path: PathBuf, source: std::io::Error },

    #[snafu(display("order {order} corpus line {line}: expected `GRAM COUNT`"))]
    CorpusSyntax { order: usize, line: usize },

    #[snafu(display("order {order} corpus line {line}: bad count: {source}"))]
    CorpusCount { order: usize, line: usize, source: ParseIntError },

    #[snafu(display("order {order} corpus line {line}: `{gram}` is not {order} uppercase letters with a positive count"))]
    MalformedGram { order: usize, line: usize, gram: String },

    #[snafu(display("order {order} corpus has no grams"))]
    EmptyCorpus { order: usize },

    #[snafu(display("expected a table of order {expected}, found order {found}"))]
    CorpusOrder { expected: usize, found: usize },

    #[snafu(display("wrapper length range {min}..={max} is empty"))]
    InvalidWrapperRange { min: usize, max: usize },

    #[snafu(display("invalid hex: {source}"))]
    Hex { source: hex::FromHexError },
}

// Column j holds byte j of every `width`-sized row. Trailing columns come out
// one shorter when the buffer does not divide evenly.
pub(crate) fn transpose<T>(buf: &[T], width: usize) -> Vec<Vec<T>> where T: Clone {
    let mut transposed = (0..width)
        .map(|_| Vec::with_capacity(buf.len() / width.max(1) + 1))
        .collect::<Vec<_>>();

    for row in buf.chunks(width.max(1)) {
        for (item, column) in row.iter().zip(&mut transposed) {
            column.push(item.clone());
        }
    }

    transposed
}

#[test]
fn test_transpose() {
    let buf = [1, 2, 3, 4, 5, 6];
    let transposed = transpose(&buf, 2);
    assert_eq!(transposed.len(), 2);
    assert_eq!(transposed[0], vec![1, 3, 5]);
    assert_eq!(transposed[1], vec![2, 4, 6]);
}

#[test]
fn test_transpose_uneven() {
    let transposed = transpose(b"abcdefg", 3);
    assert_eq!(transposed, vec![b"adg".to_vec(), b"be".to_vec(), b"cf".to_vec()]);

    let short = transpose(b"ab", 4);
    assert_eq!(short, vec![b"a".to_vec(), b"b".to_vec(), vec![], vec![]]);
}

pub fn hex_to_b64(input: &str) -> Result<String, Error> {
    hex::decode(input)
        .map(|b| general_purpose::STANDARD.encode(b))
        .context(HexSnafu)
}

#[test]
fn test_hex_to_b64() {
    let case = "49276d206b696c6c696e6720796f757220627261696e206c696b65206120706f69736f6e6f7573206d757368726f6f6d";
    let expected = "SSdtIGtpbGxpbmcgeW91ciBicmFpbiBsaWtlIGEgcG9pc29ub3VzIG11c2hyb29t";
    assert_eq!(hex_to_b64(case).unwrap(), expected);
    assert!(matches!(hex_to_b64("zz"), Err(Error::Hex { .. })));
}
