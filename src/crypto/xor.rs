use snafu::ensure;

use crate::util::{EmptyKeySnafu, Error};

pub mod attack;

/// XORs `buf` against `key`, cycling the key from its start. The output has
/// the length of `buf`; this is also repeating-key XOR encryption.
pub fn xor_bytes(buf: &[u8], key: &[u8]) -> Result<Vec<u8>, Error> {
    ensure!(!key.is_empty(), EmptyKeySnafu);
    Ok(buf.iter()
        .zip(key.iter().cycle())
        .map(|(x,y)| x ^ y)
        .collect())
}

#[test]
fn test_fixed_xor() {
    let case_buf1 = hex!("1c0111001f010100061a024b53535009181c");
    let case_buf2 = hex!("686974207468652062756c6c277320657965");
    let expected = hex!("746865206b696420646f6e277420706c6179");
    let result = xor_bytes(&case_buf1, &case_buf2).unwrap();
    assert_eq!(result, expected);
}

#[test]
fn test_repeating_key_xor() {
    let case = b"Burning 'em, if you ain't quick and nimble\nI go crazy when I hear a cymbal";
    let key = b"ICE";
    let encoded = xor_bytes(case, key).unwrap();
    let expected = hex!("0b3637272a2b2e63622c2e69692a23693a2a3c6324202d623d63343c2a26226324272765272a282b2f20430a652e2c652a3124333a653e2b2027630c692b20283165286326302e27282f");
    assert_eq!(encoded, expected);
}

#[test]
fn test_xor_bytes_rejects_empty_key() {
    assert!(matches!(xor_bytes(b"data", b""), Err(Error::EmptyKey)));
    assert!(matches!(xor_bytes(b"", b""), Err(Error::EmptyKey)));
    assert_eq!(xor_bytes(b"", b"k").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_xor_bytes_is_self_inverse() {
    let cases: [(&[u8], &[u8]); 4] = [
        (b"a", b"longer than the data"),
        (b"attack at dawn", b"K"),
        (b"attack at dawn", b"LEMON"),
        (&[0x00, 0xff, 0x80, 0x7f, 0x10], &[0xff, 0x01]),
    ];
    for (data, key) in cases {
        let once = xor_bytes(data, key).unwrap();
        assert_eq!(once.len(), data.len());
        assert_eq!(xor_bytes(&once, key).unwrap(), data);
    }
}

pub fn byte_xor(buf: &[u8], b: u8) -> Vec<u8> {
    buf.iter()
        .map(|x| x ^ b )
        .collect()
}

#[test]
fn test_byte_xor_matches_single_byte_key() {
    let buf = b"Cooking MC's like a pound of bacon";
    assert_eq!(byte_xor(buf, b'X'), xor_bytes(buf, b"X").unwrap());
}
