use std::ops::RangeInclusive;

use log::{debug, trace};
use rand::distributions::{Distribution, Standard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snafu::ensure;

use crate::crypto::aes::cbc::cbc_encrypt;
use crate::crypto::aes::ecb::ecb_encrypt;
use crate::crypto::aes::{detect_mode_with_block_size, detection_probe, Aes128, BlockCipher, Mode};
use crate::crypto::common::{pad_pkcs7, random_bytes};
use crate::util::{Error, InvalidWrapperRangeSnafu};

impl Distribution<Mode> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Mode {
        if rng.gen() { Mode::Ecb } else { Mode::Cbc }
    }
}

/// Lengths of the random bytes wrapped around each plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSettings {
    pub prefix_len: RangeInclusive<usize>,
    pub suffix_len: RangeInclusive<usize>,
}

impl Default for OracleSettings {
    fn default() -> Self {
        OracleSettings { prefix_len: 5..=10, suffix_len: 5..=10 }
    }
}

/// A ciphertext and the mode that produced it. The mode is there to grade
/// a detector's answer and is never an input to detection.
#[derive(Debug, Clone)]
pub struct OracleTrial {
    ciphertext: Vec<u8>,
    mode: Mode,
}

impl OracleTrial {
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_detected_by(&self, detected: Mode) -> bool {
        self.mode == detected
    }
}

/// Encrypts under a fresh key and a coin-flip choice of ECB or CBC on every
/// call. All randomness comes from the oracle's own generator.
pub struct ModeOracle<R = StdRng, C = Aes128> {
    rng: R,
    cipher: C,
    settings: OracleSettings,
}

impl ModeOracle<StdRng, Aes128> {
    pub fn new() -> Self {
        ModeOracle::with_rng(StdRng::from_entropy(), Aes128)
    }

    pub fn seeded(seed: u64) -> Self {
        ModeOracle::with_rng(StdRng::seed_from_u64(seed), Aes128)
    }
}

impl Default for ModeOracle<StdRng, Aes128> {
    fn default() -> Self {
        ModeOracle::new()
    }
}

impl<R: Rng, C: BlockCipher> ModeOracle<R, C> {
    pub fn with_rng(rng: R, cipher: C) -> Self {
        ModeOracle { rng, cipher, settings: OracleSettings::default() }
    }

    pub fn with_settings(mut self, settings: OracleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    fn random_wrapper(&mut self, len: RangeInclusive<usize>) -> Result<Vec<u8>, Error> {
        ensure!(!len.is_empty(), InvalidWrapperRangeSnafu { min: *len.start(), max: *len.end() });
        let len = self.rng.gen_range(len);
        Ok(random_bytes(&mut self.rng, len))
    }

    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<OracleTrial, Error> {
        let block_size = self.block_size();
        let key = random_bytes(&mut self.rng, block_size);
        let prefix = self.random_wrapper(self.settings.prefix_len.clone())?;
        let suffix = self.random_wrapper(self.settings.suffix_len.clone())?;
        let padded = pad_pkcs7(&[prefix.as_slice(), plaintext, suffix.as_slice()].concat(), block_size)?;

        let mode: Mode = self.rng.gen();
        let ciphertext = match mode {
            Mode::Ecb => ecb_encrypt(&self.cipher, &key, &padded)?,
            Mode::Cbc => {
                let iv = random_bytes(&mut self.rng, block_size);
                cbc_encrypt(&self.cipher, &key, &iv, &padded)?
            }
        };
        trace!("{mode} over {} wrapped bytes ({} prefix, {} suffix)", padded.len(), prefix.len(), suffix.len());
        Ok(OracleTrial { ciphertext, mode })
    }
}

#[test]
fn test_oracle_wraps_and_pads() {
    let mut oracle = ModeOracle::seeded(11);
    for len in [0usize, 1, 15, 16, 47, 64] {
        let trial = oracle.encrypt(&vec![b'A'; len]).unwrap();
        let n = trial.ciphertext().len();
        assert_eq!(n % 16, 0);
        assert!(n >= (len + 11).div_ceil(16) * 16, "{len} -> {n}");
        assert!(n <= (len + 21).div_ceil(16) * 16, "{len} -> {n}");
    }
}

#[test]
fn test_oracle_is_reproducible_from_a_seed() {
    let mut a = ModeOracle::seeded(12);
    let mut b = ModeOracle::seeded(12);
    for _ in 0..10 {
        let (x, y) = (a.encrypt(b"plaintext").unwrap(), b.encrypt(b"plaintext").unwrap());
        assert_eq!(x.ciphertext(), y.ciphertext());
        assert_eq!(x.mode(), y.mode());
    }
}

#[test]
fn test_oracle_uses_fresh_keys_and_both_modes() {
    let mut oracle = ModeOracle::seeded(13).with_settings(OracleSettings { prefix_len: 0..=0, suffix_len: 0..=0 });
    let trials: Vec<OracleTrial> = (0..100).map(|_| oracle.encrypt(&[0u8; 16]).unwrap()).collect();
    let ecb = trials.iter().filter(|t| t.mode() == Mode::Ecb).count();
    assert!(ecb > 20 && ecb < 80, "{ecb} of 100 trials were ECB");

    let ecb_first_blocks: Vec<&[u8]> = trials.iter()
        .filter(|t| t.mode() == Mode::Ecb)
        .map(|t| &t.ciphertext()[..16])
        .collect();
    assert_ne!(ecb_first_blocks[0], ecb_first_blocks[1]);
}

#[test]
fn test_oracle_rejects_empty_wrapper_range() {
    #[allow(clippy::reversed_empty_ranges)]
    let settings = OracleSettings { prefix_len: 10..=5, suffix_len: 5..=10 };
    let mut oracle = ModeOracle::seeded(14).with_settings(settings);
    assert!(matches!(oracle.encrypt(b"x"), Err(Error::InvalidWrapperRange { min: 10, max: 5 })));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialReport {
    pub successes: usize,
    pub failures: usize,
}

impl TrialReport {
    pub fn trials(&self) -> usize {
        self.successes + self.failures
    }
}

/// Encrypts the detection probe `trials` times and grades each detected mode
/// against the oracle's ground truth.
pub fn run_detection_trials<R: Rng, C: BlockCipher>(oracle: &mut ModeOracle<R, C>, trials: usize) -> Result<TrialReport, Error> {
    let block_size = oracle.block_size();
    let probe = detection_probe(block_size);
    let mut report = TrialReport::default();
    for _ in 0..trials {
        let trial = oracle.encrypt(&probe)?;
        if trial.is_detected_by(detect_mode_with_block_size(trial.ciphertext(), block_size)) {
            report.successes += 1;
        } else {
            report.failures += 1;
        }
    }
    debug!("{} of {} trials detected correctly", report.successes, report.trials());
    Ok(report)
}

#[test]
fn test_run_detection_trials() {
    let mut oracle = ModeOracle::seeded(15);
    let report = run_detection_trials(&mut oracle, 1000).unwrap();
    assert_eq!(report, TrialReport { successes: 1000, failures: 0 });
    assert_eq!(report.trials(), 1000);
}

#[test]
fn test_detect_mode_on_oracle_output() {
    let mut oracle = ModeOracle::seeded(16);
    let probe = detection_probe(oracle.block_size());
    let mut seen = (false, false);
    for _ in 0..50 {
        let trial = oracle.encrypt(&probe).unwrap();
        let detected = crate::crypto::aes::detect_mode(trial.ciphertext());
        assert_eq!(detected, trial.mode());
        match detected {
            Mode::Ecb => seen.0 = true,
            Mode::Cbc => seen.1 = true,
        }
    }
    assert_eq!(seen, (true, true));
}
