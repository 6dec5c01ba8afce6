//! N-gram language scoring.
//!
//! A [`LanguageModel`] holds one [`NGramTable`] per gram order (1 to 5) and
//! scores text by summing the corpus counts of every gram it contains. The
//! score is not a probability: longer input scores higher regardless of
//! quality, so only candidates of equal input length should be compared.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use lazy_static::lazy_static;
use snafu::{ensure, OptionExt, ResultExt};

use crate::util::{
    CorpusCountSnafu, CorpusIoSnafu, CorpusOrderSnafu, CorpusSyntaxSnafu, EmptyCorpusSnafu,
    Error, MalformedGramSnafu,
};

pub type Score = i64;

pub const MAX_GRAM_ORDER: usize = 5;

const CORPUS_FILES: [&str; MAX_GRAM_ORDER] = [
    "english_monograms.txt",
    "english_bigrams.txt",
    "english_trigrams.txt",
    "english_quadgrams.txt",
    "english_quintgrams.txt",
];

lazy_static! {
    /// English model built from the corpus bundled under `data/`.
    pub static ref ENGLISH: LanguageModel = LanguageModel::new(vec![
        NGramTable::parse(1, include_str!("../data/english_monograms.txt")).unwrap(),
        NGramTable::parse(2, include_str!("../data/english_bigrams.txt")).unwrap(),
        NGramTable::parse(3, include_str!("../data/english_trigrams.txt")).unwrap(),
        NGramTable::parse(4, include_str!("../data/english_quadgrams.txt")).unwrap(),
        NGramTable::parse(5, include_str!("../data/english_quintgrams.txt")).unwrap(),
    ]).unwrap();
}

/// What a gram missing from its table costs.
///
/// Neither policy is a principled smoothing estimator; both just give a fixed
/// per-order magnitude to "not English".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownGramPenalty {
    /// The smallest count present in the order's table.
    Rarest,
    /// The largest count present in the order's table.
    #[default]
    Commonest,
}

#[derive(Debug, Clone)]
pub struct NGramTable {
    order: usize,
    counts: HashMap<String, u64>,
    rarest: u64,
    commonest: u64,
}

impl NGramTable {
    /// Parses `GRAM COUNT` lines. Blank lines are ignored and repeated grams
    /// accumulate.
    pub fn parse(order: usize, contents: &str) -> Result<NGramTable, Error> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for (idx, line) in contents.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (gram, count) = line
                .split_whitespace()
                .collect_tuple()
                .context(CorpusSyntaxSnafu { order, line: line_no })?;
            let count: u64 = count
                .parse()
                .context(CorpusCountSnafu { order, line: line_no })?;
            ensure!(
                count > 0
                    && gram.len() == order
                    && gram.bytes().all(|b| b.is_ascii_uppercase()),
                MalformedGramSnafu { order, line: line_no, gram }
            );
            *counts.entry(gram.to_string()).or_insert(0) += count;
        }

        let (rarest, commonest) = match counts.values().minmax().into_option() {
            Some((&min, &max)) => (min, max),
            None => return EmptyCorpusSnafu { order }.fail(),
        };

        Ok(NGramTable { order, counts, rarest, commonest })
    }

    pub fn from_file(order: usize, path: impl AsRef<Path>) -> Result<NGramTable, Error> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .context(CorpusIoSnafu { path: path.to_path_buf() })?;
        NGramTable::parse(order, &contents)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, gram: &str) -> Option<u64> {
        self.counts.get(gram).copied()
    }

    pub fn penalty(&self, policy: UnknownGramPenalty) -> u64 {
        match policy {
            UnknownGramPenalty::Rarest => self.rarest,
            UnknownGramPenalty::Commonest => self.commonest,
        }
    }
}

#[test]
fn test_ngram_table_parse() {
    let table = NGramTable::parse(2, "TH 100\nHE 80\n\nTH 5\nQZ 1\n").unwrap();
    assert_eq!(table.order(), 2);
    assert_eq!(table.len(), 3);
    assert_eq!(table.count("TH"), Some(105));
    assert_eq!(table.count("XX"), None);
    assert_eq!(table.penalty(UnknownGramPenalty::Rarest), 1);
    assert_eq!(table.penalty(UnknownGramPenalty::Commonest), 105);
}

#[test]
fn test_ngram_table_rejects_malformed_lines() {
    assert!(matches!(NGramTable::parse(1, "E"), Err(Error::CorpusSyntax { line: 1, .. })));
    assert!(matches!(NGramTable::parse(1, "E 1 2"), Err(Error::CorpusSyntax { .. })));
    assert!(matches!(NGramTable::parse(1, "E x"), Err(Error::CorpusCount { .. })));
    assert!(matches!(NGramTable::parse(2, "E 4"), Err(Error::MalformedGram { .. })));
    assert!(matches!(NGramTable::parse(1, "e 4"), Err(Error::MalformedGram { .. })));
    assert!(matches!(NGramTable::parse(1, "E 0"), Err(Error::MalformedGram { .. })));
    assert!(matches!(NGramTable::parse(3, "\n\n"), Err(Error::EmptyCorpus { order: 3 })));
}

#[derive(Debug, Clone)]
pub struct LanguageModel {
    tables: Vec<NGramTable>,
    penalty: UnknownGramPenalty,
}

impl LanguageModel {
    /// `tables[i]` must be the table of order `i + 1`.
    pub fn new(tables: Vec<NGramTable>) -> Result<LanguageModel, Error> {
        ensure!(
            !tables.is_empty() && tables.len() <= MAX_GRAM_ORDER,
            CorpusOrderSnafu { expected: 1usize, found: tables.len() }
        );
        for (idx, table) in tables.iter().enumerate() {
            ensure!(
                table.order() == idx + 1,
                CorpusOrderSnafu { expected: idx + 1, found: table.order() }
            );
        }
        Ok(LanguageModel { tables, penalty: UnknownGramPenalty::default() })
    }

    /// Loads `english_monograms.txt` through `english_quintgrams.txt` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<LanguageModel, Error> {
        let dir = dir.as_ref();
        let tables = CORPUS_FILES
            .iter()
            .enumerate()
            .map(|(idx, name)| NGramTable::from_file(idx + 1, dir.join(name)))
            .collect::<Result<Vec<_>, _>>()?;
        LanguageModel::new(tables)
    }

    pub fn with_penalty(mut self, penalty: UnknownGramPenalty) -> LanguageModel {
        self.penalty = penalty;
        self
    }

    pub fn max_order(&self) -> usize {
        self.tables.len()
    }

    /// Spaces are dropped and the rest upper-cased before scoring. For each
    /// order up to `max_order` a window starts at every character, so the
    /// last few windows are shorter than the order and never match.
    pub fn score(&self, text: &str, max_order: usize) -> Score {
        let normalised: Vec<char> = text
            .replace(' ', "")
            .to_uppercase()
            .chars()
            .collect();
        let n = normalised.len();

        let mut score: Score = 0;
        for table in self.tables.iter().take(max_order) {
            let penalty = table.penalty(self.penalty) as Score;
            for start in 0..n {
                let end = (start + table.order()).min(n);
                let gram: String = normalised[start..end].iter().collect();
                score += match table.count(&gram) {
                    Some(count) => count as Score,
                    None => -penalty,
                };
            }
        }
        score
    }
}

/// Scores `text` against the bundled English corpus.
pub fn score(text: &str, max_order: usize) -> Score {
    ENGLISH.score(text, max_order)
}

#[cfg(test)]
fn toy_model() -> LanguageModel {
    LanguageModel::new(vec![
        NGramTable::parse(1, "E 10\nT 7\nH 5\nZ 1").unwrap(),
        NGramTable::parse(2, "TH 9\nHE 8\nEE 2").unwrap(),
    ]).unwrap()
}

#[test]
fn test_score_sums_counts_and_penalises_unknown_grams() {
    let model = toy_model().with_penalty(UnknownGramPenalty::Rarest);
    // T H E: 7 + 5 + 10, then TH HE and the tail window "E": 9 + 8 - 2
    assert_eq!(model.score("the", 2), 37);
    assert_eq!(model.score("the", 1), 22);
    assert_eq!(model.score("t h e", 2), model.score("THE", 2));
    // Q is unknown at order 1; QT, TQ and the tail window are unknown at order 2
    assert_eq!(model.score("qtq", 2), -1 + 7 - 1 - 2 - 2 - 2);

    let model = toy_model().with_penalty(UnknownGramPenalty::Commonest);
    assert_eq!(model.score("the", 2), 7 + 5 + 10 + 9 + 8 - 9);
    assert_eq!(model.score("", 2), 0);
}

#[test]
fn test_score_orders_beyond_the_model_are_ignored() {
    let model = toy_model();
    assert_eq!(model.max_order(), 2);
    assert_eq!(model.score("the", 5), model.score("the", 2));
    assert_eq!(model.score("the", 0), 0);
}

#[test]
fn test_language_model_checks_table_orders() {
    let bigrams = NGramTable::parse(2, "TH 9").unwrap();
    assert!(matches!(
        LanguageModel::new(vec![bigrams]),
        Err(Error::CorpusOrder { expected: 1, found: 2 })
    ));
    assert!(matches!(LanguageModel::new(vec![]), Err(Error::CorpusOrder { .. })));
}

#[test]
fn test_language_model_from_dir() {
    let model = LanguageModel::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/data")).unwrap();
    assert_eq!(model.max_order(), MAX_GRAM_ORDER);
    assert_eq!(model.score("attack at dawn", 5), ENGLISH.score("attack at dawn", 5));

    let missing = LanguageModel::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/no-such-dir"));
    assert!(matches!(missing, Err(Error::CorpusIo { .. })));
}

#[cfg(test)]
use rstest::rstest;

#[cfg(test)]
#[rstest]
#[case("the quick brown fox jumps over the lazy dog", "qzx jvkwq bzqxk vqj xzpjq qxvz zqx jzkx vqg")]
#[case("Cooking MC's like a pound of bacon", "Ieeacdm*GI-y*fcao*k*ze\x7fdn*el*hkied")]
#[case("attack at dawn", "zxqvjk zq xwzp")]
fn test_english_outscores_gibberish(#[case] english: &str, #[case] gibberish: &str) {
    assert_eq!(english.len(), gibberish.len());
    for order in 1..=MAX_GRAM_ORDER {
        assert!(score(english, order) > score(gibberish, order), "order {order}");
    }
}
