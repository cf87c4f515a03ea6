//! String sources for sample text.

use crate::core::errors::{SynthError, SynthResult};
use crate::fonts::CandidatePool;
use crate::fonts::FontGlyphProfile;
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::Path;

const DIGITS: &str = "0123456789";
/// Symbols inserted into dictionary words.
const WORD_SYMBOLS: &str = "!\"%'()+,-./:;\\_";
/// Symbols used by random sequences.
const SEQUENCE_SYMBOLS: &str = "!\"#$%&'()*+,-./:;?@[\\]^_`{|}~";

/// Probability that a dictionary word gets random characters inserted.
const WORD_NOISE_PROBABILITY: f64 = 0.2;
/// Per-character probability of starting (and continuing) an insertion.
const INSERT_PROBABILITY: f64 = 0.33;

/// Character classes for [`strings_randomly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharClasses {
    pub letters: bool,
    pub numbers: bool,
    pub symbols: bool,
}

impl CharClasses {
    /// Every class enabled, which is also what an all-false selection means.
    pub fn all() -> Self {
        Self {
            letters: true,
            numbers: true,
            symbols: true,
        }
    }
}

/// Reads non-empty lines of a dictionary file.
///
/// # Errors
///
/// Fails if the file cannot be read or has no words.
pub fn load_dict(path: &Path) -> SynthResult<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    let words: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if words.is_empty() {
        return Err(SynthError::invalid_input(format!(
            "dictionary {} has no words",
            path.display()
        )));
    }
    Ok(words)
}

/// Draws `count` trimmed lines of `path`, each cut to `max_length` chars.
///
/// Lines are sampled with replacement, so `count` may exceed the line count.
///
/// # Errors
///
/// Fails if the file cannot be read or contains no lines.
pub fn strings_from_file<R: Rng + ?Sized>(
    path: &Path,
    count: usize,
    max_length: usize,
    rng: &mut R,
) -> SynthResult<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    let lines: Vec<String> = contents
        .lines()
        .map(|line| line.trim().chars().take(max_length).collect::<String>())
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(SynthError::invalid_input(format!(
            "no lines could be read from {}",
            path.display()
        )));
    }
    Ok((0..count)
        .filter_map(|_| lines.choose(rng).cloned())
        .collect())
}

fn word_count<R: Rng + ?Sized>(length: usize, allow_variable: bool, rng: &mut R) -> usize {
    let length = length.max(1);
    if allow_variable {
        rng.gen_range(1..=length)
    } else {
        length
    }
}

/// `count` strings of `length` (or `1..=length`) random words joined by
/// single spaces. An empty dictionary yields empty strings.
pub fn strings_from_dict<R: Rng + ?Sized>(
    words: &[String],
    length: usize,
    allow_variable: bool,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    (0..count)
        .map(|_| {
            let n = word_count(length, allow_variable, rng);
            (0..n)
                .filter_map(|_| words.choose(rng).map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Like [`strings_from_dict`], but some words get digits (and optionally
/// symbols) inserted after random characters.
pub fn strings_from_dict_with_random_chars<R: Rng + ?Sized>(
    words: &[String],
    length: usize,
    allow_variable: bool,
    count: usize,
    numbers: bool,
    symbols: bool,
    rng: &mut R,
) -> Vec<String> {
    let mut pool: Vec<char> = Vec::new();
    if numbers {
        pool.extend(DIGITS.chars());
    }
    if symbols {
        pool.extend(WORD_SYMBOLS.chars());
    }

    let mut strings = Vec::with_capacity(count);
    for _ in 0..count {
        let n = word_count(length, allow_variable, rng);
        let mut line: Vec<String> = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(word) = words.choose(rng) else {
                break;
            };
            if !pool.is_empty() && rng.gen_bool(WORD_NOISE_PROBABILITY) {
                line.push(insert_random_chars(word, &pool, rng));
            } else {
                line.push(word.clone());
            }
        }
        strings.push(line.join(" "));
    }
    strings
}

fn insert_random_chars<R: Rng + ?Sized>(word: &str, pool: &[char], rng: &mut R) -> String {
    let mut out = String::with_capacity(word.len() * 2);
    for ch in word.chars() {
        out.push(ch);
        if rng.gen_bool(INSERT_PROBABILITY) {
            while rng.gen_bool(INSERT_PROBABILITY) {
                if let Some(&extra) = pool.choose(rng) {
                    out.push(extra);
                }
            }
        }
    }
    out
}

/// `count` strings of `length` (or `1..=length`) random character runs.
///
/// Runs are 2-10 characters, or 1-2 ideographs for `cn`. With no class
/// selected all three classes are used.
pub fn strings_randomly<R: Rng + ?Sized>(
    length: usize,
    allow_variable: bool,
    count: usize,
    classes: CharClasses,
    language: &str,
    rng: &mut R,
) -> Vec<String> {
    let classes = if classes == CharClasses::default() {
        CharClasses::all()
    } else {
        classes
    };
    let cn = language == "cn";

    let mut pool: Vec<char> = Vec::new();
    if classes.letters {
        if cn {
            pool.extend(CandidatePool::cjk().chars());
        } else {
            pool.extend(('a'..='z').chain('A'..='Z'));
        }
    }
    if classes.numbers {
        pool.extend(DIGITS.chars());
    }
    if classes.symbols {
        pool.extend(SEQUENCE_SYMBOLS.chars());
    }
    let (min_run, max_run) = if cn { (1, 2) } else { (2, 10) };

    (0..count)
        .map(|_| {
            let n = word_count(length, allow_variable, rng);
            (0..n)
                .map(|_| {
                    let run = rng.gen_range(min_run..=max_run);
                    (0..run)
                        .filter_map(|_| pool.choose(rng))
                        .collect::<String>()
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// `count` strings of 5-75 spaces, used to teach blank recognition.
pub fn random_space_strings<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<String> {
    (0..count)
        .map(|_| " ".repeat(rng.gen_range(5..=75)))
        .collect()
}

/// `count` strings of 1-5 characters the font is known to draw.
pub fn strings_from_profile<R: Rng + ?Sized>(
    profile: &FontGlyphProfile,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let drawable: Vec<char> = profile
        .chars()
        .iter()
        .copied()
        .filter(|c| !c.is_whitespace())
        .collect();
    (0..count)
        .map(|_| {
            let n = rng.gen_range(1..=5);
            (0..n).filter_map(|_| drawable.choose(rng)).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn words() -> Vec<String> {
        ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strings_from_file_cuts_and_samples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, "  hello world  \n\nabcdefghij\n").unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let strings = strings_from_file(&path, 10, 5, &mut rng).unwrap();
        assert_eq!(strings.len(), 10);
        assert!(strings.iter().all(|s| s == "hello" || s == "abcde"));
    }

    #[test]
    fn test_empty_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "\n\n").unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(strings_from_file(&path, 3, 10, &mut rng).is_err());
        assert!(load_dict(&path).is_err());
    }

    #[test]
    fn test_dict_word_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        for s in strings_from_dict(&words(), 3, false, 20, &mut rng) {
            assert_eq!(s.split(' ').count(), 3);
        }
        for s in strings_from_dict(&words(), 3, true, 20, &mut rng) {
            let n = s.split(' ').count();
            assert!((1..=3).contains(&n));
        }
    }

    #[test]
    fn test_random_chars_only_add_pool_chars() {
        let mut rng = StdRng::seed_from_u64(2);
        let strings = strings_from_dict_with_random_chars(&words(), 2, false, 200, true, false, &mut rng);
        assert!(strings.iter().any(|s| s.chars().any(|c| c.is_ascii_digit())));
        for s in strings {
            let stripped: String = s.chars().filter(|c| !c.is_ascii_digit()).collect();
            assert!(stripped.split(' ').all(|w| words().contains(&w.to_string())));
        }
    }

    #[test]
    fn test_random_chars_keep_word_count() {
        let mut rng = StdRng::seed_from_u64(9);
        let strings =
            strings_from_dict_with_random_chars(&words(), 3, false, 50, false, true, &mut rng);
        assert_eq!(strings.len(), 50);
        for s in &strings {
            assert_eq!(s.split(' ').count(), 3);
        }
        assert!(strings_from_dict_with_random_chars(&[], 2, false, 3, true, true, &mut rng)
            .iter()
            .all(String::is_empty));
    }

    #[test]
    fn test_random_sequences() {
        let mut rng = StdRng::seed_from_u64(3);
        let classes = CharClasses {
            numbers: true,
            ..CharClasses::default()
        };
        for s in strings_randomly(2, false, 10, classes, "en", &mut rng) {
            let runs: Vec<&str> = s.split(' ').collect();
            assert_eq!(runs.len(), 2);
            assert!(runs.iter().all(|r| (2..=10).contains(&r.len())));
            assert!(s.chars().all(|c| c == ' ' || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_random_sequences_cn() {
        let mut rng = StdRng::seed_from_u64(4);
        let classes = CharClasses {
            letters: true,
            ..CharClasses::default()
        };
        for s in strings_randomly(1, false, 10, classes, "cn", &mut rng) {
            let n = s.chars().count();
            assert!((1..=2).contains(&n));
            assert!(s.chars().all(|c| (0x4E00..=0x9FCB).contains(&(c as u32))));
        }
    }

    #[test]
    fn test_space_strings() {
        let mut rng = StdRng::seed_from_u64(5);
        for s in random_space_strings(10, &mut rng) {
            assert!((5..=75).contains(&s.len()));
            assert!(s.chars().all(|c| c == ' '));
        }
    }

    #[test]
    fn test_profile_strings_skip_blanks() {
        let profile = FontGlyphProfile::new("f", vec!['x', 'y', ' ', ' ']);
        let mut rng = StdRng::seed_from_u64(6);
        for s in strings_from_profile(&profile, 20, &mut rng) {
            let n = s.chars().count();
            assert!((1..=5).contains(&n));
            assert!(s.chars().all(|c| c == 'x' || c == 'y'));
        }
    }
}
