//! Gopher Quality Filter (component H) — accept/reject extracted text based
//! on length, morphology, and punctuation, per §4.H.

const MIN_WORDS: usize = 50;
const MAX_WORDS: usize = 100_000;
const MIN_MEAN_WORD_LEN: f64 = 3.0;
const MAX_MEAN_WORD_LEN: f64 = 10.0;
const MAX_ELLIPSIS_LINE_RATIO: f64 = 0.30;
const MIN_ALPHA_WORD_RATIO: f64 = 0.70;

/// Whitespace + basic punctuation tokenization, shared with the dedup
/// pipeline's n-gram stage so both components measure text the same way
/// (§9 design note on tokenizer choice).
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|w| !w.is_empty())
        .collect()
}

/// The Gopher quality predicate. Returns `true` if `text` should be kept.
pub fn passes_quality_filter(text: &str) -> bool {
    let words = tokenize(text);
    let word_count = words.len();

    if word_count < MIN_WORDS || word_count > MAX_WORDS {
        return false;
    }

    let total_len: usize = words.iter().map(|w| w.chars().count()).sum();
    let mean_word_len = total_len as f64 / word_count as f64;
    if !(MIN_MEAN_WORD_LEN..=MAX_MEAN_WORD_LEN).contains(&mean_word_len) {
        return false;
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let ellipsis_ratio = if lines.is_empty() {
        0.0
    } else {
        let ellipsis_lines = lines
            .iter()
            .filter(|line| line.trim_end().ends_with("..."))
            .count();
        ellipsis_lines as f64 / lines.len() as f64
    };
    if ellipsis_ratio > MAX_ELLIPSIS_LINE_RATIO {
        return false;
    }

    let alpha_words = words
        .iter()
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .count();
    let alpha_ratio = alpha_words as f64 / word_count as f64;
    if alpha_ratio < MIN_ALPHA_WORD_RATIO {
        return false;
    }

    true
}
