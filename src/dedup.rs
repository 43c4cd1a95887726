//! MinHash + LSH Deduper (component I) — find near-duplicate documents and
//! select survivors, per §4.I.

use std::collections::{HashMap, HashSet};

use sha1::{Digest, Sha1};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const NUM_HASHES: usize = 50;
pub const NUM_BANDS: usize = 10;
pub const NGRAM_LENGTH: usize = 3;
pub const JACCARD_THRESHOLD: f64 = 0.80;

type Signature = Vec<[u8; 20]>;

/// Lowercase, collapse whitespace, strip non-word/non-space characters,
/// then NFD-decompose and drop combining marks. Order matches §4.I step 1.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    let word_and_space: String = collapsed
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    word_and_space
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Forms the set of token K-grams for a normalized text (§4.I step 2).
pub fn ngram_set(normalized: &str, k: usize) -> HashSet<String> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.len() < k || k == 0 {
        return HashSet::new();
    }
    tokens
        .windows(k)
        .map(|window| window.join(" "))
        .collect()
}

fn hash_band_ngram(band: usize, ngram: &str) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(band.to_string().as_bytes());
    hasher.update(ngram.as_bytes());
    hasher.finalize().into()
}

/// Computes the `H`-vector MinHash signature for one document's n-gram set
/// (§4.I step 3). An empty n-gram set yields the all-`0xFF` signature, the
/// degenerate case called out in §4.I.
fn signature(ngrams: &HashSet<String>, num_hashes: usize) -> Signature {
    (0..num_hashes)
        .map(|h| {
            ngrams
                .iter()
                .map(|ngram| hash_band_ngram(h, ngram))
                .min()
                .unwrap_or([0xFF; 20])
        })
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Runs MinHash signature + LSH banding + Jaccard verification and returns
/// the indices (into `texts`) to remove, per §4.I steps 3-5.
fn removed_indices(texts: &[String]) -> HashSet<usize> {
    let ngram_sets: Vec<HashSet<String>> = texts
        .iter()
        .map(|t| ngram_set(&normalize(t), NGRAM_LENGTH))
        .collect();
    let signatures: Vec<Signature> = ngram_sets
        .iter()
        .map(|s| signature(s, NUM_HASHES))
        .collect();

    let rows_per_band = NUM_HASHES / NUM_BANDS;
    let mut buckets: HashMap<(usize, Vec<[u8; 20]>), Vec<usize>> = HashMap::new();
    for (doc_idx, sig) in signatures.iter().enumerate() {
        for band in 0..NUM_BANDS {
            let start = band * rows_per_band;
            let end = start + rows_per_band;
            let key = (band, sig[start..end].to_vec());
            buckets.entry(key).or_default().push(doc_idx);
        }
    }

    let mut candidate_pairs: HashSet<(usize, usize)> = HashSet::new();
    for members in buckets.values() {
        if members.len() < 2 {
            continue;
        }
        for a in 0..members.len() {
            for b in (a + 1)..members.len() {
                let (i, j) = (members[a].min(members[b]), members[a].max(members[b]));
                candidate_pairs.insert((i, j));
            }
        }
    }

    let mut removed: HashSet<usize> = HashSet::new();
    let mut ordered_pairs: Vec<(usize, usize)> = candidate_pairs.into_iter().collect();
    ordered_pairs.sort_unstable();
    for (i, j) in ordered_pairs {
        if jaccard(&ngram_sets[i], &ngram_sets[j]) >= JACCARD_THRESHOLD {
            removed.insert(j);
        }
    }
    removed
}

/// Returns the indices into `texts` that survive deduplication, in input
/// order. Lets callers that need to map survivors back to an external key
/// (e.g. a database row id) avoid re-deriving the mapping themselves.
pub fn survivor_indices(texts: &[String]) -> Vec<usize> {
    if texts.is_empty() {
        return Vec::new();
    }
    let removed = removed_indices(texts);
    (0..texts.len()).filter(|idx| !removed.contains(idx)).collect()
}

/// Returns the sublist of `texts` that survives deduplication, preserving
/// input order (§4.I step 6).
pub fn dedup(texts: &[String]) -> Vec<String> {
    survivor_indices(texts)
        .into_iter()
        .map(|idx| texts[idx].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_paragraph(seed: &str) -> String {
        format!(
            "{seed} is a long paragraph about documentation harvesting and how it crawls \
             websites politely while respecting robots rules and recording page versions \
             so that downstream consumers can train on unique high quality text corpora."
        )
    }

    #[test]
    fn normalize_strips_accents_and_punctuation() {
        let normalized = normalize("Café! Déjà-vu.");
        assert_eq!(normalized, "cafe dejavu");
    }

    #[test]
    fn identical_documents_collapse_to_one_survivor() {
        let text = long_paragraph("Alpha");
        let texts = vec![text.clone(), text.clone(), text.clone()];
        let survivors = dedup(&texts);
        assert_eq!(survivors, vec![text]);
    }

    #[test]
    fn disjoint_documents_all_survive() {
        let texts = vec![
            "completely unrelated short subject about gardening and soil composition techniques for home growers everywhere across many climates and seasons".to_string(),
            "an entirely different essay concerning orbital mechanics calculations used by spacecraft engineers when planning interplanetary transfer trajectories".to_string(),
            "a third passage discussing culinary techniques for fermenting vegetables at home using traditional brine ratios and temperature control methods".to_string(),
        ];
        let survivors = dedup(&texts);
        assert_eq!(survivors.len(), 3);
    }

    #[test]
    fn lower_indexed_duplicate_survives() {
        let d1 = long_paragraph("Alpha");
        let d2 = long_paragraph("Alpha");
        let d3 = "a third passage discussing culinary techniques for fermenting vegetables at home using traditional brine ratios and temperature control methods".to_string();
        let texts = vec![d1.clone(), d2, d3.clone()];
        let survivors = dedup(&texts);
        assert_eq!(survivors, vec![d1, d3]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let texts: Vec<String> = Vec::new();
        assert!(dedup(&texts).is_empty());
    }

    #[test]
    fn deterministic_across_runs() {
        let texts = vec![
            long_paragraph("One"),
            long_paragraph("One"),
            "unrelated content about river ecosystems and freshwater fish migration behavior during seasonal temperature shifts".to_string(),
        ];
        let first = dedup(&texts);
        let second = dedup(&texts);
        assert_eq!(first, second);
    }
}
