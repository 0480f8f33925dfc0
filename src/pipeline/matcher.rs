//! Approximate title matching: stopword stripping + longest common subsequence.
//!
//! The score is an integer ranking heuristic, not a normalized similarity.
//! The event resolver uses it to pick the best candidate for a free-text
//! event reference.

/// Stopwords removed from both sides before scoring.
///
/// Removal is literal substring replacement, case-sensitive and not
/// word-bounded: "Thatcher" loses its "that". Kept unchanged for
/// compatibility with the historical matcher.
const STOPWORDS: [&str; 6] = ["with", "your", "that", "what", "have", "from"];

/// Remove every stopword occurrence from `text`.
fn strip_stopwords(text: &str) -> String {
    let mut cleaned = text.to_owned();
    for word in STOPWORDS {
        cleaned = cleaned.replace(word, "");
    }
    cleaned
}

/// Similarity score between a candidate title and a query phrase.
///
/// Both sides are stopword-stripped, then scored by the length of their
/// longest common subsequence. Either side empty after stripping scores 0.
pub fn similarity(candidate_title: &str, query_phrase: &str) -> usize {
    let a: Vec<char> = strip_stopwords(candidate_title).chars().collect();
    let b: Vec<char> = strip_stopwords(query_phrase).chars().collect();
    lcs_len(&a, &b)
}

/// Longest common subsequence length, two-row dynamic program.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let width = b.len().saturating_add(1);
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            let j1 = j.saturating_add(1);
            cur[j1] = if ca == cb {
                prev[j].saturating_add(1)
            } else {
                cur[j].max(prev[j1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
