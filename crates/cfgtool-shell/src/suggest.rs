//! Near-match suggestions for mistyped command names.

/// Most suggestions offered for one unknown name.
pub const MAX_SUGGESTIONS: usize = 3;

/// Case-insensitive Levenshtein distance, two rows at a time.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Candidates close to `input`, nearest first.
///
/// A candidate qualifies when it is within a third of its length of the
/// input (at least two edits), or when one name contains the other.
pub fn suggest<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let lower = candidate.to_lowercase();
            let distance = levenshtein(&needle, &lower);
            let limit = (lower.len() / 3).max(2);
            let contains = needle.len() >= 4 && (lower.contains(&needle) || needle.contains(&lower));
            (distance <= limit || contains).then_some((distance, candidate))
        })
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn distance_ignores_case() {
        assert_eq!(levenshtein("ListDataSources", "listdatasources"), 0);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn close_names_are_suggested_nearest_first() {
        let names = ["listDataSources", "addDataSource", "listDataSource", "save"];
        let found = suggest("listDataSorces", names);
        assert_eq!(found[0], "listDataSources");
        assert!(found.len() <= MAX_SUGGESTIONS);
        assert!(!found.contains(&"save".to_string()));
    }

    #[test]
    fn nothing_close_means_no_suggestions() {
        assert!(suggest("frobnicate", ["save", "validate"]).is_empty());
    }
}
