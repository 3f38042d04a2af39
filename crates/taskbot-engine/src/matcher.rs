//! Approximate title matching for the search fallback.
//!
//! Scores are a weighted ratio in [0, 100]: the best of a full-string
//! comparison, a token-sorted comparison (weight 0.95) and a best-window
//! partial comparison (weight 0.9), all over normalized Levenshtein
//! similarity. Token sorting makes the score word-order-insensitive;
//! the partial pass rewards a short query buried in a longer title.

use taskbot_core::task::Task;

pub const SEARCH_LIMIT: usize = 5;
pub const SEARCH_CUTOFF: u8 = 60;

/// Weighted-ratio similarity between two strings, case-insensitive.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let full = strsim::normalized_levenshtein(&a, &b);
    let token_sort = strsim::normalized_levenshtein(&sort_tokens(&a), &sort_tokens(&b));
    let partial = partial_ratio(&a, &b);

    let score = full.max(token_sort * 0.95).max(partial * 0.9);
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Best alignment of the shorter string against every same-length window
/// of the longer one.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let ac: Vec<char> = a.chars().collect();
    let bc: Vec<char> = b.chars().collect();
    let (short, long) = if ac.len() <= bc.len() { (ac, bc) } else { (bc, ac) };
    if short.is_empty() {
        return 0.0;
    }

    let needle: String = short.iter().collect();
    let mut best: f64 = 0.0;
    for window in long.windows(short.len()) {
        let hay: String = window.iter().collect();
        best = best.max(strsim::normalized_levenshtein(&needle, &hay));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// Rank `candidates` whose titles resemble `query`. Returns at most
/// `limit` entries scoring at least `cutoff`, best first; equal scores
/// keep candidate order. Correspondence is positional, so tasks sharing
/// a title each keep their own row.
pub fn find_similar<'a>(
    query: &str,
    candidates: &'a [Task],
    limit: usize,
    cutoff: u8,
) -> Vec<(&'a Task, u8)> {
    let mut scored: Vec<(&Task, u8)> = candidates
        .iter()
        .map(|task| (task, weighted_ratio(query, &task.title)))
        .filter(|(_, score)| *score >= cutoff)
        .collect();

    // sort_by is stable: ties stay in input order.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbot_core::ids::{ChatId, TaskId};
    use taskbot_core::task::{Category, TaskStatus};

    fn task(id: i64, title: &str) -> Task {
        Task {
            id: TaskId(id),
            owner: ChatId(1),
            title: title.into(),
            description: String::new(),
            category: Category::Other,
            status: TaskStatus::Open,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn identical_titles_score_100() {
        assert_eq!(weighted_ratio("fix bug", "fix bug"), 100);
        assert_eq!(weighted_ratio("Fix Bug", "fix bug"), 100);
    }

    #[test]
    fn token_order_is_forgiven() {
        let score = weighted_ratio("bug fix", "fix bug");
        assert_eq!(score, 95);
    }

    #[test]
    fn substring_query_scores_high() {
        let score = weighted_ratio("bug", "fix bug nightly");
        assert_eq!(score, 90);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(weighted_ratio("deploy staging", "write changelog") < 60);
    }

    #[test]
    fn results_respect_cutoff() {
        let tasks = vec![task(1, "fix login bug"), task(2, "completely unrelated")];
        let matches = find_similar("fix login", &tasks, 5, 60);
        assert!(matches.iter().all(|(_, score)| *score >= 60));
        assert!(matches.iter().all(|(t, _)| t.id != TaskId(2)));
    }

    #[test]
    fn results_respect_limit() {
        let tasks: Vec<Task> = (0..10).map(|i| task(i, "fix bug")).collect();
        let matches = find_similar("fix bug", &tasks, 5, 60);
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn results_sorted_descending() {
        let tasks = vec![
            task(1, "fix bug nightly build"),
            task(2, "fix bug"),
            task(3, "fix bugs"),
        ];
        let matches = find_similar("fix bug", &tasks, 5, 0);
        let scores: Vec<u8> = matches.iter().map(|(_, s)| *s).collect();
        let mut sorted = scores.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(scores, sorted);
        assert_eq!(matches[0].1, 100);
    }

    #[test]
    fn ties_keep_input_order() {
        let tasks = vec![task(10, "fix bug"), task(20, "fix bug")];
        let matches = find_similar("fix bug", &tasks, 5, 60);
        assert_eq!(matches[0].0.id, TaskId(10));
        assert_eq!(matches[1].0.id, TaskId(20));
    }

    #[test]
    fn duplicate_titles_keep_their_own_rows() {
        // Same title, different tasks: both must come back as distinct
        // records, not one collapsed entry.
        let tasks = vec![task(1, "weekly report"), task(2, "weekly report")];
        let matches = find_similar("weekly report", &tasks, 5, 60);
        assert_eq!(matches.len(), 2);
        let ids: Vec<TaskId> = matches.iter().map(|(t, _)| t.id).collect();
        assert!(ids.contains(&TaskId(1)));
        assert!(ids.contains(&TaskId(2)));
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        assert!(find_similar("anything", &[], 5, 60).is_empty());
    }
}
