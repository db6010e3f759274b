use offwiki_config::SearchConfig;
use offwiki_index::{OffsetIndex, fold, is_separator};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::instrument;

/// How closely a title matches a query. Results are ordered by rank first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    /// The title equals the query.
    Exact,
    /// The title starts with the query.
    Prefix,
    /// A later word of the title starts with the query.
    Word,
    /// The query appears anywhere else in the title.
    Substring,
}
impl Rank {
    /// Rank a folded title against a folded query.
    pub fn of(title: &str, query: &str) -> Option<Self> {
        if title == query {
            Some(Self::Exact)
        } else if title.starts_with(query) {
            Some(Self::Prefix)
        } else if starts_word(title, query) {
            Some(Self::Word)
        } else if title.contains(query) {
            Some(Self::Substring)
        } else {
            None
        }
    }
}

/// Whether `query` starts right after a separator somewhere in `title`.
fn starts_word(title: &str, query: &str) -> bool {
    title
        .char_indices()
        .filter(|&(_, c)| is_separator(c))
        .any(|(at, c)| title[at + c.len_utf8()..].starts_with(query))
}

/// Case-insensitive title search over whatever the index holds right now.
///
/// Results are ordered by [`Rank`], then by folded title, then by title, so
/// the same query against the same index state always returns the same list.
/// Titles in excluded namespaces never appear.
pub struct SearchService {
    index: Arc<OffsetIndex>,
    min_query_length: usize,
    max_results: usize,
    /// Folded `namespace:` prefixes.
    excluded: Vec<String>,
}
impl SearchService {
    pub fn new(index: Arc<OffsetIndex>, config: &SearchConfig) -> Self {
        let excluded = config.excluded_namespaces.iter().map(|ns| format!("{}:", fold(ns.trim()))).collect();
        Self { index, min_query_length: config.min_query_length, max_results: config.max_results, excluded }
    }

    /// Up to `limit` titles matching `query`, best first.
    ///
    /// `limit` is capped at the configured maximum. Queries shorter than the
    /// configured minimum (in characters, after trimming) return nothing.
    /// Exact and prefix matches come from an ordered range of the index and
    /// word matches from its word index. Only substring matches need a scan of
    /// every title, which stops as soon as the limit is reached.
    #[instrument(skip(self), fields(results))]
    pub fn search(&self, query: &str, limit: usize) -> Vec<Arc<str>> {
        let query = query.trim();
        let limit = limit.min(self.max_results);
        if limit == 0 || query.chars().count() < self.min_query_length {
            return Vec::new();
        }
        let folded = fold(query);
        let mut results = Vec::with_capacity(limit);
        // Exact matches sort first within the prefix range.
        self.index.scan_prefix(query, |key, title| {
            if !self.is_excluded(key) {
                results.push(Arc::clone(title));
            }
            if results.len() == limit { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        });
        if results.len() < limit {
            let words = self.word_matches(&folded, limit - results.len());
            results.extend(words);
        }
        if results.len() < limit {
            let substrings = self.scan_for(&folded, Rank::Substring, limit - results.len());
            results.extend(substrings);
        }
        tracing::Span::current().record("results", results.len());
        results
    }

    /// Up to `limit` titles ranked [`Rank::Word`], in result order.
    fn word_matches(&self, folded: &str, limit: usize) -> Vec<Arc<str>> {
        // Any title with a word starting with the query has a word starting
        // with the query's first word.
        let Some(first) = folded.split(is_separator).next().filter(|word| !word.is_empty()) else {
            return self.scan_for(folded, Rank::Word, limit);
        };
        let mut found: Vec<(String, Arc<str>)> = self
            .index
            .titles_with_word(first)
            .into_iter()
            .map(|title| (fold(&title), title))
            .filter(|(key, _)| !self.is_excluded(key) && Rank::of(key, folded) == Some(Rank::Word))
            .collect();
        found.sort();
        found.dedup();
        found.into_iter().take(limit).map(|(_, title)| title).collect()
    }

    /// Up to `limit` titles ranked `rank`, from a scan of every title.
    fn scan_for(&self, folded: &str, rank: Rank, limit: usize) -> Vec<Arc<str>> {
        let mut found = Vec::new();
        self.index.scan_titles(|key, title| {
            if !self.is_excluded(key) && Rank::of(key, folded) == Some(rank) {
                found.push(Arc::clone(title));
            }
            if found.len() == limit { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        });
        found
    }

    fn is_excluded(&self, folded: &str) -> bool {
        self.excluded.iter().any(|prefix| folded.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::index_of;
    use rstest::rstest;

    fn service(titles: &[&str]) -> SearchService {
        SearchService::new(index_of(titles), &SearchConfig::default())
    }

    fn search(service: &SearchService, query: &str, limit: usize) -> Vec<String> {
        service.search(query, limit).iter().map(|t| t.to_string()).collect()
    }

    #[rstest]
    #[case("cat", "cat", Some(Rank::Exact))]
    #[case("catalonia", "cat", Some(Rank::Prefix))]
    #[case("black cat", "cat", Some(Rank::Word))]
    #[case("felis (cat)", "cat", Some(Rank::Word))]
    #[case("bobcat", "cat", Some(Rank::Substring))]
    #[case("dog", "cat", None)]
    // The second occurrence starts a word even though the first does not.
    #[case("bobcat catalogue", "cat", Some(Rank::Word))]
    fn test_rank(#[case] title: &str, #[case] query: &str, #[case] expected: Option<Rank>) {
        assert_eq!(Rank::of(title, query), expected);
    }

    #[test]
    fn test_results_ordered_by_rank_then_title() {
        let service = service(&["Bobcat", "Black cat", "Catalonia", "Cat", "cat", "Dog", "Alley cat"]);
        assert_eq!(search(&service, "CAT", 10), ["Cat", "cat", "Catalonia", "Alley cat", "Black cat", "Bobcat"]);
    }

    #[test]
    fn test_limit_prefers_better_ranks() {
        let service = service(&["Bobcat", "Black cat", "Catalonia", "Cat"]);
        assert_eq!(search(&service, "cat", 2), ["Cat", "Catalonia"]);
        assert_eq!(search(&service, "cat", 3), ["Cat", "Catalonia", "Black cat"]);
        assert!(search(&service, "cat", 0).is_empty());
    }

    #[test]
    fn test_limit_capped_at_max_results() {
        let titles: Vec<String> = (0..80).map(|i| format!("Cat {i:02}")).collect();
        let titles: Vec<&str> = titles.iter().map(String::as_str).collect();
        assert_eq!(service(&titles).search("cat", 1_000).len(), 50);
    }

    #[rstest]
    #[case("c")]
    #[case(" c ")]
    #[case("")]
    fn test_short_queries_return_nothing(#[case] query: &str) {
        assert!(service(&["Cat", "Cow"]).search(query, 10).is_empty());
    }

    #[test]
    fn test_query_length_counts_characters() {
        let service = service(&["Éa", "Ébène"]);
        assert_eq!(search(&service, "é", 10), Vec::<String>::new());
        assert_eq!(search(&service, "éb", 10), ["Ébène"]);
    }

    #[test]
    fn test_word_matches_span_words() {
        let service = service(&["Hopeful", "Star Wars: A New Hope", "New Hope Church", "A New Hopeless Case"]);
        assert_eq!(search(&service, "new hope", 10), ["New Hope Church", "A New Hopeless Case", "Star Wars: A New Hope"]);
    }

    #[test]
    fn test_query_starting_with_separator() {
        let service = service(&["Cat", "Felis (cat)", "Bob(cat"]);
        assert_eq!(search(&service, "(cat", 10), ["Felis (cat)", "Bob(cat"]);
    }

    #[test]
    fn test_title_matching_several_words_listed_once() {
        let service = service(&["Wild cat", "Black cat and cattle"]);
        assert_eq!(search(&service, "cat", 10), ["Black cat and cattle", "Wild cat"]);
        assert_eq!(search(&service, "catt", 10), ["Black cat and cattle"]);
    }

    #[test]
    fn test_excluded_namespaces() {
        let service = service(&["Template:Cat", "Talk:Cat", "Cat", "User:Catherine", "Category:Cats"]);
        assert_eq!(search(&service, "cat", 10), ["Cat", "Category:Cats"]);
    }
}
