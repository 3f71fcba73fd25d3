//! The payload corpus: a quote per successful exchange.

use rand::Rng;

const CORPUS: &str = include_str!("quotes.txt");

/// Serves random quotes from an embedded, line-delimited corpus.
///
/// Safe for concurrent use; every call draws from the thread-local RNG.
#[derive(Debug, Clone)]
pub struct QuoteBook {
    quotes: Vec<&'static str>,
}

impl QuoteBook {
    /// Build from the embedded corpus, one quote per non-empty line.
    pub fn embedded() -> Self {
        Self::from_corpus(CORPUS)
    }

    fn from_corpus(corpus: &'static str) -> Self {
        let quotes = corpus
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self { quotes }
    }

    /// Next payload string.
    pub fn next(&self) -> &'static str {
        if self.quotes.is_empty() {
            return "No quotes available.";
        }
        let index = rand::thread_rng().gen_range(0..self.quotes.len());
        self.quotes[index]
    }

    /// Number of quotes in the corpus.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_corpus_is_populated() {
        let book = QuoteBook::embedded();
        assert!(book.len() >= 20);
    }

    #[test]
    fn test_next_draws_from_the_corpus() {
        let book = QuoteBook::embedded();
        for _ in 0..50 {
            let quote = book.next();
            assert!(book.quotes.contains(&quote));
        }
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let book = QuoteBook::from_corpus("one\n\n  \ntwo\n");
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_empty_corpus_falls_back() {
        let book = QuoteBook::from_corpus("");
        assert!(book.is_empty());
        assert_eq!(book.next(), "No quotes available.");
    }
}
