//! TF-IDF Vectorizer
//!
//! Converts prompt text into dense numeric vectors comparable via cosine
//! similarity. Designed for short natural-language instructions mixing
//! alphabetic and ideographic (CJK) scripts, with a vocabulary capped at a
//! few hundred features.
//!
//! # Tokenization
//!
//! Text is lowercased and a fixed stop-token list is removed by literal
//! substring replacement (in list order) before tokenization. The remainder
//! is scanned left to right: each CJK ideograph becomes its own token, while
//! maximal runs of alphanumeric characters plus the apostrophe become one
//! word token. Everything else separates tokens and is discarded.
//!
//! N-grams over a window containing any ideograph are joined with no
//! separator; purely alphabetic windows are joined with a single space.
//! This keeps CJK n-grams compact and Latin n-grams readable, and cached
//! prompts depend on the exact joining rule, so it must not change.
//!
//! # Example
//!
//! ```
//! use semcache::vectorizer::{TfIdfVectorizer, VectorizerConfig};
//!
//! let mut vectorizer = TfIdfVectorizer::new(VectorizerConfig::default());
//! let corpus = vec!["fill the search box", "click the submit button"];
//! let vectors = vectorizer.fit_transform(&corpus);
//! assert_eq!(vectors.len(), 2);
//! ```

use std::collections::{HashMap, HashSet};

/// Stop tokens removed before tokenization, in removal order.
///
/// Order matters: "一" is removed before "一个", so any "一个" occurrence
/// has already lost its first character by the time the longer token is
/// scanned. Fitted vocabularies depend on this exact sequence.
const STOP_TOKENS: &[&str] = &[
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个",
];

/// Check whether a character is a CJK unified ideograph
#[inline]
fn is_ideographic(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Configuration for the TF-IDF vectorizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorizerConfig {
    /// Closed range of n-gram orders to extract, e.g. `(1, 2)` for
    /// unigrams and bigrams
    pub ngram_range: (usize, usize),
    /// Maximum vocabulary size
    pub max_features: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            ngram_range: (1, 2),
            max_features: 500,
        }
    }
}

impl VectorizerConfig {
    /// Set the n-gram order range (inclusive on both ends)
    #[must_use]
    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.ngram_range = (min_n, max_n);
        self
    }

    /// Set the maximum vocabulary size
    #[must_use]
    pub fn with_max_features(mut self, max: usize) -> Self {
        self.max_features = max;
        self
    }
}

/// TF-IDF vectorizer over a small prompt corpus
///
/// `fit` builds the vocabulary and IDF table from the full corpus;
/// `transform` maps texts onto that fixed vocabulary. Both are re-run in
/// full whenever the corpus changes, so the corpus-relative statistics stay
/// globally consistent.
#[derive(Debug, Clone, Default)]
pub struct TfIdfVectorizer {
    config: VectorizerConfig,
    /// N-gram to dense feature index; index equals the n-gram's rank by
    /// descending document frequency at fit time
    vocabulary: HashMap<String, usize>,
    /// Smoothed inverse document frequency per vocabulary n-gram
    idf: HashMap<String, f32>,
}

impl TfIdfVectorizer {
    /// Create a new, unfit vectorizer
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            vocabulary: HashMap::new(),
            idf: HashMap::new(),
        }
    }

    /// Number of features in the fitted vocabulary
    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Lowercase and strip stop tokens by literal substring removal
    fn preprocess(&self, text: &str) -> String {
        let mut text = text.to_lowercase();
        for stop in STOP_TOKENS {
            text = text.replace(stop, "");
        }
        text.trim().to_string()
    }

    /// Split preprocessed text into tokens: one token per ideograph,
    /// one token per maximal alphanumeric-or-apostrophe run
    fn tokenize(text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut word = String::new();

        for c in text.chars() {
            if is_ideographic(c) {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                tokens.push(c.to_string());
            } else if c.is_alphanumeric() || c == '\'' {
                word.push(c);
            } else if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }

        tokens
    }

    /// Generate order-`n` n-grams for a text
    fn generate_ngrams(&self, text: &str, n: usize) -> Vec<String> {
        let processed = self.preprocess(text);
        let tokens = Self::tokenize(&processed);

        if n == 0 || tokens.len() < n {
            return Vec::new();
        }

        tokens
            .windows(n)
            .map(|window| {
                let has_ideograph = window
                    .iter()
                    .any(|t| t.chars().any(is_ideographic));
                // CJK n-grams stay compact; Latin n-grams keep word breaks
                if has_ideograph {
                    window.concat()
                } else {
                    window.join(" ")
                }
            })
            .filter(|ngram| !ngram.trim().is_empty())
            .collect()
    }

    /// Generate all n-grams for a text across the configured order range
    fn all_ngrams(&self, text: &str) -> Vec<String> {
        let (min_n, max_n) = self.config.ngram_range;
        let mut ngrams = Vec::new();
        for n in min_n..=max_n {
            ngrams.extend(self.generate_ngrams(text, n));
        }
        ngrams
    }

    /// Build the vocabulary and IDF table from a corpus
    ///
    /// The vocabulary keeps at most `max_features` n-grams, ranked by
    /// descending document frequency. Ties are broken by first-seen order
    /// during corpus traversal, which makes the assigned indices
    /// deterministic for a given corpus.
    ///
    /// An empty corpus yields an empty vocabulary; this is not an error,
    /// it just means nothing can match.
    pub fn fit<S: AsRef<str>>(&mut self, texts: &[S]) {
        self.vocabulary.clear();
        self.idf.clear();

        if texts.is_empty() {
            return;
        }

        // Document frequency, plus first-seen rank for the tie-break
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut seen_counter = 0usize;

        for text in texts {
            let ngrams = self.all_ngrams(text.as_ref());
            // Walk per-document n-grams in generation order so first-seen
            // ranks are stable; count each n-gram once per document
            let mut counted: HashSet<&String> = HashSet::new();
            for ngram in &ngrams {
                if !counted.insert(ngram) {
                    continue;
                }
                *doc_freq.entry(ngram.clone()).or_insert(0) += 1;
                first_seen.entry(ngram.clone()).or_insert_with(|| {
                    let rank = seen_counter;
                    seen_counter += 1;
                    rank
                });
            }
        }

        let mut ranked: Vec<(&String, usize)> = doc_freq
            .iter()
            .map(|(ngram, &df)| (ngram, df))
            .collect();
        ranked.sort_by_key(|(ngram, df)| (std::cmp::Reverse(*df), first_seen[*ngram]));
        ranked.truncate(self.config.max_features);

        let doc_count = texts.len();
        for (idx, (ngram, df)) in ranked.into_iter().enumerate() {
            // Smoothed IDF, strictly positive
            let idf = ((doc_count as f32 + 1.0) / (df as f32 + 1.0)).ln() + 1.0;
            self.vocabulary.insert(ngram.clone(), idx);
            self.idf.insert(ngram.clone(), idf);
        }
    }

    /// Transform texts into dense TF-IDF vectors using the fitted vocabulary
    ///
    /// Each output vector has length equal to the vocabulary size. Tokens
    /// outside the vocabulary contribute nothing; a text with no
    /// in-vocabulary tokens (or an unfit vectorizer) yields a zero vector.
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Vec<f32>> {
        let vocab_size = self.vocabulary.len();
        let mut vectors = Vec::with_capacity(texts.len());

        for text in texts {
            let mut vector = vec![0.0f32; vocab_size];
            let ngrams = self.all_ngrams(text.as_ref());

            if ngrams.is_empty() || vocab_size == 0 {
                vectors.push(vector);
                continue;
            }

            let mut term_freq: HashMap<&String, usize> = HashMap::new();
            for ngram in &ngrams {
                *term_freq.entry(ngram).or_insert(0) += 1;
            }

            for (ngram, count) in term_freq {
                if let Some(&idx) = self.vocabulary.get(ngram) {
                    // Sublinear TF scaling
                    let tf = 1.0 + (count as f32).ln();
                    vector[idx] = tf * self.idf[ngram];
                }
            }

            vectors.push(vector);
        }

        vectors
    }

    /// Fit on a corpus and return its vectors in one call
    pub fn fit_transform<S: AsRef<str>>(&mut self, texts: &[S]) -> Vec<Vec<f32>> {
        self.fit(texts);
        self.transform(texts)
    }
}
