//! External dictionary lookups.
//!
//! Word correctness is decided by the Merriam-Webster collegiate API. The
//! response body is either a list of suggestion strings (the word does not
//! exist) or a list of entry objects; an entry counts as a match when its
//! `meta.id` prefix (before any `:` index) equals the queried word and its
//! functional label is a plain part of speech. Up to three definitions are
//! retained for display.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use serde::Deserialize;
use thiserror::Error;

use crate::config::DictionaryConfig;
use crate::domain::{Definition, Word};

const ACCEPTED_FUNCTIONAL_LABELS: [&str; 4] = ["noun", "verb", "adjective", "adverb"];

const MAX_DEFINITIONS: usize = 3;

#[derive(Debug, Error)]
pub enum DictionaryError {
    /// 5xx from the dictionary service; transient.
    #[error("dictionary service is unavailable (status {status})")]
    Unavailable { status: u16 },
    #[error("dictionary request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Seam between the game engine and the dictionary service.
#[async_trait]
pub trait Dictionary: Send + Sync {
    /// Look up a lowercased word. An `Ok` result is definitive; an `Err`
    /// means the service could not answer and the caller decides the policy.
    async fn lookup(&self, word: &str) -> Result<Word, DictionaryError>;
}

/// Merriam-Webster client with a bounded cache over definitive results.
pub struct MerriamWebsterClient {
    http: reqwest::Client,
    url_template: String,
    api_key: String,
    cache: Mutex<LruCache<String, Word>>,
}

impl MerriamWebsterClient {
    pub fn new(config: &DictionaryConfig) -> Result<Self, DictionaryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            http,
            url_template: config.api_url.clone(),
            api_key: config.api_key.clone(),
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn request_url(&self, word: &str) -> String {
        self.url_template
            .replace("{word}", word)
            .replace("{api_key}", &self.api_key)
    }

    fn cached(&self, word: &str) -> Option<Word> {
        self.lock_cache().get(word).cloned()
    }

    fn remember(&self, word: Word) {
        self.lock_cache().put(word.content.clone(), word);
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, Word>> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Dictionary for MerriamWebsterClient {
    async fn lookup(&self, word: &str) -> Result<Word, DictionaryError> {
        if let Some(hit) = self.cached(word) {
            return Ok(hit);
        }

        let response = self.http.get(self.request_url(word)).send().await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(DictionaryError::Unavailable {
                status: status.as_u16(),
            });
        }

        let body: Vec<serde_json::Value> = response.json().await?;
        let result = parse_lookup(word, &body);
        self.remember(result.clone());
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct MwEntry {
    meta: MwMeta,
    #[serde(default)]
    fl: Option<String>,
    #[serde(default)]
    shortdef: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MwMeta {
    id: String,
}

/// Interpret a Merriam-Webster response body for `word`.
fn parse_lookup(word: &str, body: &[serde_json::Value]) -> Word {
    // A list of bare strings is the API's "did you mean" answer.
    if body.iter().any(serde_json::Value::is_string) {
        return Word::incorrect(word.to_string());
    }

    let mut definitions: Vec<Definition> = Vec::new();
    for value in body {
        if definitions.len() == MAX_DEFINITIONS {
            break;
        }
        let Ok(entry) = serde_json::from_value::<MwEntry>(value.clone()) else {
            continue;
        };
        let Some(label) = entry.fl else {
            continue;
        };
        if !ACCEPTED_FUNCTIONAL_LABELS.contains(&label.as_str()) {
            continue;
        }
        // The API also returns near matches ("god" -> "god-awful") and
        // indexes homographs with a colon ("god:1").
        let exact = entry
            .meta
            .id
            .to_lowercase()
            .split(':')
            .next()
            .is_some_and(|prefix| prefix == word);
        if !exact {
            continue;
        }

        let shortdefs = entry
            .shortdef
            .iter()
            .enumerate()
            .map(|(i, shortdef)| {
                if i > 0 {
                    format!("- {shortdef}")
                } else {
                    shortdef.clone()
                }
            })
            .collect();
        definitions.push((label, shortdefs));
    }

    if definitions.is_empty() {
        Word::incorrect(word.to_string())
    } else {
        Word {
            content: word.to_string(),
            is_correct: true,
            definitions: Some(definitions),
        }
    }
}

/// Dictionary backed by a fixed word list. Useful for tests and offline
/// runs; every known word resolves without definitions.
#[derive(Debug, Default)]
pub struct WordListDictionary {
    words: std::collections::HashSet<String>,
}

impl WordListDictionary {
    #[must_use]
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(|word| word.into().to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl Dictionary for WordListDictionary {
    async fn lookup(&self, word: &str) -> Result<Word, DictionaryError> {
        if self.words.contains(word) {
            Ok(Word {
                content: word.to_string(),
                is_correct: true,
                definitions: None,
            })
        } else {
            Ok(Word::incorrect(word.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_suggestion_list_means_not_found() {
        let body = vec![json!("apple"), json!("appel")];
        let word = parse_lookup("aple", &body);
        assert!(!word.is_correct);
        assert_eq!(word.content, "aple");
    }

    #[test]
    fn test_exact_match_with_accepted_label() {
        let body = vec![json!({
            "meta": {"id": "apple"},
            "fl": "noun",
            "shortdef": ["a fruit", "a tree"],
        })];
        let word = parse_lookup("apple", &body);
        assert!(word.is_correct);
        let definitions = word.definitions.unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].0, "noun");
        // Subsequent shortdefs carry a dash prefix.
        assert_eq!(definitions[0].1, vec!["a fruit", "- a tree"]);
    }

    #[test]
    fn test_homograph_colon_ids_match() {
        let body = vec![
            json!({"meta": {"id": "God:1"}, "fl": "noun", "shortdef": ["deity"]}),
            json!({"meta": {"id": "god:2"}, "fl": "verb", "shortdef": ["to deify"]}),
        ];
        let word = parse_lookup("god", &body);
        assert!(word.is_correct);
        assert_eq!(word.definitions.unwrap().len(), 2);
    }

    #[test]
    fn test_near_matches_and_odd_labels_rejected() {
        let body = vec![
            json!({"meta": {"id": "god-awful"}, "fl": "adjective", "shortdef": ["very bad"]}),
            json!({"meta": {"id": "god"}, "fl": "abbreviation", "shortdef": ["..."]}),
            json!({"meta": {"id": "god"}, "shortdef": ["no label"]}),
        ];
        let word = parse_lookup("god", &body);
        assert!(!word.is_correct);
        assert!(word.definitions.is_none());
    }

    #[test]
    fn test_definitions_capped_at_three() {
        let entry = json!({"meta": {"id": "run"}, "fl": "verb", "shortdef": ["move fast"]});
        let body = vec![entry.clone(), entry.clone(), entry.clone(), entry];
        let word = parse_lookup("run", &body);
        assert_eq!(word.definitions.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_word_list_dictionary_is_case_insensitive_on_seed() {
        let dictionary = WordListDictionary::new(["Apple", "tiger"]);
        assert!(dictionary.lookup("apple").await.unwrap().is_correct);
        assert!(!dictionary.lookup("zebra").await.unwrap().is_correct);
    }
}
