// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Resolves the tokenizer used to train a classifier:
//
//   1. {checkpoint_dir}/tokenizer.json       (local file)
//   2. model hub, e.g. google-bert/bert-base-uncased
//   3. word-level vocabulary built from the training corpus
//
// The first source that works wins and is cached for the rest
// of the process. Inference never comes through here: a loaded
// checkpoint carries its own tokenizer.
//
// The corpus fallback writes a HuggingFace-format WordLevel
// tokenizer JSON with BERT's special-token IDs, so the same
// [CLS]/[SEP]/[PAD] framing works with either source.
//
// Reference: Devlin et al. (2019) BERT, WordPiece vocabulary

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Hub repository the tokenizer is fetched from when no local file exists.
pub const DEFAULT_HUB_TOKENIZER: &str = "google-bert/bert-base-uncased";

/// Vocabulary cap for the corpus fallback (BERT-base size).
pub const CORPUS_VOCAB_SIZE: usize = 30522;

static RESOLVED: Mutex<Option<(PathBuf, Tokenizer)>> = Mutex::new(None);

pub struct TokenizerStore {
    dir:      PathBuf,
    hub_repo: Option<String>,
    hf_token: Option<String>,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), hub_repo: None, hf_token: None }
    }

    /// Enable the hub source. An empty repo keeps it disabled.
    pub fn with_hub(mut self, repo: impl Into<String>, token: Option<String>) -> Self {
        let repo = repo.into();
        self.hub_repo = (!repo.trim().is_empty()).then_some(repo);
        self.hf_token = token;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Local file, then hub, then a vocabulary built from `corpus`.
    pub fn resolve(&self, corpus: &[String]) -> Result<Tokenizer> {
        if let Some(tokenizer) = self.cached() {
            tracing::debug!("Tokenizer cache hit for '{}'", self.dir.display());
            return Ok(tokenizer);
        }

        let tokenizer = if self.path().is_file() {
            tracing::info!("Loading tokenizer from '{}'", self.path().display());
            self.load()?
        } else {
            match self.hub_repo.as_deref().map(|repo| self.fetch_from_hub(repo)) {
                Some(Ok(tokenizer)) => tokenizer,
                Some(Err(e)) => {
                    tracing::warn!("Hub tokenizer unavailable ({e:#}); building one from the corpus");
                    self.build_and_save(corpus, CORPUS_VOCAB_SIZE)?
                }
                None => self.build_and_save(corpus, CORPUS_VOCAB_SIZE)?,
            }
        };

        if let Ok(mut slot) = RESOLVED.lock() {
            *slot = Some((self.dir.clone(), tokenizer.clone()));
        }
        Ok(tokenizer)
    }

    fn cached(&self) -> Option<Tokenizer> {
        let slot = RESOLVED.lock().ok()?;
        slot.as_ref()
            .filter(|(dir, _)| dir == &self.dir)
            .map(|(_, tokenizer)| tokenizer.clone())
    }

    pub fn load(&self) -> Result<Tokenizer> {
        load_file(&self.path())
    }

    fn fetch_from_hub(&self, repo: &str) -> Result<Tokenizer> {
        use hf_hub::api::sync::ApiBuilder;

        tracing::info!("Fetching tokenizer from hub repo '{}'", repo);
        let api = ApiBuilder::new()
            .with_token(self.hf_token.clone())
            .with_progress(false)
            .build()
            .context("Cannot initialise the hub client")?;
        let cached = api
            .model(repo.to_string())
            .get(TOKENIZER_FILE)
            .with_context(|| format!("Cannot fetch '{TOKENIZER_FILE}' from '{repo}'"))?;
        load_file(&cached)
    }

    /// Build a word-level tokenizer from `texts` and write it to the store directory.
    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let json = word_level_json(texts, vocab_size);
        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;

        tracing::info!("Built corpus tokenizer, saved to '{}'", path.display());
        load_file(&path)
    }

    /// In-memory variant of the corpus fallback.
    pub fn build_word_level(texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        let json = word_level_json(texts, vocab_size);
        Tokenizer::from_str(&json.to_string())
            .map_err(|e| anyhow::anyhow!("Cannot build word-level tokenizer: {e}"))
    }

    /// Rows the token embedding needs: highest token ID plus one.
    pub fn embedding_size(tokenizer: &Tokenizer) -> usize {
        tokenizer
            .get_vocab(true)
            .values()
            .max()
            .map(|&id| id as usize + 1)
            .unwrap_or(1)
    }
}

fn load_file(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

/// HuggingFace tokenizer JSON for a lowercase word-level vocabulary.
/// Words are ranked by frequency, ties broken alphabetically.
fn word_level_json(texts: &[String], vocab_size: usize) -> serde_json::Value {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in text.split_whitespace() {
            let w = word.to_lowercase();
            let w = w.trim_matches(|c: char| !c.is_alphanumeric());
            if !w.is_empty() {
                *freq.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size.saturating_sub(5));

    // BERT special-token IDs
    let mut vocab = serde_json::json!({
        "[PAD]":  0,
        "[UNK]":  100,
        "[CLS]":  101,
        "[SEP]":  102,
        "[MASK]": 103,
    });
    let mut next_id = 104usize;
    for (word, _) in &words {
        if vocab.get(word).is_none() {
            vocab[word] = serde_json::json!(next_id);
            next_id += 1;
        }
    }

    let special = |id: u32, content: &str| serde_json::json!({
        "id": id, "content": content, "single_word": false, "lstrip": false,
        "rstrip": false, "normalized": false, "special": true
    });

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            special(0, "[PAD]"),
            special(100, "[UNK]"),
            special(101, "[CLS]"),
            special(102, "[SEP]"),
            special(103, "[MASK]"),
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoding::{SpecialTokens, TextEncoding};

    fn corpus() -> Vec<String> {
        vec![
            "I feel so happy today".to_string(),
            "happy happy joy".to_string(),
            "I am worried".to_string(),
        ]
    }

    #[test]
    fn test_word_level_uses_bert_special_ids() {
        let tokenizer = TokenizerStore::build_word_level(&corpus(), 100).unwrap();
        let special = SpecialTokens::of(&tokenizer);
        assert_eq!(special, SpecialTokens { pad: 0, cls: 101, sep: 102 });
        // most frequent word gets the first free id
        assert_eq!(tokenizer.token_to_id("happy"), Some(104));
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let tokenizer = TokenizerStore::build_word_level(&corpus(), 100).unwrap();
        let enc = TextEncoding::encode(&tokenizer, "happy zebra", 6).unwrap();
        assert_eq!(enc.input_ids, vec![101, 104, 100, 102, 0, 0]);
    }

    #[test]
    fn test_embedding_size_covers_highest_id() {
        let tokenizer = TokenizerStore::build_word_level(&corpus(), 100).unwrap();
        let max_id = tokenizer.get_vocab(true).values().copied().max().unwrap();
        assert_eq!(TokenizerStore::embedding_size(&tokenizer), max_id as usize + 1);
    }

    #[test]
    fn test_resolve_builds_then_reuses_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let built = store.resolve(&corpus()).unwrap();
        assert!(store.path().is_file());

        // a fresh store over the same directory reads the file back
        let reloaded = TokenizerStore::new(dir.path()).load().unwrap();
        assert_eq!(built.token_to_id("worried"), reloaded.token_to_id("worried"));
    }
}
