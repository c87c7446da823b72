// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the tokenizer that belongs to the pretrained encoder.
//
// The encoder is identified by `model_name`, a directory laid
// out like a HuggingFace checkpoint:
//
//   models/codebert-base/
//     tokenizer.json   ← required
//     config.json      ← optional encoder architecture
//     model.bin        ← optional pretrained weights
//
// Special token ids are looked up by name so both RoBERTa style
// (<s>, </s>, <pad>) and BERT style ([CLS], [SEP], [PAD])
// vocabularies work.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Ids of the tokens that frame and pad every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
}

impl SpecialTokens {
    /// Resolve special token ids from the tokenizer vocabulary.
    pub fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self> {
        let lookup = |names: &[&str]| -> Result<u32> {
            names
                .iter()
                .find_map(|name| tokenizer.token_to_id(name))
                .ok_or_else(|| anyhow!("tokenizer has none of the tokens {:?}", names))
        };
        Ok(Self {
            cls: lookup(&["<s>", "[CLS]"])?,
            sep: lookup(&["</s>", "[SEP]"])?,
            pad: lookup(&["<pad>", "[PAD]"])?,
        })
    }
}

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// Load `tokenizer.json` from the model directory.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join(TOKENIZER_FILE);
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })?;
        tracing::info!(
            "Loaded tokenizer from '{}' (vocab size {})",
            path.display(),
            tokenizer.get_vocab_size(true)
        );
        Ok(tokenizer)
    }
}

/// Write a small word-level tokenizer with BERT special tokens.
#[cfg(test)]
pub fn write_word_level(dir: &Path, words: &[&str]) -> Result<Tokenizer> {
    write_tokenizer(dir, words, true)
}

/// Like `write_word_level`, but unknown words fail to encode.
#[cfg(test)]
pub fn write_word_level_without_unk(dir: &Path, words: &[&str]) -> Result<Tokenizer> {
    write_tokenizer(dir, words, false)
}

#[cfg(test)]
fn write_tokenizer(dir: &Path, words: &[&str], with_unk: bool) -> Result<Tokenizer> {
    let mut vocab = serde_json::json!({
        "[PAD]": 0,
        "[CLS]": 2,
        "[SEP]": 3,
    });
    if with_unk {
        vocab["[UNK]"] = serde_json::json!(1);
    }
    let mut next_id = 4usize;
    for word in words {
        if vocab.get(*word).is_none() {
            vocab[*word] = serde_json::json!(next_id);
            next_id += 1;
        }
    }

    let special = |id: u32, content: &str| {
        serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        })
    };
    let mut added = vec![special(0, "[PAD]"), special(2, "[CLS]"), special(3, "[SEP]")];
    if with_unk {
        added.push(special(1, "[UNK]"));
    }
    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added,
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
    });

    std::fs::create_dir_all(dir)?;
    let path = dir.join(TOKENIZER_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)?;
    TokenizerStore::new(dir).load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_tokenizer_and_special_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer = write_word_level(dir.path(), &["hello", "world"]).unwrap();

        let special = SpecialTokens::from_tokenizer(&tokenizer).unwrap();
        assert_eq!(special, SpecialTokens { cls: 2, sep: 3, pad: 0 });

        let enc = tokenizer.encode("Hello world", false).unwrap();
        assert_eq!(enc.get_ids(), &[4, 5]);
    }

    #[test]
    fn unknown_word_without_unk_token_fails_to_encode() {
        let dir = tempfile::tempdir().unwrap();
        let tokenizer = write_word_level_without_unk(dir.path(), &["hello"]).unwrap();
        assert!(tokenizer.encode("hello", false).is_ok());
        assert!(tokenizer.encode("zzz", false).is_err());
    }

    #[test]
    fn missing_tokenizer_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load().is_err());
    }
}
