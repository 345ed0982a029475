// ============================================================
// Layer 4 — Text Encoding
// ============================================================
// Turns one piece of text into a fixed-length model input:
//
//   [CLS] tok tok tok ... [SEP] [PAD] [PAD] ...
//   └──────────── window (128 by default) ──────────┘
//
//   input_ids      — token IDs, padded with [PAD]
//   attention_mask — 1 for real tokens, 0 for padding
//
// Position 0 ([CLS]) is the summary position the classifier
// heads read from. Text longer than the window is truncated
// so that [SEP] always survives.
//
// Reference: Devlin et al. (2019) BERT, §3 input representation

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::data::preprocessor::Preprocessor;

/// Default sequence window
pub const ENCODING_WINDOW: usize = 128;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";

/// IDs of the framing tokens, looked up once per tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: u32,
    pub cls: u32,
    pub sep: u32,
}

impl SpecialTokens {
    /// BERT conventions when the tokenizer does not define a token.
    pub fn of(tokenizer: &Tokenizer) -> Self {
        Self {
            pad: tokenizer.token_to_id(PAD_TOKEN).unwrap_or(0),
            cls: tokenizer.token_to_id(CLS_TOKEN).unwrap_or(101),
            sep: tokenizer.token_to_id(SEP_TOKEN).unwrap_or(102),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEncoding {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl TextEncoding {
    /// Tokenise, frame and pad `text` to exactly `window` positions.
    pub fn encode(tokenizer: &Tokenizer, text: &str, window: usize) -> Result<Self> {
        anyhow::ensure!(window >= 2, "encoding window must hold [CLS] and [SEP]");

        let clean    = Preprocessor::new().clean(text);
        let encoding = tokenizer
            .encode(clean.as_str(), false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        Ok(Self::frame(encoding.get_ids(), SpecialTokens::of(tokenizer), window))
    }

    /// Frame raw token IDs as `[CLS] ids [SEP]` and pad to `window`.
    pub fn frame(ids: &[u32], special: SpecialTokens, window: usize) -> Self {
        let body = ids.len().min(window.saturating_sub(2));

        let mut input_ids = Vec::with_capacity(window);
        input_ids.push(special.cls);
        input_ids.extend_from_slice(&ids[..body]);
        input_ids.push(special.sep);

        let mut attention_mask = vec![1u32; input_ids.len()];

        input_ids.resize(window, special.pad);
        attention_mask.resize(window, 0);

        Self { input_ids, attention_mask }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions.
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: SpecialTokens = SpecialTokens { pad: 0, cls: 101, sep: 102 };

    #[test]
    fn test_short_text_is_padded() {
        let enc = TextEncoding::frame(&[7, 8, 9], SPECIAL, 8);
        assert_eq!(enc.input_ids, vec![101, 7, 8, 9, 102, 0, 0, 0]);
        assert_eq!(enc.attention_mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(enc.real_tokens(), 5);
    }

    #[test]
    fn test_long_text_keeps_sep() {
        let ids: Vec<u32> = (1..=20).collect();
        let enc = TextEncoding::frame(&ids, SPECIAL, 6);
        assert_eq!(enc.input_ids, vec![101, 1, 2, 3, 4, 102]);
        assert_eq!(enc.attention_mask, vec![1; 6]);
    }

    #[test]
    fn test_empty_text_is_cls_sep() {
        let enc = TextEncoding::frame(&[], SPECIAL, ENCODING_WINDOW);
        assert_eq!(enc.len(), ENCODING_WINDOW);
        assert_eq!(&enc.input_ids[..3], &[101, 102, 0]);
        assert_eq!(enc.real_tokens(), 2);
    }
}
