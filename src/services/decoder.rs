use crate::types::DecodedText;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

const REPLACEMENT: char = '\u{FFFD}';
const BOM: char = '\u{FEFF}';

/// Share of replacement characters above which the UTF-8 reading is distrusted.
pub const GARBLED_RATIO: f64 = 0.01;

/// Two-candidate decoder: UTF-8 first, one legacy CJK encoding as fallback.
pub struct TextDecoder {
    fallback: Option<&'static Encoding>,
}

impl TextDecoder {
    /// Decoder with GBK as the fallback candidate.
    pub fn new() -> Self {
        Self::with_fallback_label("gbk")
    }

    /// Decoder whose fallback is looked up by WHATWG label. An unknown label
    /// leaves the decoder UTF-8 only.
    pub fn with_fallback_label(label: &str) -> Self {
        Self {
            fallback: Encoding::for_label(label.as_bytes()),
        }
    }

    pub fn utf8_only() -> Self {
        Self { fallback: None }
    }

    /// Never fails; the worst case keeps replacement characters in the text.
    pub fn decode(&self, bytes: &[u8]) -> DecodedText {
        let (utf8, _) = UTF_8.decode_with_bom_removal(bytes);
        let utf8_bad = count_replacements(&utf8);
        let length = utf8.chars().count().max(1);

        if (utf8_bad as f64) / (length as f64) > GARBLED_RATIO {
            if let Some(encoding) = self.fallback {
                let (legacy, _) = encoding.decode_without_bom_handling(bytes);
                let legacy_bad = count_replacements(&legacy);
                debug!(
                    "UTF-8 produced {} replacement characters, {} produced {}",
                    utf8_bad,
                    encoding.name(),
                    legacy_bad
                );
                if legacy_bad < utf8_bad {
                    return DecodedText {
                        text: legacy.trim_start_matches(BOM).to_string(),
                        encoding: encoding.name(),
                    };
                }
            }
        }

        DecodedText {
            text: utf8.trim_start_matches(BOM).to_string(),
            encoding: UTF_8.name(),
        }
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn count_replacements(text: &str) -> usize {
    text.chars().filter(|&c| c == REPLACEMENT).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;

    #[test]
    fn test_clean_utf8_is_returned_unchanged() {
        let text = "第一章 开始\n今天天气很好";
        let decoded = TextDecoder::new().decode(text.as_bytes());
        assert_eq!(decoded.text, text);
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("《书》".as_bytes());
        assert_eq!(TextDecoder::new().decode(&bytes).text, "《书》");
    }

    #[test]
    fn test_few_invalid_bytes_stay_utf8() {
        let mut bytes = "a".repeat(200).into_bytes();
        bytes.push(0xFF);
        let decoded = TextDecoder::new().decode(&bytes);
        assert_eq!(decoded.encoding, "UTF-8");
        assert_eq!(decoded.text.chars().filter(|&c| c == REPLACEMENT).count(), 1);
        assert!(decoded.text.starts_with("aaaa"));
    }

    #[test]
    fn test_gbk_bytes_fall_back_to_gbk() {
        let original = "第一章 开始\n今天天气很好，我们去看远方的船。";
        let (bytes, _, had_errors) = GBK.encode(original);
        assert!(!had_errors);

        let decoded = TextDecoder::new().decode(&bytes);
        assert_eq!(decoded.encoding, "GBK");
        assert_eq!(decoded.text, original);
    }

    #[test]
    fn test_without_fallback_keeps_utf8() {
        let (bytes, _, _) = GBK.encode("远方的船");
        let decoded = TextDecoder::utf8_only().decode(&bytes);
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(decoded.text.contains(REPLACEMENT));

        let unknown = TextDecoder::with_fallback_label("no-such-encoding").decode(&bytes);
        assert_eq!(unknown.encoding, "UTF-8");
    }

    #[test]
    fn test_empty_input_decodes_to_empty_string() {
        let decoded = TextDecoder::new().decode(&[]);
        assert_eq!(decoded.text, "");
    }
}
