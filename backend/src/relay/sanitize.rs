//! Envelope → text fragment.

use serde_json::Value;

use crate::lexicon::Lexicon;
use crate::upstream::envelope_text;

/// Literal backslash-n the model emits instead of a real line break.
const ESCAPED_NEWLINE: &str = "\\n";

/// Extract and clean the text of one envelope.
///
/// Returns `None` for structural envelopes with no text (role or usage-only
/// frames) and for fragments that end up empty after cleanup.
pub fn fragment(lexicon: &Lexicon, envelope: &Value) -> Option<String> {
    let text = envelope_text(envelope)?;
    let cleaned = clean(lexicon, text);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Replace escaped newlines with the outward line-break marker, then drop
/// disallowed scaffolding tokens.
pub fn clean(lexicon: &Lexicon, text: &str) -> String {
    let text = text.replace(ESCAPED_NEWLINE, lexicon.line_break());
    lexicon.strip_disallowed(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }] })
    }

    #[test]
    fn extracts_and_cleans() {
        let lexicon = Lexicon::default();
        assert_eq!(
            fragment(&lexicon, &envelope(r"Headline: 세금 걱정\n끝")),
            Some(" 세금 걱정<br>끝".to_string())
        );
    }

    #[test]
    fn structural_envelope_yields_nothing() {
        let lexicon = Lexicon::default();
        assert_eq!(fragment(&lexicon, &json!({ "candidates": [{ "content": { "role": "model" } }] })), None);
        assert_eq!(fragment(&lexicon, &json!({ "usageMetadata": {} })), None);
        assert_eq!(fragment(&lexicon, &json!([1, 2])), None);
    }

    #[test]
    fn empty_after_cleanup_yields_nothing() {
        let lexicon = Lexicon::default();
        assert_eq!(fragment(&lexicon, &envelope("")), None);
        assert_eq!(fragment(&lexicon, &envelope("CTA:")), None);
    }

    #[test]
    fn every_escaped_newline_is_replaced() {
        let lexicon = Lexicon::default();
        assert_eq!(clean(&lexicon, r"a\nb\n\nc"), "a<br>b<br><br>c");
    }

    #[test]
    fn real_newlines_are_left_alone() {
        let lexicon = Lexicon::default();
        assert_eq!(clean(&lexicon, "a\nb"), "a\nb");
    }

    #[test]
    fn removal_is_global_and_case_insensitive() {
        let lexicon = Lexicon::default();
        assert_eq!(clean(&lexicon, "hook:가 HOOK:나 Hook:다"), "가 나 다");
    }

    #[test]
    fn idempotent_on_clean_text() {
        let lexicon = Lexicon::default();
        for text in ["보장 내용<br>월 3만원", "이미 정리된 문장", "", "<br><br>"] {
            let once = clean(&lexicon, text);
            assert_eq!(clean(&lexicon, &once), once);
            assert_eq!(once, text);
        }
    }

    #[test]
    fn applying_twice_matches_once() {
        let lexicon = Lexicon::default();
        let once = clean(&lexicon, r"Title: 제목\n본문");
        assert_eq!(clean(&lexicon, &once), once);
    }
}
