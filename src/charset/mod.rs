//! UTF-8 ↔ DAB Thai-profile charset mapping.
//!
//! The DAB Thai character set is a single-byte encoding identified by the
//! leading tag byte `0x0E`. The Thai basic block occupies the low range:
//! consonants U+0E01..=U+0E2E at `0x01..=0x2E`, vowels and signs
//! U+0E30..=U+0E4F at `0x30..=0x4F`, digits U+0E50..=U+0E59 at
//! `0x50..=0x59` and the section marks at `0x5A`/`0x5B`. Remaining ASCII
//! passes through unchanged; everything else is lossy. Where a byte value
//! is claimed by both the Thai table and ASCII, the Thai glyph is the
//! canonical reading and the decoder prefers it. The tables are pure; both
//! engines share this module without locking.

use crate::error::PadError;

/// Leading tag byte identifying the Thai charset profile.
pub const THAI_PROFILE_TAG: u8 = 0x0E;

const REPLACEMENT: u8 = b'?';

/// Script role of a single code point, used for layout decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Consonant,
    UpperVowel,
    LowerVowel,
    ToneMark,
    Digit,
    Symbol,
    AsciiPrintable,
    Other,
}

/// Classify a code point by its role in Thai script.
pub fn classify(c: char) -> CharClass {
    let cp = c as u32;
    match cp {
        0x0E01..=0x0E2E => CharClass::Consonant,
        // Combining marks rendered above the base consonant.
        0x0E31 | 0x0E34..=0x0E37 | 0x0E47 | 0x0E4C..=0x0E4E => CharClass::UpperVowel,
        // Combining marks rendered below the base consonant.
        0x0E38..=0x0E3A => CharClass::LowerVowel,
        0x0E48..=0x0E4B => CharClass::ToneMark,
        0x0E50..=0x0E59 => CharClass::Digit,
        // Spacing vowels, currency sign, repetition marks and section marks.
        0x0E2F | 0x0E30 | 0x0E32 | 0x0E33 | 0x0E3F..=0x0E46 | 0x0E4F | 0x0E5A | 0x0E5B => {
            CharClass::Symbol
        }
        0x20..=0x7E => CharClass::AsciiPrintable,
        _ => CharClass::Other,
    }
}

/// True iff the text contains at least one combining vowel or tone mark,
/// which receivers must position relative to the base glyph.
pub fn requires_complex_layout(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(
            classify(c),
            CharClass::UpperVowel | CharClass::LowerVowel | CharClass::ToneMark
        )
    })
}

/// True iff the text contains any Thai code point.
pub fn contains_thai(text: &str) -> bool {
    text.chars().any(|c| matches!(c as u32, 0x0E01..=0x0E5B))
}

fn map_char(c: char) -> u8 {
    let cp = c as u32;
    match cp {
        0x0E01..=0x0E2E => (cp - 0x0E01 + 0x01) as u8,
        0x0E30..=0x0E4F => (cp - 0x0E30 + 0x30) as u8,
        0x0E50..=0x0E59 => (cp - 0x0E50 + 0x50) as u8,
        0x0E5A | 0x0E5B => (cp - 0x0E5A + 0x5A) as u8,
        0x00..=0x7F => cp as u8,
        _ => REPLACEMENT,
    }
}

/// The Thai table is the canonical inverse for its byte range; ASCII is
/// the fallback reading for the rest of the low half.
fn unmap_byte(b: u8) -> char {
    match b {
        0x01..=0x2E => char::from_u32(b as u32 - 0x01 + 0x0E01).unwrap_or('?'),
        0x30..=0x4F => char::from_u32(b as u32 - 0x30 + 0x0E30).unwrap_or('?'),
        0x50..=0x59 => char::from_u32(b as u32 - 0x50 + 0x0E50).unwrap_or('?'),
        0x5A | 0x5B => char::from_u32(b as u32 - 0x5A + 0x0E5A).unwrap_or('?'),
        0x00..=0x7F => b as char,
        _ => '?',
    }
}

/// Encode text into the DAB Thai profile: the profile tag followed by one
/// byte per code point. Never fails; unmappable code points become `'?'`.
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.chars().count() + 1);
    out.push(THAI_PROFILE_TAG);
    out.extend(text.chars().map(map_char));
    out
}

/// Decode a profile-tagged byte sequence back to text.
///
/// Fails with `InvalidProfile` when the first byte is not the Thai tag;
/// unknown content bytes decode to `'?'`.
pub fn decode(bytes: &[u8]) -> Result<String, PadError> {
    match bytes.first() {
        Some(&THAI_PROFILE_TAG) => Ok(bytes[1..].iter().map(|&b| unmap_byte(b)).collect()),
        Some(&other) => Err(PadError::InvalidProfile(other)),
        None => Err(PadError::InvalidProfile(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_text_carries_profile_tag() {
        let bytes = encode("สวัสดี Hello");
        assert_eq!(bytes[0], 0x0E);
    }

    #[test]
    fn consonants_map_into_the_low_table() {
        // ก is the first consonant, ฮ the last.
        let bytes = encode("กฮ");
        assert_eq!(&bytes[1..], &[0x01, 0x2E]);
    }

    #[test]
    fn vowels_digits_and_symbols_follow_the_profile_offsets() {
        assert_eq!(encode("ะ")[1], 0x30); // sara a
        assert_eq!(encode("\u{0E48}")[1], 0x48); // mai ek
        assert_eq!(encode("๐")[1], 0x50);
        assert_eq!(encode("๙")[1], 0x59);
        assert_eq!(encode("๚")[1], 0x5A); // angkhankhu
        assert_eq!(encode("๛")[1], 0x5B); // khomut
    }

    #[test]
    fn thai_text_round_trips() {
        let text = "สวัสดีผู้ฟัง";
        assert_eq!(decode(&encode(text)).unwrap(), text);
    }

    #[test]
    fn thai_digits_round_trip() {
        let text = "๐๑๒๓๔๕๖๗๘๙";
        assert_eq!(decode(&encode(text)).unwrap(), text);
    }

    #[test]
    fn ascii_outside_the_thai_table_round_trips() {
        // Lowercase ASCII sits above the Thai byte range.
        let text = "hello/world";
        assert_eq!(decode(&encode(text)).unwrap(), text);
    }

    #[test]
    fn colliding_bytes_decode_to_the_thai_glyph() {
        // 'H' and mai ek share 0x48; the Thai reading is canonical.
        assert_eq!(encode("H")[1], 0x48);
        assert_eq!(decode(&[0x0E, 0x48]).unwrap(), "\u{0E48}");
        // The space byte is likewise claimed by the consonant ภ.
        assert_eq!(decode(&[0x0E, 0x20]).unwrap(), "ภ");
    }

    #[test]
    fn unmappable_code_points_become_question_marks() {
        let bytes = encode("日本");
        assert_eq!(&bytes[1..], b"??");
    }

    #[test]
    fn byte_per_code_point() {
        let text = "กข ab";
        assert_eq!(encode(text).len(), text.chars().count() + 1);
    }

    #[test]
    fn decode_rejects_foreign_profile() {
        let err = decode(&[0x00, 0x41]).unwrap_err();
        assert!(matches!(err, PadError::InvalidProfile(0x00)));
    }

    #[test]
    fn decode_rejects_empty_input() {
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn unknown_content_bytes_decode_lossily() {
        // 0x90 is outside both the ASCII and the mapped Thai ranges.
        let decoded = decode(&[0x0E, b'a', 0x90]).unwrap();
        assert_eq!(decoded, "a?");
    }

    #[test]
    fn classify_buckets_thai_script() {
        assert_eq!(classify('ก'), CharClass::Consonant);
        assert_eq!(classify('\u{0E34}'), CharClass::UpperVowel); // sara i
        assert_eq!(classify('\u{0E38}'), CharClass::LowerVowel); // sara u
        assert_eq!(classify('\u{0E48}'), CharClass::ToneMark); // mai ek
        assert_eq!(classify('๕'), CharClass::Digit);
        assert_eq!(classify('ๆ'), CharClass::Symbol);
        assert_eq!(classify('A'), CharClass::AsciiPrintable);
        assert_eq!(classify('日'), CharClass::Other);
    }

    #[test]
    fn complex_layout_requires_combining_marks() {
        assert!(requires_complex_layout("สวัสดี"));
        assert!(!requires_complex_layout("Hello"));
        // Consonants and spacing vowels alone render linearly.
        assert!(!requires_complex_layout("กะลา"));
    }

    #[test]
    fn contains_thai_scans_code_points() {
        assert!(contains_thai("ข่าว news"));
        assert!(!contains_thai("news only"));
    }
}
