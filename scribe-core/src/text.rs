//! Sentence and word counting for the writing task.
//!
//! Counts are heuristics shared by the submission gate and the final
//! record, tuned for mixed Chinese/English story text.

/// Count sentences: segments separated by terminal punctuation
/// (`.`, `。`, `！`, `？`, `!`, `?`) or newlines, ignoring empty segments.
pub fn count_sentences(text: &str) -> usize {
    text.split(|c: char| matches!(c, '.' | '。' | '！' | '？' | '!' | '?' | '\n' | '\r'))
        .filter(|segment| !segment.trim().is_empty())
        .count()
}

/// Count words: each run of ASCII alphanumerics is one word, and every
/// two CJK ideographs count as one (rounded up).
pub fn count_words(text: &str) -> usize {
    let mut words = 0;
    let mut in_ascii_run = false;
    let mut cjk_chars: usize = 0;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if !in_ascii_run {
                words += 1;
                in_ascii_run = true;
            }
        } else {
            in_ascii_run = false;
            if ('\u{4E00}'..='\u{9FFF}').contains(&c) {
                cjk_chars += 1;
            }
        }
    }

    words + cjk_chars.div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_sentences_mixed_punctuation() {
        assert_eq!(count_sentences("第一句。第二句！第三句？"), 3);
        assert_eq!(count_sentences("One. Two! Three?"), 3);
        assert_eq!(count_sentences("line one\nline two"), 2);
    }

    #[test]
    fn test_count_sentences_ignores_empty_segments() {
        assert_eq!(count_sentences(""), 0);
        assert_eq!(count_sentences("。。。"), 0);
        assert_eq!(count_sentences("好。。結束。"), 2);
        assert_eq!(count_sentences("   \n  "), 0);
    }

    #[test]
    fn test_count_words_ascii() {
        assert_eq!(count_words("hello world"), 2);
        assert_eq!(count_words("it's a test"), 4);
        assert_eq!(count_words("abc123 def"), 2);
    }

    #[test]
    fn test_count_words_cjk() {
        // 4 ideographs -> 2 words, 5 -> 3.
        assert_eq!(count_words("春夏秋冬"), 2);
        assert_eq!(count_words("春夏秋冬天"), 3);
    }

    #[test]
    fn test_count_words_mixed() {
        // "AI" is one run, 5 ideographs add 3.
        assert_eq!(count_words("AI 改變了世界"), 1 + 3);
        assert_eq!(count_words(""), 0);
    }
}
