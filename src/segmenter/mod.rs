// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sentence segmentation for OCR'd page text
//!
//! Splits raw page text into sentence-sized spans that are embedded one by one.
//!
//! Boundaries:
//! - sentence-terminal punctuation (`.`, `!`, `?` and their full-width forms)
//!   followed by whitespace or end of text; trailing quotes and brackets stay
//!   with the sentence they close
//! - paragraph breaks (a blank line), so headings and list items without
//!   punctuation do not swallow the next paragraph
//!
//! Spans are trimmed of surrounding whitespace and otherwise kept verbatim.
//! Spans without a single alphanumeric character (stray whitespace, OCR
//! noise like `...` or `|`) are dropped.

/// Titles that never end a sentence ("Dr. Smith")
const TITLES: &[&str] = &["mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr"];

/// Abbreviations that end a sentence only when the next word is capitalised
const INLINE_ABBREVIATIONS: &[&str] = &["e.g", "i.e", "vs", "etc", "cf", "approx", "no", "fig"];

/// Split `text` into sentences.
///
/// Deterministic: the same input always yields the same ordered output.
/// Empty or whitespace-only input yields an empty vector.
///
/// # Example
/// ```
/// use ocr_chat_node::segmenter::segment;
///
/// let sentences = segment("Paris is the capital of France. It is large.");
/// assert_eq!(sentences, vec!["Paris is the capital of France.", "It is large."]);
/// ```
pub fn segment(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i].1;

        if c == '\n' {
            if let Some(resume) = paragraph_break_end(&chars, i) {
                push_span(&mut sentences, &text[start..chars[i].0]);
                start = byte_offset(&chars, resume, text.len());
                i = resume;
                continue;
            }
        } else if is_terminal(c) {
            let mut end = i + 1;
            while end < chars.len() && (is_terminal(chars[end].1) || is_closing(chars[end].1)) {
                end += 1;
            }

            let followed_by_space = end == chars.len() || chars[end].1.is_whitespace();
            let is_boundary = (followed_by_space || is_full_width_terminal(c))
                && !is_abbreviation(text, &chars, i, end);

            if is_boundary {
                let end_byte = byte_offset(&chars, end, text.len());
                push_span(&mut sentences, &text[start..end_byte]);
                start = end_byte;
            }
            i = end;
            continue;
        }

        i += 1;
    }

    push_span(&mut sentences, &text[start..]);
    sentences
}

fn push_span(sentences: &mut Vec<String>, span: &str) {
    let span = span.trim();
    if span.chars().any(char::is_alphanumeric) {
        sentences.push(span.to_string());
    }
}

fn byte_offset(chars: &[(usize, char)], index: usize, len: usize) -> usize {
    chars.get(index).map(|(offset, _)| *offset).unwrap_or(len)
}

/// If a blank line starts at `i` (a newline), returns the index of the first
/// non-whitespace char after it.
fn paragraph_break_end(chars: &[(usize, char)], i: usize) -> Option<usize> {
    let mut j = i + 1;
    while j < chars.len() && chars[j].1 != '\n' && chars[j].1.is_whitespace() {
        j += 1;
    }
    if j >= chars.len() || chars[j].1 != '\n' {
        return None;
    }
    while j < chars.len() && chars[j].1.is_whitespace() {
        j += 1;
    }
    Some(j)
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？')
}

fn is_full_width_terminal(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '}' | '”' | '’' | '»' | '」' | '』')
}

/// A lone `.` after a known abbreviation does not end the sentence.
fn is_abbreviation(text: &str, chars: &[(usize, char)], dot: usize, run_end: usize) -> bool {
    if chars[dot].1 != '.' || run_end != dot + 1 {
        return false;
    }

    let mut word_start = dot;
    while word_start > 0 && !chars[word_start - 1].1.is_whitespace() {
        word_start -= 1;
    }
    let word = text[chars[word_start].0..chars[dot].0]
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    if word.is_empty() {
        return false;
    }
    if TITLES.contains(&word.as_str()) {
        return true;
    }
    if INLINE_ABBREVIATIONS.contains(&word.as_str()) {
        return next_word_is_lowercase(chars, run_end);
    }
    false
}

fn next_word_is_lowercase(chars: &[(usize, char)], from: usize) -> bool {
    chars[from..]
        .iter()
        .map(|(_, c)| *c)
        .find(|c| !c.is_whitespace())
        .map(|c| c.is_lowercase() || c.is_ascii_digit())
        .unwrap_or(false)
}
