//! Line-oriented chunking of policy documents.
//!
//! A single pass over the lines. Blank lines and short all-caps headers start
//! new chunks; bullets and short policy lines stick to the chunk before them;
//! long runs of prose are cut once they pass the word budget.

use tracing::trace;

use super::Chunk;

pub const DEFAULT_MAX_CHUNK_WORDS: usize = 120;

/// Substrings that mark a line as policy content.
const POLICY_KEYWORDS: &[&str] = &[
    "credit union",
    "secured loan",
    "furniture",
    "military",
    "federal",
    "student loan",
    "auto loan",
    "mortgage",
    "collections",
    "ach",
    "minimum payment",
    "enrollment",
    "eligible",
    "disqualified",
    "restricted",
    "capped",
    "limit",
    "requirement",
    "condition",
    "waiver",
    "approval",
    "not allowed",
    "prohibited",
    "excluded",
    "conditional",
    "must",
    "only if",
    "required",
    "necessary",
    "mandatory",
];

const POLICY_EMOJIS: &[&str] = &["❌", "✅", "⚠️", "🚫", "💳", "🏦", "💰", "📋", "🔒", "⚡"];

/// Does the text carry policy signal (keyword, status emoji or bullet)?
pub fn is_important(text: &str) -> bool {
    if text.contains('-') || text.contains('•') {
        return true;
    }
    if POLICY_EMOJIS.iter().any(|emoji| text.contains(emoji)) {
        return true;
    }
    let lower = text.to_lowercase();
    POLICY_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Short all-caps line such as `OPORTUN` or `MILITARY STAR`.
pub fn is_policy_header(line: &str) -> bool {
    is_all_caps(line)
        && line.split_whitespace().count() <= 4
        && line.chars().count() >= 2
        && !line.starts_with('-')
        && !line.starts_with('•')
}

/// At least one cased character and no lowercase ones.
fn is_all_caps(line: &str) -> bool {
    line.chars().any(|c| c.is_uppercase() || c.is_lowercase()) && !line.chars().any(char::is_lowercase)
}

/// Bullet line. Lines are trimmed first, so indentation carries no meaning.
fn is_bullet(line: &str) -> bool {
    line.starts_with('-') || line.starts_with('•')
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Accumulates trimmed lines of the chunk being built.
struct Buffer<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Buffer<'a> {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push(&mut self, line: &'a str) {
        self.lines.push(line);
    }

    fn joined(&self) -> String {
        self.lines.join(" ")
    }

    fn starts_with_header(&self) -> bool {
        self.lines.first().is_some_and(|first| is_policy_header(first))
    }

    /// A header with anything after it, or important content.
    fn is_policy_block(&self, joined: &str) -> bool {
        (self.lines.len() >= 2 && self.starts_with_header()) || is_important(joined)
    }

    fn should_merge(&self, line: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        if is_bullet(line) {
            return true;
        }
        let line_important = is_important(line);
        let words = word_count(line);
        if words <= 5 && line_important {
            return true;
        }
        if line_important && is_important(&self.joined()) {
            return true;
        }
        let header = self.starts_with_header();
        (header && line_important) || (header && words <= 8)
    }

    fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Splits document text into chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_words: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_WORDS)
    }
}

impl Chunker {
    pub fn new(max_chunk_words: usize) -> Self {
        Self { max_chunk_words }
    }

    pub fn max_chunk_words(&self) -> usize {
        self.max_chunk_words
    }

    /// Cut `text` into ordered chunks tagged with `source`.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        let mut output = Vec::new();
        let mut buffer = Buffer::new();

        for line in text.lines().map(str::trim) {

            if line.is_empty() {
                flush(&mut buffer, source, &mut output);
            } else if buffer.should_merge(line) {
                buffer.push(line);
            } else if is_policy_header(line) {
                flush(&mut buffer, source, &mut output);
                buffer.push(line);
            } else {
                buffer.push(line);
                if word_count(&buffer.joined()) > self.max_chunk_words {
                    flush(&mut buffer, source, &mut output);
                }
            }
        }
        flush(&mut buffer, source, &mut output);

        trace!(source, chunks = output.len(), "Chunked document");
        output
    }
}

fn flush(buffer: &mut Buffer<'_>, source: &str, output: &mut Vec<Chunk>) {
    if buffer.is_empty() {
        return;
    }
    let joined = buffer.joined().trim().to_string();
    if buffer.is_policy_block(&joined) || word_count(&joined) >= 3 {
        output.push(Chunk::new(joined, source));
    }
    buffer.clear();
}
