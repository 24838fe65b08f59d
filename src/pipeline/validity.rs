//! Filters retrieved chunks down to ones worth grounding an answer on, and
//! names the programs that backed the answer.

const POLICY_INDICATORS: &[&str] = &[
    "❌",
    "✅",
    "⚠️",
    "not allowed",
    "prohibited",
    "disqualified",
    "restricted",
    "mortgage",
    "secured",
];

/// Filename fragments of reference lists and comparison sheets.
const POLICY_SOURCE_TERMS: &[&str] = &[
    "disqualified",
    "unacceptable",
    "state",
    "comparison",
    "list",
    "criteria",
];

const MIN_WORDS: usize = 5;

/// The two programs answers are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Program {
    Clarity,
    Elevate,
}

impl Program {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clarity => "Clarity",
            Self::Elevate => "Elevate",
        }
    }
}

fn is_clarity_source(source_lower: &str) -> bool {
    source_lower.contains("clarity") || source_lower.contains("affiliate_training_packet")
}

fn is_elevate_source(source_lower: &str) -> bool {
    source_lower.contains("elevate")
}

/// Whether a retrieved chunk may back an answer.
///
/// Needs five words. Past that, any policy indicator in the text is enough;
/// otherwise the file must be a program document or a policy reference.
pub fn is_valid_primary_chunk(chunk: &str, source: &str) -> bool {
    if chunk.split_whitespace().count() < MIN_WORDS {
        return false;
    }

    let chunk_lower = chunk.to_lowercase();
    if POLICY_INDICATORS.iter().any(|term| chunk_lower.contains(term)) {
        return true;
    }

    let source_lower = source.to_lowercase();
    is_clarity_source(&source_lower)
        || is_elevate_source(&source_lower)
        || POLICY_SOURCE_TERMS
            .iter()
            .any(|term| source_lower.contains(term))
}

/// Programs named by the given source filenames, sorted and unique.
pub fn program_sources<'a, I>(sources: I) -> Vec<Program>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut programs = Vec::new();
    for source in sources {
        let lower = source.to_lowercase();
        if is_clarity_source(&lower) {
            programs.push(Program::Clarity);
        }
        if is_elevate_source(&lower) {
            programs.push(Program::Elevate);
        }
    }
    programs.sort();
    programs.dedup();
    programs
}

/// Attribution line appended to retrieval answers.
pub fn source_footer<'a, I>(sources: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let programs = program_sources(sources);
    if programs.is_empty() {
        "📌 Source: ChatGPT".to_string()
    } else {
        let names: Vec<&str> = programs.iter().map(Program::name).collect();
        format!("📌 Based on: {}", names.join(", "))
    }
}
