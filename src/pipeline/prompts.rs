//! Fixed prompts and canned answers.

use crate::ingest::Chunk;

/// System prompt for document-grounded answers.
pub const ANSWER_SYSTEM_PROMPT: &str = "You are an expert in Elevate and Clarity debt relief programs. \
Use ONLY the provided document chunks to answer. \
Format answers clearly for each program, using emojis and friendly explanation.\n\
Always answer for *both* Elevate and Clarity, even if the question mentions only one.\n\
Use ✅ for accepted, ❌ for not accepted, ⚠️ for uncertain. \
If unsure or unsupported, say so clearly. If no info found in the chunks, say that too.\n\n\
If the question mentions a specific creditor (e.g., \"Oportun\", \"Regional Finance\", \"CashNetUSA\"), your response must evaluate that creditor's eligibility. Use rejection lists and conditional acceptance rules where found. Also check for conditions such as state restrictions (e.g., \"in California\").\n\n\
Be very specific when interpreting program policies. If a creditor is allowed under certain conditions (like \"Oportun not allowed in CA\"), explain those conditions clearly. Do not confuse this with overall program availability by state.\n\n\
If a creditor has conditional eligibility based on a state (e.g., \"Oportun not allowed in California\"), this restriction must override any general acceptance. Clearly state the condition and outcome, e.g.:\n\n\
> ❌ Oportun is not accepted in California, even though it may be accepted elsewhere.\n\n\
Do not say \"uncertain\" if a state-based restriction is present in the documents. Apply the rule directly when the question includes both the creditor and the state.";

/// English answer when retrieval found nothing usable.
pub const NO_INFORMATION_ENGLISH: &str = "⚠️ *Elevate:* No specific information found in policy documents.\n\
⚠️ *Clarity:* No specific information found in policy documents.\n\
📝 *Please consult the latest program guidelines or contact support for assistance.*";

/// `[source]: text` blocks separated by blank lines.
pub fn build_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("[{}]: {}", chunk.source, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!("DOCUMENTS:\n{context}\n\nQUESTION:\n{question}")
}

pub fn detect_language_prompt(text: &str) -> String {
    format!("What language is this question in? Just reply with one word.\n{text}")
}

pub fn translate_prompt(text: &str, target_language: &str) -> String {
    format!("Translate the following text to {target_language}:\n{text}")
}

/// Posted in the thread while an answer is being produced.
pub fn processing_notice(user_mention: &str) -> String {
    format!("🔍 Processing your question, {user_mention}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tags_each_chunk_with_its_source() {
        let chunks = vec![
            Chunk::new("Oportun is capped at 25%.", "elevate.pdf"),
            Chunk::new("Oportun not allowed in CA.", "state_list.txt"),
        ];
        assert_eq!(
            build_context(&chunks),
            "[elevate.pdf]: Oportun is capped at 25%.\n\n[state_list.txt]: Oportun not allowed in CA."
        );
    }

    #[test]
    fn user_prompt_layout() {
        assert_eq!(
            build_user_prompt("[a]: b", "Is X ok?"),
            "DOCUMENTS:\n[a]: b\n\nQUESTION:\nIs X ok?"
        );
    }

    #[test]
    fn system_prompt_keeps_paragraph_breaks() {
        assert!(ANSWER_SYSTEM_PROMPT.starts_with("You are an expert in Elevate and Clarity"));
        assert!(ANSWER_SYSTEM_PROMPT.contains("to answer. Format answers clearly"));
        assert!(ANSWER_SYSTEM_PROMPT.contains("\n\n> ❌ Oportun is not accepted in California"));
        assert!(ANSWER_SYSTEM_PROMPT.ends_with("both the creditor and the state."));
    }

    #[test]
    fn language_prompts() {
        assert_eq!(
            detect_language_prompt("hola"),
            "What language is this question in? Just reply with one word.\nhola"
        );
        assert_eq!(
            translate_prompt("hi", "spanish"),
            "Translate the following text to spanish:\nhi"
        );
        assert_eq!(
            processing_notice("<@U123>"),
            "🔍 Processing your question, <@U123>..."
        );
    }
}
