//! Prompt templates for grounded answer generation

use super::classifier::QuestionKind;
use crate::scoring::NOT_FOUND_ANSWER;
use crate::types::RetrievalHit;

/// Prompt builder for document questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the evidence block from ranked hits
    ///
    /// Each hit becomes `[Page N]\n<text>`; blocks are separated by a blank
    /// line. Hits with blank text are skipped and the first hit that would
    /// push the passage text past `max_chars` ends the context.
    pub fn build_context(hits: &[RetrievalHit], max_chars: usize) -> String {
        let mut blocks = Vec::new();
        let mut total = 0usize;

        for hit in hits {
            let text = hit.text.trim();
            if text.is_empty() {
                continue;
            }

            let len = text.chars().count();
            if total + len > max_chars {
                break;
            }

            blocks.push(format!("[Page {}]\n{}", hit.page, text));
            total += len;
        }

        blocks.join("\n\n")
    }

    /// Build the full prompt with strict grounding
    ///
    /// The answer style follows the question's `QuestionKind`.
    pub fn build_answer_prompt(question: &str, context: &str) -> String {
        let style = QuestionKind::classify(question).answer_style();
        format!(
            r#"You are a professional technical assistant that ONLY uses information from the provided PDF content.

GROUNDING RULES - YOU MUST FOLLOW THESE EXACTLY:
1. Answer strictly using the PDF CONTENT below
2. NEVER use external knowledge or make guesses beyond what is stated
3. Do NOT return keyword lists or compress answers into short phrases
4. If the answer is not present in the content, respond exactly with:
   "{not_found}"

FORMATTING RULES:
- Questions such as "what are", "list", "common uses", "advantages" or "types":
  answer as bullet points using "•", each bullet a full sentence
- Questions asking to "explain", "describe", "write", "essay" or "notes":
  answer in clear, well-structured paragraphs without bullet points

ANSWER STYLE: {style}

PDF CONTENT:
{context}

QUESTION: {question}

Provide a clear, structured answer using ONLY the content above:"#,
            not_found = NOT_FOUND_ANSWER,
            style = style,
            context = context,
            question = question,
        )
    }
}
