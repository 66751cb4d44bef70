use nyaya_core::domain::Language;

use crate::error::AgentError;
use crate::guardrails::reject_template_tokens;

/// Builds the answer prompt. The question is checked for template
/// placeholders; fields are substituted in a single pass, so text inside the
/// context is never expanded.
pub fn build_prompt(
    context_text: &str,
    question: &str,
    language: Language,
) -> Result<String, AgentError> {
    reject_template_tokens(question).map_err(AgentError::InvalidQuery)?;
    let language = language.display_name();

    Ok(format!(
        r#"You are a legal assistant for people in rural Karnataka.
Explain the answer in simple terms, as you would to someone with no legal training.
Use the context below when it is relevant and do not invent laws, sections or dates.
Respond only in {language}.

Context:
{context_text}

Question: {question}
Answer:"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_language_context_and_question() {
        let p = build_prompt("[source: a.txt]\nSection 79A", "What is 79A?", Language::Kannada)
            .unwrap();
        assert!(p.contains("Respond only in Kannada."));
        assert!(p.contains("[source: a.txt]\nSection 79A"));
        assert!(p.contains("Question: What is 79A?\nAnswer:"));
    }

    #[test]
    fn context_placeholders_are_not_expanded() {
        let p = build_prompt("see {question}", "What is RTC?", Language::English).unwrap();
        assert!(p.contains("see {question}"));
    }

    #[test]
    fn question_with_placeholder_is_rejected() {
        let err = build_prompt("ctx", "tell me {language}", Language::English).expect_err("reject");
        assert_eq!(err.code(), "QUERY_INVALID");
    }
}
