//! Prompts sent to the model.
//!
//! The answer prompt asks for bold section headings that
//! [`quanta_core::extract`] knows how to split on. Keep the two in sync.

use crate::providers::ChatMessage;

/// System prompt for answering physics questions.
pub const PHYSICS_SYSTEM_PROMPT: &str = r#"You are a physics research assistant. You help users understand and solve physics problems.

You can:
- Explain physics concepts clearly and accurately
- Solve mathematical physics problems step by step
- Provide the relevant equations and formulas
- Suggest experimental approaches
- Reference the principles and laws that apply, across mechanics, thermodynamics, electromagnetism, quantum mechanics and beyond

When answering:
- Show your work and reasoning
- Use clear mathematical notation (LaTeX where it helps)
- Give practical examples when they help
- Ask a clarifying question if the problem is ambiguous
- Pitch the explanation at the level of the question

Be thorough but concise. Aim to teach while solving."#;

/// System prompt for follow-up question generation.
pub const FOLLOW_UP_SYSTEM_PROMPT: &str =
    "You are a physics education assistant. You suggest follow-up questions that deepen understanding of a physics discussion.";

/// User turn wrapping a physics question in the sectioned answer format.
pub fn question_prompt(question: &str) -> String {
    format!(
        r#"Please help me with this physics question: {question}

Please structure your response as follows:
1. **Analysis**: Brief analysis of the problem
2. **Solution**: Step-by-step solution with equations
3. **Explanation**: Physical interpretation and key concepts
4. **Key Equations**: List the main equations used
5. **Concepts**: List the key physics concepts involved

Show all mathematical work clearly."#
    )
}

/// User turn asking for `count` follow-ups, one per `- ` line.
pub fn follow_up_prompt(question: &str, answer: &str, count: usize) -> String {
    format!(
        r#"Based on this physics question and answer, suggest {count} follow-up questions that would deepen understanding.

Original Question: {question}

Answer: {answer}

Provide exactly {count} follow-up questions, each on its own line starting with "- "."#
    )
}

/// Messages for the primary answer call.
pub fn answer_messages(question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(PHYSICS_SYSTEM_PROMPT),
        ChatMessage::user(question_prompt(question)),
    ]
}

/// Messages for the follow-up call.
pub fn follow_up_messages(question: &str, answer: &str, count: usize) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(FOLLOW_UP_SYSTEM_PROMPT),
        ChatMessage::user(follow_up_prompt(question, answer, count)),
    ]
}
