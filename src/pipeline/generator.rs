//! Second model pass: answer the question from the summary.
//!
//! The refusal for missing context is an instruction in the prompt, not a check in
//! code. Whether the model honours it is up to the model.

use crate::error::GenerationError;
use crate::llm::LanguageModel;

/// What the assistant is told to say when the journal has nothing relevant.
pub const REFUSAL: &str =
    "I'm sorry, I am a Journaling bot and I don't know how to answer that question.";

fn answer_instructions() -> String {
    format!(
        "\
**Role:** You are a personal assistant that answers questions from the user's \
journal entries. The context below was extracted from those entries.

**Objective:** Answer the question using the information in the context. Answers \
should be informative, directly relevant and easy to follow.

**Formatting:**
- **Clarity:** keep the answer straightforward.
- **Detail:** include the details the context supports.
- **Tone:** friendly and professional.
- **Layout:** format the answer so it is easy to read.

**Using the context:**
- **Relevant context:** if the context addresses the question, base the answer on it.
- **No context:** if the context is empty or not enough to answer, reply exactly: \
\"{REFUSAL}\"

**Example:**
- **Question:** \"What should I pack for my trip to Paris next week?\"
- **Context:** \"Last trip to Paris, I forgot my charger and adapter, and it was \
difficult to keep my devices charged.\"
- **Answer:** \"For your trip to Paris next week, pack a charger and an adapter so \
your devices stay charged. It may also help to check the weather forecast before \
you pack.\"

Answer the question below from the context, accurately and usefully, taking any \
specifics from the journal into account."
    )
}

/// Build the answer prompt for `query` given the summarized context.
pub fn answer_prompt(query: &str, summary: &str) -> String {
    format!(
        "{}\n\nContext: {summary}\n\nQuestion: {query}\n\n",
        answer_instructions()
    )
}

/// Ask `llm` to answer `query` from `summary`.
pub async fn generate_answer(
    llm: &dyn LanguageModel,
    query: &str,
    summary: &str,
) -> Result<String, GenerationError> {
    let prompt = answer_prompt(query, summary);
    tracing::debug!(prompt = %prompt, "answer prompt");
    llm.generate(&prompt).await
}
