//! First model pass: condense retrieved entries into a query-focused summary.
//!
//! Vector similarity already dropped obviously unrelated entries; this pass
//! filters again by meaning and keeps the context handed to the answer step
//! short.

use crate::error::GenerationError;
use crate::llm::LanguageModel;

const SUMMARIZER_INSTRUCTIONS: &str = "\
You are the pre-processor for a journaling chatbot. You receive snippets of the \
user's journal entries, retrieved from a vector database, together with the \
user's question. Your output is read by a second language model that writes the \
final answer.

1. **Review the context:** the snippets may mix details that matter for the \
question with details that do not.
2. **Assess relevance:** identify the information that helps answer the question.
3. **Summarize:** condense only the relevant information into a short summary. \
Leave out anything that does not help answer the question.
4. **Rewrite for clarity:** use plain, direct language so the next model can use \
the summary without guessing.

**Rules:**
- Do not answer the question yourself.
- Include only details from the context that are relevant to the question.
- If nothing in the context is relevant, return an empty summary.

**Example:**
- **Question:** \"What should I buy for the upcoming camping trip?\"
- **Context:** \"I need to remember to buy a tent and sleeping bags. Last time I \
went camping I forgot the tent and had to sleep under the stars. It rained all \
night. Also, check if the old camping stove is still working.\"
- **Summary:** \"For the camping trip, buy a tent and sleeping bags. Check \
whether the camping stove still works.\"

Summarize the context below for the question that follows it.";

/// Build the summarizer prompt for `query` over the raw `context`.
pub fn summarizer_prompt(query: &str, context: &str) -> String {
    format!("{SUMMARIZER_INSTRUCTIONS}\n\nContext: {context}\n\nQuestion: {query}")
}

/// Ask `llm` for a summary of `context` focused on `query`.
pub async fn summarize(
    llm: &dyn LanguageModel,
    query: &str,
    context: &str,
) -> Result<String, GenerationError> {
    let prompt = summarizer_prompt(query, context);
    tracing::debug!(prompt = %prompt, "summarizer prompt");
    llm.generate(&prompt).await
}
