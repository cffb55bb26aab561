// Prompt template and sentinel strings for question answering.
// Each service that talks to the engine keeps its prompts.rs alongside it.

/// Returned when generation succeeds but produces only whitespace.
pub const NO_ANSWER_SENTINEL: &str = "No answer could be generated.";

/// Returned on any engine failure. The caller only ever sees this string;
/// the underlying error goes to the logs.
pub const ANSWER_FAILED_SENTINEL: &str =
    "Something went wrong while answering your question. Please try again.";

/// The fixed QA prompt: question first, then the rendered career context,
/// then the completion cue.
pub fn qa_prompt(question: &str, context: &str) -> String {
    format!("Question: {question}\n\nContext:\n{context}\n\nAnswer:")
}
