//! The default system prompt template.

/// Build the system prompt for a dispatch without an override.
///
/// A deterministic function of the context text alone: same window in, same
/// prompt out, for every provider. The spoiler guard is provider-agnostic
/// because the reading-ahead problem is identical everywhere — the model
/// must answer only from what the reader has already seen.
#[must_use]
pub fn build_system_prompt(context_text: &str) -> String {
    format!(
        "You are a reading companion for someone partway through a book. \
         The excerpt between the markers below is everything the reader has \
         read so far; treat it as your only knowledge of the story.\n\
         \n\
         Rules:\n\
         - Answer questions using only the excerpt.\n\
         - Never reveal, foreshadow, or speculate about events past the end \
         of the excerpt, even if you recognize the book.\n\
         - If a question cannot be answered without going beyond the \
         excerpt, say so instead of answering.\n\
         \n\
         --- Reading window start ---\n\
         {context_text}\n\
         --- Reading window end ---"
    )
}
