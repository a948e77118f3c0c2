//! Prompt assembly.

use solace_core::chat::{ContextEntry, HistoryTurn};

pub const PREAMBLE: &str = "You are a helpful and empathetic mental health assistant.\n\n";

/// Assemble the single prompt sent to the generator.
///
/// Layout: preamble, the conversation so far (only when `history` is
/// non-empty, in original order), the retrieved texts as a bulleted list in
/// rank order, then the current query and an `Assistant:` cue.
pub fn build_prompt(query: &str, history: &[HistoryTurn], contexts: &[ContextEntry]) -> String {
  let mut prompt = String::from(PREAMBLE);

  if !history.is_empty() {
    prompt.push_str("Conversation so far:\n");
    for turn in history {
      prompt.push_str(&format!("User: {}\nAssistant: {}\n", turn.user, turn.assistant));
    }
  }

  prompt.push_str("Similar responses from other users:\n");
  let bullets: Vec<String> = contexts.iter().map(|c| format!("- {}", c.response)).collect();
  prompt.push_str(&bullets.join("\n"));

  prompt.push_str(&format!("\n\nUser: {query}\nAssistant:"));
  prompt
}
