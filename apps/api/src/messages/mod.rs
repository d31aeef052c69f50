// Outreach message generation.
// All LLM calls go through llm_client; this module owns the prompt,
// the fallback templates and the HTTP handlers.

pub mod generator;
pub mod handlers;
pub mod prompts;
