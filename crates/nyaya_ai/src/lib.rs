//! Hybrid retrieval-and-answer pipeline for the bilingual legal assistant.
//!
//! [`agent::Orchestrator::answer`] is the single entry point: it searches the
//! document index, falls back to live web search when nothing scores above the
//! relevance threshold, and asks the answer generator for a reply in the
//! requested language.

pub mod agent;
pub mod embeddings;
pub mod error;
pub mod fallback;
pub mod guardrails;
pub mod index;
pub mod llm;
pub mod ollama;
pub mod prompts;
pub mod retrieve;
pub mod websearch;
