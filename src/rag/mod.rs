// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) pipeline
// embed question -> retrieve passages -> assemble prompt -> generate answer

pub mod chatbot;
pub mod errors;
pub mod prompt;
pub mod retriever;

pub use chatbot::{Answer, Chatbot, APOLOGY_PREFIX};
pub use errors::RagError;
pub use prompt::{Prompt, PromptAssembler, DEFAULT_MAX_CONTEXT_CHARS};
pub use retriever::{Retriever, DEFAULT_TOP_K};
