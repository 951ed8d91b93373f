// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompt assembly
//!
//! Retrieved passages are joined with a blank line, in retrieval order, and
//! placed in the CAN 2025 template ahead of the question. The joined context
//! is capped at a character budget; passages that no longer fit are dropped,
//! lowest-ranked first.

use crate::vector::ScoredDocument;

/// Separator between passages in the context block
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Default context budget, in characters
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 24_000;

const TEMPLATE_HEADER: &str = "Tu es un assistant expert de la CAN 2025.
Utilise les extraits suivants pour répondre à la question.
Si tu ne connais pas la réponse avec ces infos, dis simplement que tu ne sais pas.
Sois précis sur les buteurs, les minutes de jeu et les clubs des joueurs.";

/// The question and the context it will be answered from
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub context: String,
    pub question: String,
    /// Passages that made it into `context`
    pub documents_used: usize,
    /// Passages retrieved but dropped or cut to respect the budget
    pub truncated: bool,
}

impl Prompt {
    /// Full text sent to the generation provider
    pub fn render(&self) -> String {
        format!(
            "{}\n\nContexte:\n{}\n\nQuestion: {}\n\nRéponse:",
            TEMPLATE_HEADER, self.context, self.question
        )
    }
}

#[derive(Debug, Clone)]
pub struct PromptAssembler {
    max_context_chars: usize,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_CHARS)
    }
}

impl PromptAssembler {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }

    /// Builds the prompt; pure, no I/O
    pub fn build(&self, question: &str, documents: &[ScoredDocument]) -> Prompt {
        let budget = self.max_context_chars;
        let mut context = String::new();
        let mut context_chars = 0;
        let mut documents_used = 0;
        let mut truncated = false;

        for doc in documents {
            let content = doc.document.content.as_str();
            let content_chars = content.chars().count();
            let separator_chars = if documents_used == 0 {
                0
            } else {
                DOCUMENT_SEPARATOR.len()
            };

            if context_chars + separator_chars + content_chars <= budget {
                if documents_used > 0 {
                    context.push_str(DOCUMENT_SEPARATOR);
                }
                context.push_str(content);
                context_chars += separator_chars + content_chars;
                documents_used += 1;
                continue;
            }

            // The best passage is kept even when it alone exceeds the budget
            if documents_used == 0 {
                context.extend(content.chars().take(budget));
                documents_used = 1;
            }
            truncated = true;
            break;
        }

        Prompt {
            context,
            question: question.to_string(),
            documents_used,
            truncated,
        }
    }
}
