//! Built-in verification flows for the chat console
//!
//! These reproduce the two manual verifications the harness exists for:
//! the context tracker rendering on load, and tagging a document from the
//! `@`-triggered picker.

use crate::flow::{Flow, Step, Target, Viewport};

/// Test id of the chat input.
pub const CHAT_INPUT: &str = "multimodal-input";

/// Test id of the document-tagging panel.
pub const TAGGING_PANEL: &str = "document-tagging";

/// The document clicked in the tagging verification.
pub const SAMPLE_DOCUMENT: &str = "Monet";

/// Input value after tagging; the whitespace framing is part of the
/// observable contract and is asserted byte-exactly.
pub const TAGGED_VALUE: &str = " @Monet ";

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

/// The chat page renders on load; capture it.
pub fn context_tracker() -> Flow {
    Flow {
        name: "context-tracker".to_string(),
        description: "Context tracker renders on the chat page".to_string(),
        tags: vec!["smoke".to_string()],
        viewport: default_viewport(),
        steps: vec![
            Step::Navigate { path: "/".to_string(), wait_for: None },
            Step::Screenshot { name: "context-tracker".to_string(), full_page: false },
        ],
    }
}

/// Typing `@` opens the document picker; selecting a document rewrites
/// the input to ` @<name> `.
pub fn document_tagging() -> Flow {
    Flow {
        name: "document-tagging".to_string(),
        description: "Tag a document via @ in the chat input".to_string(),
        tags: vec!["tagging".to_string()],
        viewport: default_viewport(),
        steps: vec![
            Step::Navigate { path: "/".to_string(), wait_for: None },
            Step::Fill {
                target: Target::TestId(CHAT_INPUT.to_string()),
                value: "@".to_string(),
            },
            Step::WaitVisible {
                target: Target::TestId(TAGGING_PANEL.to_string()),
                timeout_ms: 5000,
            },
            Step::Click {
                target: Target::Text(SAMPLE_DOCUMENT.to_string()),
            },
            Step::ExpectValue {
                target: Target::TestId(CHAT_INPUT.to_string()),
                value: TAGGED_VALUE.to_string(),
                timeout_ms: 5000,
            },
            Step::Screenshot { name: "document-tagging".to_string(), full_page: false },
        ],
    }
}

/// All built-in flows, in the order they are run by default.
pub fn builtin() -> Vec<Flow> {
    vec![context_tracker(), document_tagging()]
}
