//! Inbound message fragments and their consolidation
//!
//! Long text messages arrive split into several fragments. Before anything
//! is spoken, fragments from the same sender are glued back together in the
//! order they were delivered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One raw unit of inbound text attributed to a sender
///
/// Fragments carry no sequence field; their order is their position in
/// the delivered batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub sender: String,
    pub text: String,
}

impl Fragment {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }
}

/// Full text of everything one sender contributed to a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedMessage {
    pub sender: String,
    pub text: String,
}

/// Merge fragments into one message per sender
///
/// Output order is the order in which each sender was first seen. Text is
/// appended with no separator, in arrival order. An empty batch gives an
/// empty result.
pub fn aggregate(fragments: &[Fragment]) -> Vec<ConsolidatedMessage> {
    let mut messages: Vec<ConsolidatedMessage> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for fragment in fragments {
        match index.get(fragment.sender.as_str()) {
            Some(&pos) => messages[pos].text.push_str(&fragment.text),
            None => {
                index.insert(fragment.sender.as_str(), messages.len());
                messages.push(ConsolidatedMessage {
                    sender: fragment.sender.clone(),
                    text: fragment.text.clone(),
                });
            }
        }
    }

    messages
}

/// Parse a batch from JSON (`[{"sender": "...", "text": "..."}, ...]`)
///
/// Blank input is an empty batch.
pub fn parse_batch(input: &str) -> crate::Result<Vec<Fragment>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(input)?)
}
