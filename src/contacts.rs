//! Sender names and the text that gets spoken

use crate::message::ConsolidatedMessage;
use std::collections::HashMap;

/// Looks up a display name for a sender address
pub trait ContactBook: Send + Sync {
    fn lookup(&self, sender: &str) -> Option<String>;
}

/// Knows nobody; senders are spoken as-is
pub struct NoContacts;

impl ContactBook for NoContacts {
    fn lookup(&self, _sender: &str) -> Option<String> {
        None
    }
}

/// Contacts from the `[contacts]` section of the config file
pub struct IniContacts {
    names: HashMap<String, String>,
}

impl IniContacts {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }
}

impl ContactBook for IniContacts {
    fn lookup(&self, sender: &str) -> Option<String> {
        self.names.get(sender).cloned()
    }
}

/// Build the utterance for a batch
///
/// One line per sender: "name: text", or just "name" when only the sender
/// is announced. Unknown senders are spoken by their address.
pub fn compose(messages: &[ConsolidatedMessage], contacts: &dyn ContactBook, announce_sender_only: bool) -> String {
    messages
        .iter()
        .map(|message| {
            let mut speech = contacts
                .lookup(&message.sender)
                .unwrap_or_else(|| message.sender.clone());
            if !announce_sender_only {
                speech.push_str(": ");
                speech.push_str(&message.text);
            }
            speech
        })
        .collect::<Vec<_>>()
        .join("\n")
}
