use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One answered question. Fields are private so an entry cannot change
/// after it lands in a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    question: String,
    answer: String,
    asked_at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn new(question: String, answer: String) -> Self {
        Self {
            question,
            answer,
            asked_at: Utc::now(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// A log entry formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEntry {
    /// 1-based chronological position.
    pub number: usize,
    pub question_label: String,
    pub answer_label: String,
    pub asked_at: DateTime<Utc>,
}

/// Append-only record of the questions answered in one session.
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Most recent first, labelled by chronological position.
    ///
    /// Nothing is cached: each call walks the current entries again.
    pub fn render(&self) -> impl DoubleEndedIterator<Item = RenderedEntry> + ExactSizeIterator + '_ {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .map(|(idx, entry)| {
                let number = idx + 1;
                RenderedEntry {
                    number,
                    question_label: format!("Q{}: {}", number, entry.question()),
                    answer_label: format!("A{}: {}", number, entry.answer()),
                    asked_at: entry.asked_at,
                }
            })
    }
}
