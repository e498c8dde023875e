//! Conversation history
//!
//! Append-only transcript of the conversation. The only in-place mutation
//! is the URL swap of an artifact after a successful edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::design::{ArtifactLocation, Design, DesignArtifact};
use crate::script::{RenderedMessage, SummaryTable};

/// Who authored an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Bot,
    User,
}

/// Entry payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryContent {
    Text { text: String },
    Table { table: SummaryTable },
    ImageSet { designs: Vec<Design> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub speaker: Speaker,
    pub content: HistoryContent,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    fn new(speaker: Speaker, content: HistoryContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Text of a `Text` entry
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            HistoryContent::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn designs(&self) -> Option<&[Design]> {
        match &self.content {
            HistoryContent::ImageSet { designs } => Some(designs),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn push_bot_message(&mut self, message: RenderedMessage) {
        let content = match message {
            RenderedMessage::Text(text) => HistoryContent::Text { text },
            RenderedMessage::Table(table) => HistoryContent::Table { table },
        };
        self.entries.push(HistoryEntry::new(Speaker::Bot, content));
    }

    pub fn push_bot_text(&mut self, text: impl Into<String>) {
        self.push_bot_message(RenderedMessage::Text(text.into()));
    }

    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.entries.push(HistoryEntry::new(
            Speaker::User,
            HistoryContent::Text { text: text.into() },
        ));
    }

    pub fn push_designs(&mut self, designs: Vec<Design>) {
        self.entries.push(HistoryEntry::new(
            Speaker::Bot,
            HistoryContent::ImageSet { designs },
        ));
    }

    /// Designs of the newest image set, if any.
    pub fn latest_designs(&self) -> Option<&[Design]> {
        self.entries.iter().rev().find_map(HistoryEntry::designs)
    }

    /// Find an artifact by URL, newest entry first. The location hint wins
    /// when it points at an artifact with that URL.
    pub fn find_artifact(
        &self,
        url: &str,
        hint: Option<ArtifactLocation>,
    ) -> Option<&DesignArtifact> {
        let (entry, design, variation) = self.locate(url, hint)?;
        match &self.entries[entry].content {
            HistoryContent::ImageSet { designs } => designs[design].variations.get(variation),
            _ => None,
        }
    }

    /// Replace an artifact URL in place. Returns the updated artifact.
    pub fn replace_artifact_url(
        &mut self,
        old_url: &str,
        new_url: &str,
        hint: Option<ArtifactLocation>,
    ) -> Option<&DesignArtifact> {
        let (entry, design, variation) = self.locate(old_url, hint)?;
        match &mut self.entries[entry].content {
            HistoryContent::ImageSet { designs } => {
                let artifact = designs[design].variations.get_mut(variation)?;
                artifact.replace_url(new_url);
                Some(&*artifact)
            }
            _ => None,
        }
    }

    /// (entry, design, variation) positions of the artifact.
    fn locate(&self, url: &str, hint: Option<ArtifactLocation>) -> Option<(usize, usize, usize)> {
        let image_sets = self
            .entries
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(i, e)| e.designs().map(|d| (i, d)));

        let mut fallback = None;
        for (entry, designs) in image_sets {
            for (d, design) in designs.iter().enumerate() {
                for (v, artifact) in design.variations.iter().enumerate() {
                    if artifact.url != url {
                        continue;
                    }
                    match hint {
                        Some(hint) if artifact.location() == Some(hint) => {
                            return Some((entry, d, v));
                        }
                        Some(_) => {
                            fallback.get_or_insert((entry, d, v));
                        }
                        None => return Some((entry, d, v)),
                    }
                }
            }
        }
        fallback
    }
}
