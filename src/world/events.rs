//! Narrative and audio events
//!
//! Events are produced by the core and drained by whatever is presenting
//! the game. They carry no simulation effect themselves; sounds are
//! offered to nearby minds separately, once per tick.

use crate::core::types::{EntityId, Point};

/// One record on the event queue
#[derive(Debug, Clone)]
pub struct Event {
    /// What an onlooker sees
    pub visual: Option<String>,
    /// What an onlooker hears
    pub sound: Option<String>,
    /// Loudness, in the same scale as perception distances
    pub volume: i32,
    /// Where the event happened
    pub position: Option<Point>,
    /// Entity responsible, if any
    pub source: Option<EntityId>,
    /// Whether the sound channel is the one to display
    pub sound_primary: bool,
}

impl Event {
    /// Purely visual event with no position
    pub fn visual(text: impl Into<String>) -> Self {
        Self {
            visual: Some(text.into()),
            sound: None,
            volume: 0,
            position: None,
            source: None,
            sound_primary: false,
        }
    }

    /// Audible event at a position
    pub fn noise(text: impl Into<String>, volume: i32, position: Point) -> Self {
        Self {
            visual: None,
            sound: Some(text.into()),
            volume,
            position: Some(position),
            source: None,
            sound_primary: true,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn from_entity(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// The channel the display should prefer
    pub fn primary(&self) -> &str {
        let text = if self.sound_primary {
            self.sound.as_deref().or(self.visual.as_deref())
        } else {
            self.visual.as_deref().or(self.sound.as_deref())
        };
        text.unwrap_or("")
    }
}
