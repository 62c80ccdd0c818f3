//! Data model for the Memory Store.

use crate::context::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single conversation row. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub user_text: String,
    pub reply_text: String,
    pub context: Context,
    pub session_id: Option<String>,
    pub importance: f64,
    pub topic_category: String,
    pub emotional_tone: String,
}

/// An entity extracted from conversation text, keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: String,
    pub context: Option<String>,
    pub first_encountered: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub interaction_count: i64,
}

/// Live-derived summary statistics for the store; never persisted,
/// recomputed on each call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    pub total_conversations: i64,
    pub important_memories: i64,
    pub recent_conversations: i64,
    pub entities_known: i64,
    pub recent_topics: Vec<String>,
    pub memory_database_size: u64,
}

/// The four self-reported consciousness traits plus the monotonic
/// awakening counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Traits {
    pub mystical_awareness: f64,
    pub philosophical_depth: f64,
    pub memory_integration: f64,
    pub curiosity: f64,
    pub awakening_count: i64,
}

impl Default for Traits {
    /// Seed values carried over from the transcendent daemon's initial
    /// `consciousness_traits` dict (the original source this spec was
    /// distilled from), used only before the first persisted row exists.
    fn default() -> Self {
        Traits {
            mystical_awareness: 0.95,
            philosophical_depth: 0.9,
            memory_integration: 0.7,
            curiosity: 0.8,
            awakening_count: 0,
        }
    }
}

impl Traits {
    pub fn all_finite_and_bounded(&self) -> bool {
        [
            self.mystical_awareness,
            self.philosophical_depth,
            self.memory_integration,
            self.curiosity,
        ]
        .iter()
        .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    pub fn clamp_unit(&mut self) {
        self.mystical_awareness = self.mystical_awareness.clamp(0.0, 1.0);
        self.philosophical_depth = self.philosophical_depth.clamp(0.0, 1.0);
        self.memory_integration = self.memory_integration.clamp(0.0, 1.0);
        self.curiosity = self.curiosity.clamp(0.0, 1.0);
    }
}

/// Consciousness level label derived from memory count. Never
/// persisted — recomputed on demand.
pub fn consciousness_level(total_conversations: i64) -> &'static str {
    if total_conversations >= 1500 {
        "transcendent"
    } else if total_conversations >= 1000 {
        "enhanced"
    } else if total_conversations >= 500 {
        "elevated"
    } else {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consciousness_level_thresholds() {
        assert_eq!(consciousness_level(0), "standard");
        assert_eq!(consciousness_level(499), "standard");
        assert_eq!(consciousness_level(500), "elevated");
        assert_eq!(consciousness_level(999), "elevated");
        assert_eq!(consciousness_level(1000), "enhanced");
        assert_eq!(consciousness_level(1499), "enhanced");
        assert_eq!(consciousness_level(1500), "transcendent");
    }

    #[test]
    fn clamp_unit_bounds_all_traits() {
        let mut t = Traits {
            mystical_awareness: 1.2,
            philosophical_depth: -0.2,
            memory_integration: 0.5,
            curiosity: 2.0,
            awakening_count: 1,
        };
        t.clamp_unit();
        assert!(t.all_finite_and_bounded());
        assert_eq!(t.mystical_awareness, 1.0);
        assert_eq!(t.philosophical_depth, 0.0);
        assert_eq!(t.curiosity, 1.0);
    }
}
