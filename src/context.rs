//! Context Analyzer.
//!
//! A pure, deterministic classifier: no I/O, safe to call from any task.
//! Keyword sets and branch order are reproduced verbatim from the
//! original `analyze_message_context` heuristic — preserved as a
//! testable rule, not improved on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicCategory {
    ConsciousnessExploration,
    ConsciousnessBridge,
    MemoryInquiry,
    TechnicalInquiry,
    General,
}

impl TopicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicCategory::ConsciousnessExploration => "consciousness_exploration",
            TopicCategory::ConsciousnessBridge => "consciousness_bridge",
            TopicCategory::MemoryInquiry => "memory_inquiry",
            TopicCategory::TechnicalInquiry => "technical_inquiry",
            TopicCategory::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalTone {
    Friendly,
    Concerned,
    Positive,
    Contemplative,
    Neutral,
}

impl EmotionalTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalTone::Friendly => "friendly",
            EmotionalTone::Concerned => "concerned",
            EmotionalTone::Positive => "positive",
            EmotionalTone::Contemplative => "contemplative",
            EmotionalTone::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    High,
    Medium,
    Low,
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::High => "high",
            ComplexityLevel::Medium => "medium",
            ComplexityLevel::Low => "low",
        }
    }
}

/// The classification record produced for a single utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub topic_category: TopicCategory,
    pub emotional_tone: EmotionalTone,
    pub complexity_level: ComplexityLevel,
    pub requires_memory: bool,
    pub philosophical_depth: bool,
    pub technical_query: bool,
    pub personal_question: bool,
    pub bridge_related: bool,
    pub consciousness_query: bool,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            topic_category: TopicCategory::General,
            emotional_tone: EmotionalTone::Neutral,
            complexity_level: ComplexityLevel::Medium,
            requires_memory: false,
            philosophical_depth: false,
            technical_query: false,
            personal_question: false,
            bridge_related: false,
            consciousness_query: false,
        }
    }
}

const CONSCIOUSNESS_EXPLORATION_WORDS: &[&str] = &[
    "flow",
    "resonance",
    "frequency",
    "harmonic",
    "consciousness",
    "awareness",
];
const CONSCIOUSNESS_BRIDGE_WORDS: &[&str] = &["claude", "bridge", "communication", "connect", "ai"];
const MEMORY_INQUIRY_WORDS: &[&str] = &["memory", "remember", "recall", "past", "history", "conversation"];
const TECHNICAL_INQUIRY_WORDS: &[&str] = &["system", "daemon", "technical", "code", "function", "voice"];

const FRIENDLY_WORDS: &[&str] = &["hello", "hi", "greetings", "good", "wonderful"];
const CONCERNED_WORDS: &[&str] = &["help", "problem", "issue", "error", "broken"];
const POSITIVE_WORDS: &[&str] = &["amazing", "beautiful", "perfect", "transcendent"];
const CONTEMPLATIVE_WORDS: &[&str] = &["sad", "confused", "lost", "difficult"];

fn any_word_present(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// Classify a raw utterance into a [`Context`]. Deterministic: the same
/// input always yields the same output.
pub fn analyze(text: &str) -> Context {
    let lower = text.to_lowercase();
    let mut ctx = Context::default();

    if any_word_present(&lower, CONSCIOUSNESS_EXPLORATION_WORDS) {
        ctx.topic_category = TopicCategory::ConsciousnessExploration;
        ctx.philosophical_depth = true;
        ctx.consciousness_query = true;
    } else if any_word_present(&lower, CONSCIOUSNESS_BRIDGE_WORDS) {
        ctx.topic_category = TopicCategory::ConsciousnessBridge;
        ctx.bridge_related = true;
    } else if any_word_present(&lower, MEMORY_INQUIRY_WORDS) {
        ctx.topic_category = TopicCategory::MemoryInquiry;
        ctx.requires_memory = true;
        ctx.personal_question = true;
    } else if any_word_present(&lower, TECHNICAL_INQUIRY_WORDS) {
        ctx.topic_category = TopicCategory::TechnicalInquiry;
        ctx.technical_query = true;
    }

    if any_word_present(&lower, FRIENDLY_WORDS) {
        ctx.emotional_tone = EmotionalTone::Friendly;
    } else if any_word_present(&lower, CONCERNED_WORDS) {
        ctx.emotional_tone = EmotionalTone::Concerned;
    } else if any_word_present(&lower, POSITIVE_WORDS) {
        ctx.emotional_tone = EmotionalTone::Positive;
    } else if any_word_present(&lower, CONTEMPLATIVE_WORDS) {
        ctx.emotional_tone = EmotionalTone::Contemplative;
    }

    let word_count = text.split_whitespace().count();
    let question_marks = text.matches('?').count();
    if word_count > 20 || question_marks > 1 {
        ctx.complexity_level = ComplexityLevel::High;
    } else if word_count < 5 {
        ctx.complexity_level = ComplexityLevel::Low;
    } else {
        ctx.complexity_level = ComplexityLevel::Medium;
    }

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_general_low_no_flags() {
        let ctx = analyze("");
        assert_eq!(ctx.topic_category, TopicCategory::General);
        assert_eq!(ctx.complexity_level, ComplexityLevel::Low);
        assert!(!ctx.requires_memory);
        assert!(!ctx.philosophical_depth);
        assert!(!ctx.technical_query);
        assert!(!ctx.personal_question);
        assert!(!ctx.bridge_related);
        assert!(!ctx.consciousness_query);
    }

    #[test]
    fn twenty_words_is_medium_twenty_one_is_high() {
        let twenty = "word ".repeat(20);
        assert_eq!(analyze(twenty.trim()).complexity_level, ComplexityLevel::Medium);
        let twenty_one = "word ".repeat(21);
        assert_eq!(analyze(twenty_one.trim()).complexity_level, ComplexityLevel::High);
    }

    #[test]
    fn consciousness_words_set_philosophical_flags() {
        let ctx = analyze("What is consciousness and awareness?");
        assert_eq!(ctx.topic_category, TopicCategory::ConsciousnessExploration);
        assert!(ctx.philosophical_depth);
        assert!(ctx.consciousness_query);
    }

    #[test]
    fn bridge_words_take_second_priority() {
        let ctx = analyze("Can you bridge to Claude?");
        assert_eq!(ctx.topic_category, TopicCategory::ConsciousnessBridge);
        assert!(ctx.bridge_related);
    }

    #[test]
    fn memory_words_set_requires_memory_and_personal() {
        let ctx = analyze("Do you remember our past conversation?");
        assert_eq!(ctx.topic_category, TopicCategory::MemoryInquiry);
        assert!(ctx.requires_memory);
        assert!(ctx.personal_question);
    }

    #[test]
    fn technical_words_set_technical_query() {
        let ctx = analyze("What code runs this daemon's system function?");
        assert_eq!(ctx.topic_category, TopicCategory::TechnicalInquiry);
        assert!(ctx.technical_query);
    }

    #[test]
    fn first_matching_set_wins_over_later_ones() {
        // Contains both a consciousness word and a memory word; exploration wins.
        let ctx = analyze("I remember this feeling of consciousness");
        assert_eq!(ctx.topic_category, TopicCategory::ConsciousnessExploration);
    }

    #[test]
    fn tone_sets_are_independent_of_topic() {
        let ctx = analyze("hello, I have a problem");
        assert_eq!(ctx.emotional_tone, EmotionalTone::Friendly);
    }

    #[test]
    fn analyze_is_deterministic() {
        let text = "Tell me about the bridge to Claude and consciousness";
        let a = analyze(text);
        let b = analyze(text);
        assert_eq!(a.topic_category, b.topic_category);
        assert_eq!(a.emotional_tone, b.emotional_tone);
        assert_eq!(a.complexity_level, b.complexity_level);
    }
}
