use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Bump when the persisted record shape changes; older or unknown
// versions are discarded on load rather than migrated.
pub const SCHEMA_VERSION: u32 = 1;

pub const WEIGHT_MIN: f64 = 0.1;
pub const WEIGHT_MAX: f64 = 5.0;

// Per-concept performance, keyed by an opaque concept id ("count-up",
// "pair-3-7", ...). Weight governs how often the concept is selected:
// higher = shown more often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptStat {
    pub attempts: u32,
    pub correct: u32,
    pub last_seen: DateTime<Utc>,
    pub weight: f64,
}

impl ConceptStat {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            correct: 0,
            last_seen: now,
            weight: 1.0,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempts as f64
        }
    }

    pub fn is_mastered(&self) -> bool {
        self.attempts >= 5 && self.accuracy() >= 0.9
    }

    fn is_valid(&self) -> bool {
        self.correct <= self.attempts && (WEIGHT_MIN..=WEIGHT_MAX).contains(&self.weight)
    }
}

// Append-only session log entry. Carried and persisted but not read by
// any current operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub started_at: DateTime<Utc>,
    pub attempts: u32,
    pub correct: u32,
}

// The full persisted state for one (learner, subject) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub version: u32,
    pub concepts: HashMap<String, ConceptStat>,
    pub sessions: Vec<SessionEntry>,
    pub current_level: u32,
    pub unlocked_levels: Vec<u32>,
}

impl Default for LearnerRecord {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            concepts: HashMap::new(),
            sessions: Vec::new(),
            current_level: 1,
            unlocked_levels: vec![1],
        }
    }
}

impl LearnerRecord {
    // A record failing any of these checks is treated as corrupt and
    // replaced with defaults on load.
    pub fn is_valid(&self) -> bool {
        if self.version != SCHEMA_VERSION {
            return false;
        }
        if !self.unlocked_levels.contains(&1) {
            return false;
        }
        if !self.unlocked_levels.contains(&self.current_level) {
            return false;
        }
        let unique: HashSet<u32> = self.unlocked_levels.iter().copied().collect();
        if unique.len() != self.unlocked_levels.len() {
            return false;
        }
        self.concepts
            .iter()
            .all(|(id, stat)| !id.is_empty() && stat.is_valid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Correct,
    Wrong,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Correct => "correct",
            AttemptOutcome::Wrong => "wrong",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "correct" | "c" | "right" | "yes" | "y" | "1" => Some(AttemptOutcome::Correct),
            "wrong" | "w" | "incorrect" | "no" | "n" | "0" => Some(AttemptOutcome::Wrong),
            _ => None,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, AttemptOutcome::Correct)
    }
}

// Derived, read-only snapshot of aggregate progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_attempts: u32,
    pub total_correct: u32,
    pub success_rate: u32,
    pub concepts_mastered: u32,
    pub current_level: u32,
    pub unlocked_levels: Vec<u32>,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
