use chrono::{DateTime, Utc};
use rand::Rng;

use crate::clock::Clock;
use crate::models::{ConceptStat, LearnerRecord, Stats, WEIGHT_MAX, WEIGHT_MIN};
use crate::store::{ProgressStore, RecordKey, Store, StoreError};

// A correct answer decays the weight (seen less often), a wrong answer
// boosts it (seen more often). Both clamp to [WEIGHT_MIN, WEIGHT_MAX].
const CORRECT_DECAY: f64 = 0.8;
const WRONG_BOOST: f64 = 1.5;

// Concepts not practiced recently get up to a 3x effective weight:
// the boost grows linearly and caps at 2.0 after five minutes unseen.
const RECENCY_CAP: f64 = 2.0;
const RECENCY_WINDOW_SECS: f64 = 5.0 * 60.0;

// Unlock the next level once at least this many attempts have been made
// at this accuracy, across every concept ever attempted.
const UNLOCK_MIN_ATTEMPTS: u32 = 10;
const UNLOCK_ACCURACY: f64 = 0.8;

// The adaptive practice scheduler for one (learner, subject) record.
// Every mutating operation writes the record through to the store
// before returning, so no state is lost between calls.
pub struct Scheduler<S: Store, C: Clock> {
    store: ProgressStore<S>,
    key: RecordKey,
    record: LearnerRecord,
    clock: C,
}

impl<S: Store, C: Clock> Scheduler<S, C> {
    pub fn new(backend: S, key: RecordKey, clock: C) -> Result<Self, StoreError> {
        let store = ProgressStore::new(backend);
        let record = store.load(&key)?;
        Ok(Self {
            store,
            key,
            record,
            clock,
        })
    }

    pub fn record(&self) -> &LearnerRecord {
        &self.record
    }

    pub fn record_attempt(&mut self, concept_id: &str, correct: bool) -> Result<(), StoreError> {
        let now = self.clock.now();
        let stat = self
            .record
            .concepts
            .entry(concept_id.to_string())
            .or_insert_with(|| ConceptStat::new(now));

        stat.attempts += 1;
        if correct {
            stat.correct += 1;
            stat.weight = (stat.weight * CORRECT_DECAY).max(WEIGHT_MIN);
        } else {
            stat.weight = (stat.weight * WRONG_BOOST).min(WEIGHT_MAX);
        }
        stat.last_seen = now;

        self.store.save(&self.record, &self.key)
    }

    // Weighted random draw over the candidate pool. Concepts answered
    // wrong recently and concepts left unseen for a while are the most
    // likely picks; never-attempted concepts enter at weight 1.0.
    //
    // The pool must be non-empty; passing an empty pool is a caller bug.
    pub fn next_concept<'a>(&self, candidates: &'a [String]) -> &'a str {
        assert!(
            !candidates.is_empty(),
            "next_concept requires a non-empty candidate pool"
        );

        let now = self.clock.now();
        let weights: Vec<f64> = candidates
            .iter()
            .map(|id| self.effective_weight(id, now))
            .collect();
        let total: f64 = weights.iter().sum();

        let mut rng = rand::thread_rng();
        let mut point = rng.gen::<f64>() * total;

        for (i, weight) in weights.iter().enumerate() {
            point -= weight;
            if point <= 0.0 {
                return &candidates[i];
            }
        }

        // Rounding can leave a sliver of probability unassigned
        &candidates[candidates.len() - 1]
    }

    fn effective_weight(&self, concept_id: &str, now: DateTime<Utc>) -> f64 {
        match self.record.concepts.get(concept_id) {
            Some(stat) => {
                let elapsed = now.signed_duration_since(stat.last_seen);
                let elapsed_secs = elapsed.num_milliseconds().max(0) as f64 / 1000.0;
                let time_weight = (elapsed_secs / RECENCY_WINDOW_SECS).min(RECENCY_CAP);
                stat.weight * (1.0 + time_weight)
            }
            None => 1.0,
        }
    }

    // Aggregate accuracy gate over every concept ever attempted, not
    // scoped to the current level's pool. Callers wanting level-scoped
    // gating filter the candidates they practice with instead.
    pub fn check_level_progress(&mut self) -> Result<Option<u32>, StoreError> {
        let attempted: Vec<&ConceptStat> = self
            .record
            .concepts
            .values()
            .filter(|stat| stat.attempts > 0)
            .collect();

        if attempted.is_empty() {
            return Ok(None);
        }

        let total_attempts: u32 = attempted.iter().map(|stat| stat.attempts).sum();
        let total_correct: u32 = attempted.iter().map(|stat| stat.correct).sum();

        if total_attempts >= UNLOCK_MIN_ATTEMPTS
            && total_correct as f64 / total_attempts as f64 >= UNLOCK_ACCURACY
        {
            let next = self.record.current_level + 1;
            if !self.record.unlocked_levels.contains(&next) {
                self.record.unlocked_levels.push(next);
                self.store.save(&self.record, &self.key)?;
                return Ok(Some(next));
            }
        }

        Ok(None)
    }

    pub fn current_level(&self) -> u32 {
        self.record.current_level
    }

    pub fn set_current_level(&mut self, level: u32) -> Result<bool, StoreError> {
        if !self.record.unlocked_levels.contains(&level) {
            return Ok(false);
        }
        self.record.current_level = level;
        self.store.save(&self.record, &self.key)?;
        Ok(true)
    }

    // In unlock order
    pub fn unlocked_levels(&self) -> &[u32] {
        &self.record.unlocked_levels
    }

    pub fn stats(&self) -> Stats {
        let total_attempts: u32 = self.record.concepts.values().map(|s| s.attempts).sum();
        let total_correct: u32 = self.record.concepts.values().map(|s| s.correct).sum();
        let success_rate = if total_attempts == 0 {
            0
        } else {
            (total_correct as f64 / total_attempts as f64 * 100.0).round() as u32
        };
        let concepts_mastered = self
            .record
            .concepts
            .values()
            .filter(|s| s.is_mastered())
            .count() as u32;

        Stats {
            total_attempts,
            total_correct,
            success_rate,
            concepts_mastered,
            current_level: self.record.current_level,
            unlocked_levels: self.record.unlocked_levels.clone(),
        }
    }

    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.record = self.store.reset(&self.key)?;
        Ok(())
    }
}
