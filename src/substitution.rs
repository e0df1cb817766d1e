//! Exercise substitution for workout slots
//!
//! Candidates are filtered by shared canonical muscles, scored against a
//! reference exercise (lower is closer), and ordered by `(score, name)`.
//! Rotating a slot walks that order cyclically.
//!
//! The reference for a slot is its default exercise, so the order does not
//! shift as the selection rotates. Rotation is computed from a snapshot of
//! the pool; two callers rotating the same slot at once both read the same
//! selection and the later write wins.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::config::GymSettings;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{GymDayAssignment, GymExercise};
use crate::muscles::{exercise_tokens, primary_of, secondary_of, slot_tokens};

// ---------------------------------------------------------------------------
/// Scores
// ---------------------------------------------------------------------------

pub const SCORE_SELF: f32 = 0.0;
pub const SCORE_SAME_PRIMARY: f32 = 1.0;
pub const SCORE_SECONDARY_HITS_PRIMARY: f32 = 1.5;
pub const SCORE_SHARES_SECONDARY: f32 = 2.0;
pub const SCORE_NO_OVERLAP: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredExercise {
    pub exercise_id: String,
    pub name: String,
    /// None for entries appended from the slot's option list
    pub score: Option<f32>,
}

/// How close `candidate` is to `reference` by canonical muscle
pub fn substitute_score(candidate: &GymExercise, reference: &GymExercise) -> f32 {
    if candidate.id == reference.id {
        return SCORE_SELF;
    }
    let ref_primary = primary_of(reference);
    let ref_secondary = secondary_of(reference);
    let cand_primary = primary_of(candidate);
    let cand_secondary = secondary_of(candidate);

    if !ref_primary.is_empty() && cand_primary == ref_primary {
        SCORE_SAME_PRIMARY
    } else if !ref_primary.is_empty() && cand_secondary == ref_primary {
        SCORE_SECONDARY_HITS_PRIMARY
    } else if !ref_secondary.is_empty()
        && (cand_primary == ref_secondary || cand_secondary == ref_secondary)
    {
        SCORE_SHARES_SECONDARY
    } else {
        SCORE_NO_OVERLAP
    }
}

// ---------------------------------------------------------------------------
/// Ranking
// ---------------------------------------------------------------------------

/// Rank active pool members as substitutes for `reference`.
///
/// With a non-empty `target_tokens`, candidates other than the reference
/// must share at least one canonical muscle with it.
pub fn rank_substitutes(
    reference: &GymExercise,
    pool: &[GymExercise],
    target_tokens: Option<&BTreeSet<String>>,
) -> Vec<ScoredExercise> {
    let target = target_tokens.filter(|t| !t.is_empty());

    let mut scored: Vec<(f32, String, &GymExercise)> = pool
        .iter()
        .filter(|candidate| candidate.is_active)
        .filter(|candidate| match target {
            Some(target) if candidate.id != reference.id => {
                !exercise_tokens(candidate).is_disjoint(target)
            }
            _ => true,
        })
        .map(|candidate| {
            (
                substitute_score(candidate, reference),
                candidate.name.to_lowercase(),
                candidate,
            )
        })
        .collect();

    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    scored
        .into_iter()
        .map(|(score, _, exercise)| ScoredExercise {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            score: Some(score),
        })
        .collect()
}

/// Append active option-list exercises the ranking left out, in option order
pub fn append_slot_options(
    ranked: &mut Vec<ScoredExercise>,
    options: &[String],
    pool: &[GymExercise],
) {
    for option_id in options {
        if ranked.iter().any(|r| &r.exercise_id == option_id) {
            continue;
        }
        if let Some(exercise) = pool.iter().find(|e| &e.id == option_id && e.is_active) {
            ranked.push(ScoredExercise {
                exercise_id: exercise.id.clone(),
                name: exercise.name.clone(),
                score: None,
            });
        }
    }
}

/// Reference exercise for a slot: the default, else whatever is current
pub fn slot_reference<'a>(
    assignment: &GymDayAssignment,
    pool: &'a [GymExercise],
) -> TrackerResult<&'a GymExercise> {
    let reference_id = assignment
        .default_exercise_id
        .as_deref()
        .or(assignment.selected_exercise_id.as_deref())
        .ok_or_else(|| {
            TrackerError::InvalidOperation(format!(
                "No exercise to substitute for assignment {}",
                assignment.id
            ))
        })?;

    pool.iter()
        .find(|e| e.id == reference_id)
        .ok_or_else(|| TrackerError::not_found("Exercise", reference_id))
}

/// Full substitute order for a slot: muscle-ranked candidates followed by
/// any remaining configured options
pub fn slot_substitutes(
    assignment: &GymDayAssignment,
    pool: &[GymExercise],
) -> TrackerResult<Vec<ScoredExercise>> {
    let reference = slot_reference(assignment, pool)?;

    let mut target = exercise_tokens(reference);
    target.extend(slot_tokens(&assignment.metadata));

    let mut ranked = rank_substitutes(reference, pool, Some(&target));
    append_slot_options(&mut ranked, &assignment.options, pool);
    Ok(ranked)
}

// ---------------------------------------------------------------------------
/// Rotation
// ---------------------------------------------------------------------------

/// The exercise id a slot should rotate to next
pub fn next_substitute(
    assignment: &GymDayAssignment,
    pool: &[GymExercise],
) -> TrackerResult<String> {
    let current = assignment.current_exercise_id().ok_or_else(|| {
        TrackerError::InvalidOperation(format!(
            "No exercise to substitute for assignment {}",
            assignment.id
        ))
    })?;

    let ranked = slot_substitutes(assignment, pool)?;

    let mut seen = HashSet::new();
    let mut ordered: Vec<&str> = ranked
        .iter()
        .map(|r| r.exercise_id.as_str())
        .filter(|id| seen.insert(*id))
        .collect();

    if !ordered.contains(&current) {
        ordered.insert(0, current);
    }

    let no_substitutes = || {
        TrackerError::InvalidOperation(format!(
            "No substitutes found for assignment {}",
            assignment.id
        ))
    };

    if ordered.len() <= 1 {
        return Err(no_substitutes());
    }

    let idx = ordered.iter().position(|id| *id == current).unwrap_or(0);
    let next = ordered[(idx + 1) % ordered.len()];
    if next == current {
        return Err(no_substitutes());
    }
    Ok(next.to_string())
}

/// Validate an explicit selection for a slot
pub fn check_selection(
    assignment: &GymDayAssignment,
    exercise: &GymExercise,
    settings: &GymSettings,
) -> TrackerResult<()> {
    if settings.enforce_option_allowlist
        && !assignment.options.is_empty()
        && !assignment.options.iter().any(|id| id == &exercise.id)
    {
        return Err(TrackerError::ConstraintViolation(format!(
            "Exercise {} is not allowed for slot {}",
            exercise.id, assignment.slot_id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
