//! Expected-value plan selection.
//!
//! Score is `p_success - entropy`. Ties go to the candidate that appears
//! first in the ledger.

use tracing::{debug, warn};

use crate::error::{HolonError, Result};
use crate::model::Plan;

/// A candidate paired with its score and ledger position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlan<'a> {
    /// Index in the full ledger sequence.
    pub position: usize,
    /// Expected-value score.
    pub score: f64,
    /// The plan itself.
    pub plan: &'a Plan,
}

/// Score every plan for `intent_id`, in ledger order.
pub fn rank_candidates<'a>(plans: &'a [Plan], intent_id: &str) -> Vec<ScoredPlan<'a>> {
    plans
        .iter()
        .enumerate()
        .filter(|(_, plan)| plan.intent_id == intent_id)
        .map(|(position, plan)| ScoredPlan {
            position,
            score: plan.score(),
            plan,
        })
        .collect()
}

/// Pick the highest-scoring plan for `intent_id`.
///
/// Only a strictly greater score replaces the current best, so the earliest
/// of several equal candidates wins.
pub fn select_best<'a>(plans: &'a [Plan], intent_id: &str) -> Result<&'a Plan> {
    let candidates = rank_candidates(plans, intent_id);

    for candidate in &candidates {
        debug!(
            plan_id = %candidate.plan.plan_id,
            position = candidate.position,
            score = candidate.score,
            "scored candidate"
        );
        if !(0.0..=1.0).contains(&candidate.plan.p_success) || candidate.plan.entropy < 0.0 {
            warn!(
                plan_id = %candidate.plan.plan_id,
                p_success = candidate.plan.p_success,
                entropy = candidate.plan.entropy,
                "plan values outside expected range"
            );
        }
    }

    let best = candidates
        .into_iter()
        .fold(None::<ScoredPlan<'a>>, |best, candidate| match best {
            Some(current) if candidate.score > current.score => Some(candidate),
            Some(current) => Some(current),
            None => Some(candidate),
        })
        .ok_or_else(|| HolonError::no_candidates(intent_id))?;

    Ok(best.plan)
}

/// Identifier of the plan chosen by [`select_best`].
pub fn select_best_id(plans: &[Plan], intent_id: &str) -> Result<String> {
    select_best(plans, intent_id).map(|plan| plan.plan_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn picks_highest_expected_value() {
        let plans = vec![Plan::new("i1", "p1", 0.9, 0.3), Plan::new("i1", "p2", 0.8, 0.1)];
        assert_eq!(select_best_id(&plans, "i1").expect("selected"), "p2");
    }

    #[test]
    fn ignores_other_intents() {
        let plans = vec![
            Plan::new("i2", "other", 1.0, 0.0),
            Plan::new("i1", "p1", 0.5, 0.2),
            Plan::new("i2", "other-2", 0.99, 0.0),
        ];
        assert_eq!(select_best_id(&plans, "i1").expect("selected"), "p1");
    }

    #[test]
    fn empty_candidate_set_fails() {
        let plans = vec![Plan::new("i2", "p1", 0.5, 0.2)];
        let err = select_best(&plans, "i1").expect_err("must fail");
        assert!(matches!(err, HolonError::NoCandidates { ref intent_id } if intent_id == "i1"));
        assert!(select_best(&[], "i1").is_err());
    }

    #[rstest]
    #[case(vec![("a", 0.5, 0.0), ("b", 0.5, 0.0)], "a")]
    #[case(vec![("a", 0.75, 0.25), ("b", 1.0, 0.5)], "a")]
    #[case(vec![("a", 0.1, 0.0), ("b", 0.7, 0.2), ("c", 0.5, 0.0)], "b")]
    #[case(vec![("a", -1.0, 0.0), ("b", -1.0, 0.0)], "a")]
    fn selects_expected_winner(
        #[case] specs: Vec<(&str, f64, f64)>,
        #[case] expected: &str,
    ) {
        let plans: Vec<Plan> = specs
            .into_iter()
            .map(|(id, p, e)| Plan::new("i1", id, p, e))
            .collect();
        assert_eq!(select_best_id(&plans, "i1").expect("selected"), expected);
    }

    #[test]
    fn out_of_range_values_are_accepted() {
        let plans = vec![Plan::new("i1", "wild", 3.5, -2.0), Plan::new("i1", "tame", 0.9, 0.1)];
        assert_eq!(select_best_id(&plans, "i1").expect("selected"), "wild");
    }

    #[test]
    fn rank_keeps_ledger_positions() {
        let plans = vec![
            Plan::new("i1", "p1", 0.9, 0.3),
            Plan::new("i2", "x", 0.9, 0.3),
            Plan::new("i1", "p2", 0.8, 0.1),
        ];
        let ranked = rank_candidates(&plans, "i1");
        let positions: Vec<_> = ranked.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }
}
