//! Node ids and routers for the QA loop
//!
//! Every router is a pure, total function of the state. Verdicts are closed
//! enums, so each `match` is exhaustive and an unset verdict falls through to
//! the conservative branch.

use crate::state::{RagState, SupportVerdict, UsefulnessVerdict};
use serde::{Deserialize, Serialize};

pub const DECIDE_RETRIEVAL: &str = "decide_retrieval";
pub const GENERATE_DIRECT: &str = "generate_direct";
pub const RETRIEVE: &str = "retrieve";
pub const IS_RELEVANT: &str = "is_relevant";
pub const NO_RELEVANT_DOCS: &str = "no_relevant_docs";
pub const GENERATE_FROM_CONTEXT: &str = "generate_from_context";
pub const IS_SUP: &str = "is_sup";
pub const REVISE_ANSWER: &str = "revise_answer";
pub const IS_USE: &str = "is_use";
pub const REWRITE_QUESTION: &str = "rewrite_question";
pub const FINALIZE: &str = "finalize";
pub const BEST_EFFORT: &str = "best_effort";

/// Successors `route_after_decide` may return
pub const DECIDE_BRANCHES: [&str; 2] = [RETRIEVE, GENERATE_DIRECT];
/// Successors `route_after_relevance` may return
pub const RELEVANCE_BRANCHES: [&str; 2] = [GENERATE_FROM_CONTEXT, NO_RELEVANT_DOCS];
/// Successors `route_after_issup` may return
pub const ISSUP_BRANCHES: [&str; 4] = [IS_USE, REVISE_ANSWER, REWRITE_QUESTION, BEST_EFFORT];
/// Successors `route_after_isuse` may return
pub const ISUSE_BRANCHES: [&str; 3] = [FINALIZE, REWRITE_QUESTION, BEST_EFFORT];

/// Retry budgets for the correction loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopLimits {
    /// Revisions allowed per freshly generated answer
    pub max_revisions: u32,
    /// Query rewrites allowed per run
    pub max_rewrites: u32,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_revisions: 2,
            max_rewrites: 2,
        }
    }
}

impl LoopLimits {
    pub fn new(max_revisions: u32, max_rewrites: u32) -> Self {
        Self {
            max_revisions,
            max_rewrites,
        }
    }

    /// Longest possible run, in node executions, under these limits.
    ///
    /// One decision, then per retrieval round `retrieve`, `is_relevant`,
    /// `generate_from_context`, `is_sup`, every revision pair, `is_use` and
    /// `rewrite_question`, then one terminal node.
    ///
    /// Saturates at `usize::MAX` for limits too large to count.
    pub fn worst_case_steps(&self) -> usize {
        let rounds = (self.max_rewrites as usize).saturating_add(1);
        let per_round = (self.max_revisions as usize)
            .saturating_mul(2)
            .saturating_add(6);
        rounds.saturating_mul(per_round).saturating_add(2)
    }

    /// `rewrite_question` while rewrites remain, `best_effort` after
    pub fn rewrite_or_best_effort(&self, state: &RagState) -> &'static str {
        if state.rewrite_tries >= self.max_rewrites {
            BEST_EFFORT
        } else {
            REWRITE_QUESTION
        }
    }

    pub fn route_after_issup(&self, state: &RagState) -> &'static str {
        match state.issup {
            Some(SupportVerdict::FullySupported) => IS_USE,
            Some(SupportVerdict::PartiallySupported) if state.retries < self.max_revisions => {
                REVISE_ANSWER
            }
            Some(SupportVerdict::PartiallySupported)
            | Some(SupportVerdict::NoSupport)
            | None => self.rewrite_or_best_effort(state),
        }
    }

    pub fn route_after_isuse(&self, state: &RagState) -> &'static str {
        match state.isuse {
            Some(UsefulnessVerdict::Useful) => FINALIZE,
            Some(UsefulnessVerdict::NotUseful) | None => self.rewrite_or_best_effort(state),
        }
    }
}

pub fn route_after_decide(state: &RagState) -> &'static str {
    if state.needs_retrieval == Some(true) {
        RETRIEVE
    } else {
        GENERATE_DIRECT
    }
}

pub fn route_after_relevance(state: &RagState) -> &'static str {
    match state.relevant_docs.as_deref() {
        Some(docs) if !docs.is_empty() => GENERATE_FROM_CONTEXT,
        _ => NO_RELEVANT_DOCS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use proptest::prelude::*;

    fn state() -> RagState {
        RagState::new("What limits column throughput?")
    }

    #[test]
    fn test_decide_routes() {
        let mut s = state();
        assert_eq!(route_after_decide(&s), GENERATE_DIRECT);
        s.needs_retrieval = Some(true);
        assert_eq!(route_after_decide(&s), RETRIEVE);
        s.needs_retrieval = Some(false);
        assert_eq!(route_after_decide(&s), GENERATE_DIRECT);
    }

    #[test]
    fn test_relevance_routes() {
        let mut s = state();
        assert_eq!(route_after_relevance(&s), NO_RELEVANT_DOCS);
        s.relevant_docs = Some(vec![]);
        assert_eq!(route_after_relevance(&s), NO_RELEVANT_DOCS);
        s.relevant_docs = Some(vec![Document::new("Flooding.", "columns.pdf", 8)]);
        assert_eq!(route_after_relevance(&s), GENERATE_FROM_CONTEXT);
    }

    #[test]
    fn test_partial_support_stops_revising_at_limit() {
        let limits = LoopLimits::default();
        let mut s = state();
        s.issup = Some(SupportVerdict::PartiallySupported);

        s.retries = 1;
        assert_eq!(limits.route_after_issup(&s), REVISE_ANSWER);
        s.retries = 2;
        assert_eq!(limits.route_after_issup(&s), REWRITE_QUESTION);
    }

    #[test]
    fn test_rewrite_cap_routes_to_best_effort() {
        let limits = LoopLimits::default();
        let mut s = state();
        s.issup = Some(SupportVerdict::NoSupport);
        s.isuse = Some(UsefulnessVerdict::NotUseful);

        s.rewrite_tries = 1;
        assert_eq!(limits.route_after_issup(&s), REWRITE_QUESTION);
        assert_eq!(limits.route_after_isuse(&s), REWRITE_QUESTION);

        s.rewrite_tries = 2;
        assert_eq!(limits.route_after_issup(&s), BEST_EFFORT);
        assert_eq!(limits.route_after_isuse(&s), BEST_EFFORT);
    }

    #[test]
    fn test_useful_answer_finalizes() {
        let mut s = state();
        s.isuse = Some(UsefulnessVerdict::Useful);
        s.rewrite_tries = 2;
        assert_eq!(LoopLimits::default().route_after_isuse(&s), FINALIZE);
    }

    #[test]
    fn test_worst_case_steps() {
        assert_eq!(LoopLimits::default().worst_case_steps(), 32);
        assert_eq!(LoopLimits::new(0, 0).worst_case_steps(), 8);
        assert_eq!(LoopLimits::new(u32::MAX, u32::MAX).worst_case_steps(), usize::MAX);
    }

    fn arb_state() -> impl Strategy<Value = RagState> {
        (
            proptest::option::of(any::<bool>()),
            proptest::option::of(0usize..3),
            proptest::option::of(prop_oneof![
                Just(SupportVerdict::FullySupported),
                Just(SupportVerdict::PartiallySupported),
                Just(SupportVerdict::NoSupport),
            ]),
            proptest::option::of(prop_oneof![
                Just(UsefulnessVerdict::Useful),
                Just(UsefulnessVerdict::NotUseful),
            ]),
            0u32..6,
            0u32..6,
        )
            .prop_map(|(needs, n_docs, issup, isuse, retries, rewrite_tries)| RagState {
                needs_retrieval: needs,
                relevant_docs: n_docs
                    .map(|n| (0..n).map(|i| Document::new("text", "a.pdf", i as u32)).collect()),
                issup,
                isuse,
                retries,
                rewrite_tries,
                ..RagState::new("q")
            })
    }

    proptest! {
        #[test]
        fn prop_routers_are_total(s in arb_state(), max_rev in 0u32..4, max_rw in 0u32..4) {
            let limits = LoopLimits::new(max_rev, max_rw);

            prop_assert!(DECIDE_BRANCHES.contains(&route_after_decide(&s)));
            prop_assert!(RELEVANCE_BRANCHES.contains(&route_after_relevance(&s)));
            prop_assert!(ISSUP_BRANCHES.contains(&limits.route_after_issup(&s)));
            prop_assert!(ISUSE_BRANCHES.contains(&limits.route_after_isuse(&s)));
        }

        #[test]
        fn prop_no_rewrite_past_cap(s in arb_state(), max_rw in 0u32..4) {
            let limits = LoopLimits::new(2, max_rw);
            if s.rewrite_tries >= max_rw {
                prop_assert_ne!(limits.route_after_issup(&s), REWRITE_QUESTION);
                prop_assert_ne!(limits.route_after_isuse(&s), REWRITE_QUESTION);
            }
        }

        #[test]
        fn prop_no_revision_past_cap(s in arb_state(), max_rev in 0u32..4) {
            let limits = LoopLimits::new(max_rev, 2);
            if s.retries >= max_rev {
                prop_assert_ne!(limits.route_after_issup(&s), REVISE_ANSWER);
            }
        }
    }
}
