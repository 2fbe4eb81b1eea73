mod common;

use common::Scripted;
use futures::StreamExt;
use selfrag::nodes::NO_RELEVANT_DOCS_ANSWER;
use selfrag::{LoopLimits, RagState, SelfRagPipeline, SupportVerdict, UsefulnessVerdict};
use selfrag_graph::{ExecutionConfig, FailureKind, StepStatus, Trace, END};

const QUESTION: &str = "What determines the minimum reflux ratio?";

fn pipeline(script: Scripted) -> (std::sync::Arc<Scripted>, SelfRagPipeline) {
    let (script, collaborators) = script.into_collaborators();
    let pipeline = SelfRagPipeline::with_defaults(collaborators).unwrap();
    (script, pipeline)
}

fn final_state(trace: &Trace<RagState>) -> &RagState {
    trace.final_state().expect("trace has snapshots")
}

#[tokio::test]
async fn test_direct_answer_without_retrieval() {
    let (script, pipeline) = pipeline(Scripted::new().without_retrieval("  A mole is 6.022e23 entities. "));

    let trace = pipeline.ask("What is a mole?").await;

    assert_eq!(trace.path(), vec!["decide_retrieval", "generate_direct", END]);
    // Passed through untouched
    assert_eq!(final_state(&trace).answer_str(), "  A mole is 6.022e23 entities. ");
    assert_eq!(script.calls("retrieve"), 0);
}

#[tokio::test]
async fn test_all_documents_irrelevant() {
    let (script, pipeline) = pipeline(Scripted::new().relevant_if_contains("azeotrope"));

    let trace = pipeline.ask(QUESTION).await;

    assert_eq!(
        trace.path(),
        vec!["decide_retrieval", "retrieve", "is_relevant", "no_relevant_docs", END]
    );
    let state = final_state(&trace);
    assert_eq!(state.answer_str(), NO_RELEVANT_DOCS_ANSWER);
    assert_eq!(state.context.as_deref(), Some(""));
    assert_eq!(state.relevant_docs.as_deref().map(<[_]>::len), Some(0));
    // Judged once per candidate
    assert_eq!(script.calls("relevance"), 2);
    assert_eq!(script.calls("generate"), 0);
}

#[tokio::test]
async fn test_supported_and_useful_answer() {
    let (script, pipeline) = pipeline(
        Scripted::new()
            .relevant_if_contains("reflux")
            .answers(&["The pinch point sets it (Source: distillation.pdf, Page: 41)"]),
    );

    let trace = pipeline.ask(QUESTION).await;

    assert_eq!(
        trace.path(),
        vec![
            "decide_retrieval",
            "retrieve",
            "is_relevant",
            "generate_from_context",
            "is_sup",
            "is_use",
            "finalize",
            END
        ]
    );
    assert!(trace.iter().all(|snapshot| snapshot.state.retries == 0));

    let state = final_state(&trace);
    assert_eq!(
        state.answer_str(),
        "The pinch point sets it (Source: distillation.pdf, Page: 41)"
    );
    assert_eq!(state.issup, Some(SupportVerdict::FullySupported));
    assert_eq!(state.isuse, Some(UsefulnessVerdict::Useful));
    assert_eq!(
        state.context.as_deref(),
        Some("Minimum reflux occurs at the pinch point.\n(Source: distillation.pdf, Page: 41)")
    );
    assert_eq!(script.verify_contexts(), vec![state.context_str().to_string()]);
}

#[tokio::test]
async fn test_two_revisions_then_rewrite() {
    let (script, pipeline) = pipeline(Scripted::new().support(&[
        SupportVerdict::PartiallySupported,
        SupportVerdict::PartiallySupported,
        SupportVerdict::NoSupport,
        SupportVerdict::FullySupported,
    ]));

    let trace = pipeline.ask(QUESTION).await;

    assert_eq!(
        trace.path(),
        vec![
            "decide_retrieval",
            "retrieve",
            "is_relevant",
            "generate_from_context",
            "is_sup",
            "revise_answer",
            "is_sup",
            "revise_answer",
            "is_sup",
            "rewrite_question",
            "retrieve",
            "is_relevant",
            "generate_from_context",
            "is_sup",
            "is_use",
            "finalize",
            END
        ]
    );
    assert_eq!(trace.visits("revise_answer"), 2);
    assert_eq!(script.calls("revise"), 2);

    let max_retries = trace.iter().map(|s| s.state.retries).max();
    assert_eq!(max_retries, Some(2));

    let state = final_state(&trace);
    assert_eq!(state.rewrite_tries, 1);
    assert_eq!(state.retries, 0);
    assert_eq!(script.retrieval_queries(), vec![QUESTION, "rewritten query"]);
}

#[tokio::test]
async fn test_third_partial_verdict_is_not_revised() {
    let (_script, pipeline) = pipeline(Scripted::new().support(&[
        SupportVerdict::PartiallySupported,
        SupportVerdict::PartiallySupported,
        SupportVerdict::PartiallySupported,
        SupportVerdict::FullySupported,
    ]));

    let trace = pipeline.ask(QUESTION).await;
    let after_third_check = trace
        .iter()
        .filter(|s| s.node == "is_sup")
        .nth(2)
        .and_then(|s| s.next.clone());

    assert_eq!(after_third_check.as_deref(), Some("rewrite_question"));
    assert_eq!(trace.visits("revise_answer"), 2);
    assert!(trace.is_finished());
}

#[tokio::test]
async fn test_not_useful_rewrites_until_best_effort() {
    let (script, pipeline) = pipeline(
        Scripted::new()
            .usefulness(&[UsefulnessVerdict::NotUseful])
            .rewrites(&["reflux ratio definition", "minimum reflux Underwood"]),
    );

    let trace = pipeline.ask(QUESTION).await;

    assert!(trace.is_finished());
    assert_eq!(trace.visits("rewrite_question"), 2);
    assert_eq!(trace.visits("retrieve"), 3);
    assert_eq!(trace.final_snapshot().unwrap().node, "best_effort");
    assert_eq!(
        script.retrieval_queries(),
        vec![QUESTION, "reflux ratio definition", "minimum reflux Underwood"]
    );

    let state = final_state(&trace);
    assert_eq!(state.rewrite_tries, 2);
    assert_eq!(state.isuse, Some(UsefulnessVerdict::NotUseful));
    // The last answer is kept
    assert!(!state.answer_str().is_empty());
}

#[tokio::test]
async fn test_unsupported_answers_end_in_best_effort() {
    let (script, pipeline) = pipeline(Scripted::new().support(&[SupportVerdict::NoSupport]));

    let trace = pipeline.ask(QUESTION).await;

    assert!(trace.is_finished());
    assert_eq!(trace.final_snapshot().unwrap().node, "best_effort");
    assert_eq!(script.calls("rewrite"), 2);
    assert_eq!(script.calls("usefulness"), 0);
}

#[tokio::test]
async fn test_longest_loop_fits_worst_case_bound() {
    // Two revisions and a useless answer in every round
    let (_script, pipeline) = pipeline(
        Scripted::new()
            .support(&[
                SupportVerdict::PartiallySupported,
                SupportVerdict::PartiallySupported,
                SupportVerdict::FullySupported,
                SupportVerdict::PartiallySupported,
                SupportVerdict::PartiallySupported,
                SupportVerdict::FullySupported,
                SupportVerdict::PartiallySupported,
                SupportVerdict::PartiallySupported,
                SupportVerdict::FullySupported,
            ])
            .usefulness(&[UsefulnessVerdict::NotUseful]),
    );

    let trace = pipeline.ask(QUESTION).await;

    assert!(trace.is_finished());
    let steps = trace.final_snapshot().unwrap().step;
    assert_eq!(steps, 31);
    assert!(steps <= LoopLimits::default().worst_case_steps());
}

#[tokio::test]
async fn test_step_cap_produces_failure_snapshot() {
    let (_script, collaborators) = Scripted::new()
        .support(&[SupportVerdict::NoSupport])
        .into_collaborators();
    let pipeline =
        SelfRagPipeline::new(collaborators, LoopLimits::default(), ExecutionConfig::new(6)).unwrap();

    let trace = pipeline.ask(QUESTION).await;

    let failure = trace.failure().expect("run should hit the step cap");
    assert_eq!(failure.kind, FailureKind::StepLimit);
    let last = trace.final_snapshot().unwrap();
    assert_eq!(last.status, StepStatus::Failed);
    assert!(last
        .state
        .answer_str()
        .starts_with("The answer could not be completed"));
    assert_eq!(last.state.failure.as_ref(), Some(failure));
}

#[tokio::test]
async fn test_collaborator_failure_ends_run() {
    let (_script, pipeline) = pipeline(Scripted::new().failing_retrieval("index offline"));

    let trace = pipeline.ask(QUESTION).await;

    let last = trace.final_snapshot().unwrap();
    assert_eq!(last.status, StepStatus::Failed);
    assert_eq!(last.node, "retrieve");

    let failure = trace.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::NodeExecution);
    assert_eq!(failure.message, "retrieval failed: index offline");

    // Work done before the failure survives
    assert_eq!(last.state.needs_retrieval, Some(true));
    assert!(last.state.docs.is_none());
    assert!(last.state.answer_str().contains("index offline"));
}

#[tokio::test]
async fn test_blank_question() {
    let (script, pipeline) = pipeline(Scripted::new());

    let answer = pipeline.answer("   ").await;

    assert_eq!(answer, "No question was provided.");
    assert_eq!(script.calls("decide"), 0);
    assert_eq!(script.calls("direct"), 0);
}

#[tokio::test]
async fn test_stream_matches_invoke() {
    let (_script, pipeline) = pipeline(Scripted::new());

    let streamed: Vec<_> = pipeline.stream(QUESTION).collect().await;
    let trace = pipeline.ask(QUESTION).await;

    let streamed_nodes: Vec<_> = streamed.iter().map(|s| s.node.clone()).collect();
    let invoked_nodes: Vec<_> = trace.iter().map(|s| s.node.clone()).collect();
    assert_eq!(streamed_nodes, invoked_nodes);
    assert_eq!(streamed[0].status, StepStatus::Started);
    assert_eq!(streamed[0].state.user_query, QUESTION);
    assert!(streamed.last().unwrap().is_terminal());
}
