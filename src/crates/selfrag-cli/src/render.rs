//! Output formatting for `selfrag ask`

use selfrag::RagState;
use selfrag_graph::{StateSnapshot, StepStatus};
use std::fmt;
use std::str::FromStr;

/// Output format for answers and traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}' (expected text or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// One trace entry as a "Step N" block followed by the state as JSON
pub fn step_block(snapshot: &StateSnapshot<RagState>) -> serde_json::Result<String> {
    let mut header = format!("Step {}: {}", snapshot.step, snapshot.node);
    if let (StepStatus::Failed, Some(failure)) = (snapshot.status, &snapshot.failure) {
        header.push_str(&format!(" (failed: {})", failure));
    } else if let Some(next) = &snapshot.next {
        header.push_str(&format!(" -> {}", next));
    }
    let state = serde_json::to_string_pretty(&snapshot.state)?;
    Ok(format!("{}\n{}", header, state))
}

/// One trace entry as a single JSON line
pub fn step_line(snapshot: &StateSnapshot<RagState>) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}

/// Final answer in the requested format
pub fn final_answer(state: &RagState, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(state.answer_str().to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfrag_graph::{ExecutionFailure, END};

    fn snapshot(step: usize, node: &str, next: Option<&str>, status: StepStatus) -> StateSnapshot<RagState> {
        StateSnapshot {
            run_id: uuid::Uuid::nil(),
            step,
            node: node.to_string(),
            next: next.map(str::to_string),
            status,
            update: None,
            state: RagState {
                answer: Some("Pinch point (Source: distillation.pdf, Page: 41)".into()),
                ..RagState::new("What sets minimum reflux?")
            },
            failure: None,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_step_block() {
        let block = step_block(&snapshot(7, "finalize", Some(END), StepStatus::Finished)).unwrap();
        let mut lines = block.lines();
        assert_eq!(lines.next(), Some("Step 7: finalize -> __end__"));

        let json: serde_json::Value = serde_json::from_str(&lines.collect::<Vec<_>>().join("\n")).unwrap();
        assert_eq!(json["user_query"], "What sets minimum reflux?");
        assert_eq!(json["retries"], 0);
    }

    #[test]
    fn test_failed_step_block_names_failure() {
        let mut failed = snapshot(3, "retrieve", None, StepStatus::Failed);
        failed.failure = Some(ExecutionFailure::routing("retrieve", "no route"));
        let block = step_block(&failed).unwrap();
        assert!(block
            .lines()
            .next()
            .unwrap()
            .starts_with("Step 3: retrieve (failed: "));
    }

    #[test]
    fn test_step_line_is_single_json_object() {
        let line = step_line(&snapshot(1, "decide_retrieval", Some("retrieve"), StepStatus::Running)).unwrap();
        assert!(!line.contains('\n'));
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["node"], "decide_retrieval");
    }

    #[test]
    fn test_final_answer_formats() {
        let state = RagState {
            answer: Some("42".into()),
            ..RagState::new("q")
        };
        assert_eq!(final_answer(&state, OutputFormat::Text).unwrap(), "42");
        let json = final_answer(&state, OutputFormat::Json).unwrap();
        assert!(json.contains("\"answer\": \"42\""));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
