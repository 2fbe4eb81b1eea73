//! Scripted in-memory collaborators for driving the pipeline

#![allow(dead_code)]

use async_trait::async_trait;
use selfrag::{
    AnswerReviser, CollaboratorError, CollaboratorResult, Collaborators, DirectGenerator,
    Document, GroundedGenerator, QueryRewriter, RelevanceJudge, RetrievalDecider, Retriever,
    SupportAssessment, SupportVerdict, SupportVerifier, UsefulnessAssessment, UsefulnessJudge,
    UsefulnessVerdict,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One value per call, repeating the last one once the queue runs dry
struct Queue<T: Clone> {
    items: Mutex<VecDeque<T>>,
    last: T,
}

impl<T: Clone> Queue<T> {
    fn new(items: Vec<T>, fallback: T) -> Self {
        let last = items.last().cloned().unwrap_or(fallback);
        Self {
            items: Mutex::new(items.into()),
            last,
        }
    }

    fn next(&self) -> T {
        self.items
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone())
    }
}

/// Every collaborator role answered from a script, with call logging
pub struct Scripted {
    needs_retrieval: bool,
    direct_answer: String,
    corpus: Vec<Document>,
    relevant_marker: Option<String>,
    answers: Queue<String>,
    support: Queue<SupportVerdict>,
    usefulness: Queue<UsefulnessVerdict>,
    rewrites: Queue<String>,
    retrieval_error: Option<String>,
    calls: Mutex<HashMap<&'static str, usize>>,
    retrieval_queries: Mutex<Vec<String>>,
    verify_contexts: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self {
            needs_retrieval: true,
            direct_answer: "Direct answer.".to_string(),
            corpus: vec![
                Document::new(
                    "Minimum reflux occurs at the pinch point.",
                    "distillation.pdf",
                    41,
                ),
                Document::new("Tray efficiency varies with load.", "trays.pdf", 7),
            ],
            relevant_marker: None,
            answers: Queue::new(vec![], "Grounded answer (Source: distillation.pdf, Page: 41)".to_string()),
            support: Queue::new(vec![], SupportVerdict::FullySupported),
            usefulness: Queue::new(vec![], UsefulnessVerdict::Useful),
            rewrites: Queue::new(vec![], "rewritten query".to_string()),
            retrieval_error: None,
            calls: Mutex::new(HashMap::new()),
            retrieval_queries: Mutex::new(Vec::new()),
            verify_contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn without_retrieval(mut self, direct_answer: &str) -> Self {
        self.needs_retrieval = false;
        self.direct_answer = direct_answer.to_string();
        self
    }

    /// Only documents containing `marker` are relevant
    pub fn relevant_if_contains(mut self, marker: &str) -> Self {
        self.relevant_marker = Some(marker.to_string());
        self
    }

    pub fn answers(mut self, answers: &[&str]) -> Self {
        self.answers = Queue::new(answers.iter().map(|a| a.to_string()).collect(), String::new());
        self
    }

    pub fn support(mut self, verdicts: &[SupportVerdict]) -> Self {
        self.support = Queue::new(verdicts.to_vec(), SupportVerdict::FullySupported);
        self
    }

    pub fn usefulness(mut self, verdicts: &[UsefulnessVerdict]) -> Self {
        self.usefulness = Queue::new(verdicts.to_vec(), UsefulnessVerdict::Useful);
        self
    }

    pub fn rewrites(mut self, queries: &[&str]) -> Self {
        self.rewrites = Queue::new(queries.iter().map(|q| q.to_string()).collect(), String::new());
        self
    }

    pub fn failing_retrieval(mut self, message: &str) -> Self {
        self.retrieval_error = Some(message.to_string());
        self
    }

    pub fn into_collaborators(self) -> (Arc<Self>, Collaborators) {
        let script = Arc::new(self);
        let collaborators = Collaborators {
            decider: script.clone(),
            direct: script.clone(),
            retriever: script.clone(),
            relevance: script.clone(),
            generator: script.clone(),
            verifier: script.clone(),
            reviser: script.clone(),
            usefulness: script.clone(),
            rewriter: script.clone(),
        };
        (script, collaborators)
    }

    pub fn calls(&self, role: &str) -> usize {
        self.calls.lock().unwrap().get(role).copied().unwrap_or(0)
    }

    pub fn retrieval_queries(&self) -> Vec<String> {
        self.retrieval_queries.lock().unwrap().clone()
    }

    pub fn verify_contexts(&self) -> Vec<String> {
        self.verify_contexts.lock().unwrap().clone()
    }

    fn record(&self, role: &'static str) {
        *self.calls.lock().unwrap().entry(role).or_default() += 1;
    }
}

#[async_trait]
impl RetrievalDecider for Scripted {
    async fn should_retrieve(&self, _query: &str) -> CollaboratorResult<bool> {
        self.record("decide");
        Ok(self.needs_retrieval)
    }
}

#[async_trait]
impl DirectGenerator for Scripted {
    async fn generate(&self, _query: &str) -> CollaboratorResult<String> {
        self.record("direct");
        Ok(self.direct_answer.clone())
    }
}

#[async_trait]
impl Retriever for Scripted {
    async fn retrieve(&self, query: &str) -> CollaboratorResult<Vec<Document>> {
        self.record("retrieve");
        self.retrieval_queries.lock().unwrap().push(query.to_string());
        match &self.retrieval_error {
            Some(message) => Err(CollaboratorError::Retrieval(message.clone())),
            None => Ok(self.corpus.clone()),
        }
    }
}

#[async_trait]
impl RelevanceJudge for Scripted {
    async fn is_relevant(&self, document: &str, _query: &str) -> CollaboratorResult<bool> {
        self.record("relevance");
        Ok(match &self.relevant_marker {
            Some(marker) => document.contains(marker.as_str()),
            None => true,
        })
    }
}

#[async_trait]
impl GroundedGenerator for Scripted {
    async fn generate(&self, _query: &str, _context: &str) -> CollaboratorResult<String> {
        self.record("generate");
        Ok(self.answers.next())
    }
}

#[async_trait]
impl SupportVerifier for Scripted {
    async fn verify(
        &self,
        _query: &str,
        context: &str,
        _answer: &str,
    ) -> CollaboratorResult<SupportAssessment> {
        self.record("verify");
        self.verify_contexts.lock().unwrap().push(context.to_string());
        Ok(SupportAssessment {
            issup: self.support.next(),
            evidence: vec!["Minimum reflux occurs at the pinch point.".to_string()],
        })
    }
}

#[async_trait]
impl AnswerReviser for Scripted {
    async fn revise(&self, _query: &str, _context: &str, answer: &str) -> CollaboratorResult<String> {
        self.record("revise");
        Ok(format!("{} [revised]", answer))
    }
}

#[async_trait]
impl UsefulnessJudge for Scripted {
    async fn judge(&self, _question: &str, _answer: &str) -> CollaboratorResult<UsefulnessAssessment> {
        self.record("usefulness");
        let isuse = self.usefulness.next();
        Ok(UsefulnessAssessment {
            isuse,
            reason: format!("scripted {}", isuse),
        })
    }
}

#[async_trait]
impl QueryRewriter for Scripted {
    async fn rewrite(
        &self,
        _question: &str,
        _previous_query: &str,
        _previous_answer: &str,
    ) -> CollaboratorResult<String> {
        self.record("rewrite");
        Ok(self.rewrites.next())
    }
}
