//! Prompt construction for the model-backed collaborators
//!
//! Every builder returns the full message list for one call. Judges get a
//! system message describing the exact JSON shape they must produce.

use selfrag_graph::Message;

const CITATION_RULES: &str = "\
Use only facts stated in the context. Do not add outside knowledge or fill in missing steps.
End every paragraph with exactly one citation copied from the context, in the form
(Source: <file>, Page: <page>). Never invent a source or page number.
If the context lacks detail on some aspect, say: \"The provided context does not contain sufficient detail on this aspect.\"";

pub fn decide_retrieval(query: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You decide whether answering a question requires looking up external documents.\n\
             Reply with a JSON object: {\"should_retrieve\": true|false}.\n\
             Choose true when the answer needs specific facts, figures, equations or citations.\n\
             Choose false for general explanations or definitions.\n\
             When unsure, choose true.",
        ),
        Message::human(format!("Question:\n{}", query)),
    ]
}

pub fn direct_answer(query: &str) -> Vec<Message> {
    vec![
        Message::system(
            "Answer from general knowledge only; you have no documents.\n\
             If the question needs specific sources you do not have, reply exactly:\n\
             \"I don't know based on my general knowledge.\"",
        ),
        Message::human(query.to_string()),
    ]
}

pub fn judge_relevance(document: &str, query: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You check whether a document helps answer a question.\n\
             Reply with a JSON object: {\"is_relevant\": true|false}.\n\
             A document is relevant if it contains information useful for answering.",
        ),
        Message::human(format!("Document:\n{}\n\nQuestion:\n{}", document, query)),
    ]
}

pub fn grounded_answer(query: &str, context: &str) -> Vec<Message> {
    vec![
        Message::system(format!(
            "You write answers grounded strictly in the supplied context.\n{}\n\
             Open with a short overview paragraph, then explain in sections or bullet points.",
            CITATION_RULES
        )),
        Message::human(format!("Question:\n{}\n\nContext:\n{}", query, context)),
    ]
}

pub fn verify_support(query: &str, context: &str, answer: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You verify whether an answer is supported by a context. Be strict.\n\
             Reply with a JSON object: {\"issup\": ..., \"evidence\": [...]}.\n\
             issup must be one of:\n\
             - \"fully_supported\": every technical claim is stated in the context and nothing is added.\n\
             - \"partially_supported\": the core facts are in the context but the answer adds any \
             interpretation, inference or phrasing not found there.\n\
             - \"no_support\": key claims are missing from the context or rely on outside knowledge.\n\
             If torn between two levels, pick the lower one.\n\
             evidence holds up to 3 short quotes copied verbatim from the context; use [] when nothing is supported.",
        ),
        Message::human(format!(
            "Question:\n{}\n\nAnswer:\n{}\n\nContext:\n{}",
            query, answer, context
        )),
    ]
}

pub fn revise_answer(query: &str, context: &str, answer: &str) -> Vec<Message> {
    vec![
        Message::system(format!(
            "The previous answer was not fully supported by the context. Rewrite it so that it is.\n\
             Remove any statement the context does not back up.\n{}\n\
             Output only the revised answer.",
            CITATION_RULES
        )),
        Message::human(format!(
            "Question:\n{}\n\nPrevious answer:\n{}\n\nContext:\n{}",
            query, answer, context
        )),
    ]
}

pub fn judge_usefulness(question: &str, answer: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You judge whether an answer actually addresses the question asked.\n\
             Reply with a JSON object: {\"isuse\": \"useful\"|\"not_useful\", \"reason\": \"<one short line>\"}.\n\
             useful: it directly answers the question or gives the requested information.\n\
             not_useful: it is generic, off-topic, incomplete or dodges the question.\n\
             A partial answer is not_useful. Do not re-check grounding and do not use outside knowledge.",
        ),
        Message::human(format!("Question:\n{}\n\nAnswer:\n{}", question, answer)),
    ]
}

pub fn rewrite_query(question: &str, previous_query: &str, previous_answer: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You rewrite a question into a short search query for a technical document index.\n\
             Reply with a JSON object: {\"retrieval_query\": \"...\"}.\n\
             Keep it to 8-16 words, keep the key entities, add a few domain keywords likely to \
             appear in textbooks, drop filler words. Do not answer the question.",
        ),
        Message::human(format!(
            "Question:\n{}\n\nPrevious search query:\n{}\n\nPrevious answer:\n{}",
            question, previous_query, previous_answer
        )),
    ]
}
