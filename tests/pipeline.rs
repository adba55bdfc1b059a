//! End-to-end pipeline tests with scripted collaborators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use auditsmith::audit::memory::refine_memory;
use auditsmith::audit::{AuditPipeline, CHUNK_REPORTS_FIELD};
use auditsmith::providers::{ChatProvider, ChatReply, MockEmbeddingProvider};
use auditsmith::types::{AuditError, ReferencePassage};

/// Pops one scripted reply per call and records every request it saw.
struct ScriptedChat {
    replies: Mutex<VecDeque<ChatReply>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedChat {
    fn new(replies: Vec<ChatReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ChatReply, AuditError> {
        self.requests
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(AuditError::Provider {
                provider: "scripted-chat",
                message: "no scripted reply left".to_string(),
            })
    }
}

struct FailingChat;

#[async_trait]
impl ChatProvider for FailingChat {
    async fn complete(&self, _: &str, _: &str) -> Result<ChatReply, AuditError> {
        Err(AuditError::Provider {
            provider: "failing-chat",
            message: "transport down".to_string(),
        })
    }
}

fn corpus() -> Vec<ReferencePassage> {
    vec![ReferencePassage::new(
        "law.txt",
        "第一条",
        "第一条 合同当事人应当遵循公平原则。",
    )]
}

fn chunk_reply(index: usize) -> ChatReply {
    ChatReply::new(
        json!({"summary": format!("part {index} summary"), "risks": []}).to_string(),
    )
    .with_usage(json!({"prompt_total": 10, "prompt_cached": 3, "completion": 5}))
}

fn merge_reply() -> ChatReply {
    ChatReply::new(json!({"summary": "merged", "risks": []}).to_string())
        .with_usage(json!({"prompt_total": 7, "prompt_cached": 1, "completion": 2}))
}

fn pipeline(chat: Arc<dyn ChatProvider>, max_chunk_chars: usize) -> AuditPipeline {
    AuditPipeline::builder()
        .chat_arc(chat)
        .embedder(MockEmbeddingProvider::new())
        .max_chunk_chars(max_chunk_chars)
        .top_k(1)
        .build()
}

#[tokio::test]
async fn two_paragraph_document_splits_into_two_ordered_chunks() {
    let chat = ScriptedChat::new(vec![chunk_reply(1), chunk_reply(2), merge_reply()]);
    let document = "第一段：甲方应当在30日内支付服务费。\n\n第二段：乙方负责交付成果。";

    let outcome = pipeline(chat.clone(), 30)
        .run(document, &corpus(), "")
        .await
        .unwrap();

    let partials = outcome.report[CHUNK_REPORTS_FIELD].as_array().unwrap();
    assert_eq!(partials.len(), 2);
    let indices: Vec<u64> = partials
        .iter()
        .map(|partial| partial["chunk_index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![1, 2]);
    assert!(partials.iter().all(|p| p["chunk_total"] == json!(2)));
    assert_eq!(outcome.report["summary"], json!("merged"));

    // Three generation calls: two chunks plus the merge pass.
    assert_eq!(chat.requests().len(), 3);
}

#[tokio::test]
async fn later_chunks_see_earlier_partial_results() {
    let chat = ScriptedChat::new(vec![chunk_reply(1), chunk_reply(2), merge_reply()]);
    let document = "aaaa aaaa aaaa\n\nbbbb bbbb bbbb";

    pipeline(chat.clone(), 20)
        .run(document, &corpus(), "memory-note")
        .await
        .unwrap();

    let requests = chat.requests();
    assert!(!requests[0].1.contains("part 1 summary"));
    assert!(requests[1].1.contains("part 1 summary"));
    assert!(requests[2].1.contains("part 1 summary"));
    assert!(requests[2].1.contains("part 2 summary"));
    for (_, user_prompt) in &requests {
        assert!(user_prompt.contains("memory-note"));
    }
}

#[tokio::test]
async fn usage_accumulates_across_chunks_and_merge() {
    let chat = ScriptedChat::new(vec![chunk_reply(1), merge_reply()]);

    let outcome = pipeline(chat, 0)
        .run("short document fits in one chunk", &corpus(), "")
        .await
        .unwrap();

    assert_eq!(outcome.usage.prompt_total, 17);
    assert_eq!(outcome.usage.prompt_cached, 4);
    assert_eq!(outcome.usage.prompt_uncached, 13);
    assert_eq!(outcome.usage.completion, 7);
}

#[tokio::test]
async fn single_chunk_documents_still_get_a_merge_pass() {
    let chat = ScriptedChat::new(vec![chunk_reply(1), merge_reply()]);

    let outcome = pipeline(chat.clone(), 10_000)
        .run("one small document", &corpus(), "")
        .await
        .unwrap();

    assert_eq!(chat.requests().len(), 2);
    let partials = outcome.report[CHUNK_REPORTS_FIELD].as_array().unwrap();
    assert_eq!(partials.len(), 1);
    assert_eq!(partials[0]["chunk_text"], json!("one small document"));
}

#[tokio::test]
async fn malformed_chunk_replies_are_absorbed() {
    let chat = ScriptedChat::new(vec![
        ChatReply::new(r#"Sure! Here is the report: {"summary":"noisy","risks":[],} done."#),
        ChatReply::new(json!({"summary": "final", "risks": []}).to_string()),
    ]);

    let outcome = pipeline(chat, 0)
        .run("document body", &corpus(), "")
        .await
        .unwrap();

    let partials = outcome.report[CHUNK_REPORTS_FIELD].as_array().unwrap();
    assert_eq!(partials[0]["summary"], json!("noisy"));
    assert_eq!(partials[0]["risks"], json!([]));
}

#[tokio::test]
async fn braceless_reply_is_fatal() {
    let chat = ScriptedChat::new(vec![ChatReply::new("I cannot answer that.")]);

    let err = pipeline(chat, 0)
        .run("document body", &corpus(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::MissingJsonObject));
}

#[tokio::test]
async fn provider_failure_aborts_the_run() {
    let err = pipeline(Arc::new(FailingChat), 0)
        .run("document body", &corpus(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::Provider { .. }));
}

#[tokio::test]
async fn empty_inputs_are_rejected_up_front() {
    let chat = ScriptedChat::new(vec![]);
    let pipeline = pipeline(chat.clone(), 0);

    let err = pipeline.run("   ", &corpus(), "").await.unwrap_err();
    assert!(matches!(err, AuditError::EmptyDocument));

    let err = pipeline.run("document", &[], "").await.unwrap_err();
    assert!(matches!(err, AuditError::EmptyCorpus));

    // Neither error reached a collaborator.
    assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn refine_memory_appends_below_budget() {
    let chat = ScriptedChat::new(vec![ChatReply::new("- prefer strict deadlines")]);

    let updated = refine_memory(
        chat.as_ref(),
        "- earlier note",
        "the deadline risk was missed",
        &json!({"summary": "s", "risks": []}),
        1000,
    )
    .await
    .unwrap();

    assert_eq!(updated, "- earlier note\n\n- prefer strict deadlines");
    assert_eq!(chat.requests().len(), 1, "no compression below budget");
}

#[tokio::test]
async fn refine_memory_compresses_at_budget() {
    let chat = ScriptedChat::new(vec![
        ChatReply::new("- new entry"),
        ChatReply::new("compressed memory that is far too long for the budget"),
    ]);
    let full_memory = "x".repeat(40);

    let updated = refine_memory(
        chat.as_ref(),
        &full_memory,
        "feedback",
        &json!({"summary": "s", "risks": []}),
        40,
    )
    .await
    .unwrap();

    assert_eq!(chat.requests().len(), 2, "distill then compress");
    assert!(updated.chars().count() <= 40);
}
