use super::*;
use async_trait::async_trait;
use insta::assert_snapshot;
use lograg_core::{ChatBackend, ChatResponse, RetrievalResult};
use lograg_rag::{
    BackendFactory, BackendSelector, PipelineConfig, RetrievalPipeline, SelectorConfig, TextChunker,
};
use std::sync::Arc;
use tempfile::TempDir;

struct FixedAnswer;

#[async_trait]
impl ChatBackend for FixedAnswer {
    async fn invoke(&self, _prompt: &str) -> Result<ChatResponse> {
        Ok(ChatResponse::new("Mostly database retries.", "fixed"))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct Unreachable;

#[async_trait]
impl ChatBackend for Unreachable {
    async fn invoke(&self, _prompt: &str) -> Result<ChatResponse> {
        Err(Error::chat("unreachable", "connection refused"))
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

fn pipeline_for(dir: &TempDir, factory: BackendFactory) -> RetrievalPipeline {
    RetrievalPipeline::builder()
        .config(PipelineConfig {
            loader_path: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        })
        .selector(BackendSelector::new(SelectorConfig::new("stub"), factory))
        .build()
        .unwrap()
}

#[test]
fn test_format_match_truncates_to_preview_length() {
    let long = RetrievalResult::new("x".repeat(250));
    let line = format_match(&long);
    assert_eq!(line, format!("- \"{}\" ...", "x".repeat(MATCH_PREVIEW_CHARS)));

    let short = RetrievalResult {
        score: Some(0.5),
        ..RetrievalResult::new("db timeout\nretry")
    };
    assert_snapshot!(format_match(&short), @r#"- "db timeout\nretry" ... (0.500)"#);
}

#[test]
fn test_format_chunks() {
    let chunks = vec!["a\nb".to_string(), "b\nc".to_string()];
    assert_snapshot!(format_chunks(&chunks), @r###"
    [0]
        a
        b
    [1]
        b
        c
    "###);
}

#[tokio::test]
async fn test_run_query_returns_matches_and_answer() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("app.log"), "start\ndb timeout\nretry\ndb ok").unwrap();

    let factory: BackendFactory =
        Arc::new(|| -> Result<Box<dyn ChatBackend>> { Ok(Box::new(FixedAnswer)) });
    let pipeline = pipeline_for(&dir, factory);

    let outcome = run_query(&pipeline, DEMO_QUERY, 2).await.unwrap();
    assert_eq!(outcome.matches.len(), 2);
    assert_eq!(outcome.response.content, "Mostly database retries.");
}

#[tokio::test]
async fn test_run_query_propagates_chat_failure() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("app.log"), "one\ntwo").unwrap();

    let factory: BackendFactory =
        Arc::new(|| -> Result<Box<dyn ChatBackend>> { Ok(Box::new(Unreachable)) });
    let pipeline = pipeline_for(&dir, factory);

    let err = run_query(&pipeline, "anything", 3).await.unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_run_chunks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("boot.log");
    std::fs::write(&path, "l1\nl2\nl3\nl4\nl5\nl6").unwrap();

    let chunks = run_chunks(&path, &TextChunker::new(3, 1).unwrap())
        .await
        .unwrap();
    assert_eq!(chunks, vec!["l1\nl2\nl3", "l3\nl4\nl5", "l5\nl6"]);

    let chunker = TextChunker::new(2, 1).unwrap();
    let missing = run_chunks(&dir.path().join("absent.log"), &chunker).await;
    assert!(matches!(missing, Err(Error::DocumentLoader(_))));
}
