//! Snapshot tests for core types

#[cfg(test)]
mod snapshot_tests {
    use crate::{ChatResponse, Chunk, Document, Error};
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_chat_response_snapshot() {
        let response = ChatResponse {
            content: "Disk usage spiked on node-3".to_string(),
            model_name: "gemini-2.5-flash".to_string(),
            finish_reason: Some("STOP".to_string()),
            total_tokens: None,
        };

        assert_yaml_snapshot!(response, @r###"
        ---
        content: Disk usage spiked on node-3
        model_name: gemini-2.5-flash
        finish_reason: STOP
        "###);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::BackendNotRegistered("claude".to_string());
        assert_eq!(err.to_string(), "Chat backend 'claude' is not registered");

        let err = Error::chat("gemini", "quota exceeded");
        assert_eq!(err.to_string(), "Chat backend error (gemini): quota exceeded");
    }

    #[test]
    fn test_document_source() {
        let doc = Document::new("line").with_metadata("source", "logs/app.log");
        assert_eq!(doc.source(), Some("logs/app.log"));
        assert_eq!(Document::new("line").source(), None);
    }

    #[test]
    fn test_chunk_metadata_defaults_to_empty() {
        let chunk: Chunk =
            serde_json::from_str(r#"{"id": "c1", "text": "disk full"}"#).unwrap();
        assert_eq!(chunk.text, "disk full");
        assert!(chunk.metadata.is_empty());
    }
}
