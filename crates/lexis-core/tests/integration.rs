use lexis_core::{ResultBatch, ResultKind, UNKNOWN_METADATA};

#[test]
fn test_recognizer_payload_to_queryable_result() {
    // The shape a streaming backend emits once an utterance completes
    let payload = r#"{
        "text": "turn the lights on",
        "confidence": 0.92,
        "result": [
            {"word": "turn", "conf": 0.95, "start": 0.00, "end": 0.21},
            {"word": "the", "conf": 0.99, "start": 0.21, "end": 0.30},
            {"word": "lights", "conf": 0.90, "start": 0.30, "end": 0.74},
            {"word": "on", "conf": 0.88, "start": 0.74, "end": 0.95}
        ]
    }"#;

    let batch = ResultBatch::from_json(payload).unwrap();
    assert_eq!(batch.results.len(), 1);

    let result = &batch.results[0];
    assert_eq!(result.kind, ResultKind::Final);
    assert!(result.contains_all_words(&["turn", "lights", "on"]));

    let (in_order, score) = result.contains_words_in_order(&["turn", "on"], 100.0);
    assert!(in_order);
    assert_eq!(score, 100.0);

    // word_index agrees with the words list for every entry
    for (position, word) in result.words.iter().enumerate() {
        assert!(result.word_index[&word.word].contains(&position));
    }
}

#[test]
fn test_partial_payload_uses_sentinel_metadata() {
    let batch = ResultBatch::from_json(r#"{"partial": "turn the"}"#).unwrap();
    let result = &batch.results[0];
    assert_eq!(result.kind, ResultKind::Partial);
    for word in &result.words {
        assert_eq!(word.confidence, UNKNOWN_METADATA);
        assert_eq!(word.start_time, UNKNOWN_METADATA);
        assert_eq!(word.end_time, UNKNOWN_METADATA);
    }
}
