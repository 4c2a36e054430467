use lexis_core::{AudioChunk, ResultKind};
use lexis_engine::{ModelCache, NullRecognizer, RecognizerRegistry};
use lexis_session::RecognitionSession;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn poll_until_results(session: &RecognitionSession) -> Vec<lexis_core::SpeechResult> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let results = session.fetch_results();
        if !results.is_empty() || Instant::now() > deadline {
            return results;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_capture_shaped_audio_through_full_session() {
    // Resolve the backend the way the host does, through the registry
    let mut registry = RecognizerRegistry::new();
    registry.register(Arc::new(NullRecognizer::with_utterance_chunks(3)));
    let recognizer = registry.resolve("null").unwrap();

    let cache = Arc::new(ModelCache::new());
    let model_dir = tempfile::tempdir().unwrap();

    let session = RecognitionSession::new(recognizer, Arc::clone(&cache));
    session.set_model("en-us", model_dir.path());
    session.start_session();
    session.start_listening(false);

    // 48 kHz interleaved stereo, as a capture callback would deliver it
    for _ in 0..3 {
        let samples: Vec<f32> = (0..960)
            .flat_map(|i| {
                let value = (i as f32 * 0.01).sin() * 0.3;
                [value, value]
            })
            .collect();
        session.push_audio(AudioChunk {
            samples,
            sample_rate: 48_000,
            channels: 2,
            interleaved: true,
        });
    }

    let results = poll_until_results(&session);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].kind, ResultKind::Final);
    // 960 stereo samples -> 480 mono frames -> 160 after 48k->16k, per chunk
    assert_eq!(results[0].sentence, "480 samples");

    session.terminate_session();
    assert!(cache.is_empty());
}

#[test]
fn test_two_sessions_share_one_model() {
    let recognizer = Arc::new(NullRecognizer::with_utterance_chunks(1));
    let cache = Arc::new(ModelCache::new());
    let model_dir = tempfile::tempdir().unwrap();

    let first = RecognitionSession::new(recognizer.clone(), Arc::clone(&cache));
    let second = RecognitionSession::new(recognizer, Arc::clone(&cache));
    for session in [&first, &second] {
        session.set_model("en-us", model_dir.path());
        session.start_session();
        session.start_listening(false);
        session.push_audio(AudioChunk::mono(vec![0.1; 160], 16_000));
    }

    assert_eq!(poll_until_results(&first).len(), 1);
    assert_eq!(poll_until_results(&second).len(), 1);
    assert_eq!(cache.refcount("en-us"), Some(2));

    first.terminate_session();
    assert_eq!(cache.refcount("en-us"), Some(1));
    second.terminate_session();
    assert!(cache.is_empty());
}
