use crate::EngineError;
use serde_json::Value;
use std::collections::HashMap;

/// Sentinel for per-word confidence/timing the backend did not supply.
pub const UNKNOWN_METADATA: f32 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// In-progress transcription, emitted before the utterance completes.
    Partial,
    /// The recognizer's best transcription of a completed utterance.
    Final,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultWord {
    pub word: String,
    pub confidence: f32,
    pub start_time: f32,
    pub end_time: f32,
}

/// One recognized sentence with its per-word breakdown.
///
/// `word_index` maps each word to its positions in `words` and is maintained
/// incrementally by `add_word`; the two never diverge.
#[derive(Debug, Clone)]
pub struct SpeechResult {
    pub kind: ResultKind,
    pub sentence: String,
    pub confidence: f32,
    pub words: Vec<ResultWord>,
    pub word_index: HashMap<String, Vec<usize>>,
}

impl SpeechResult {
    pub fn new(kind: ResultKind, sentence: impl Into<String>) -> Self {
        Self {
            kind,
            sentence: sentence.into(),
            confidence: 0.0,
            words: Vec::new(),
            word_index: HashMap::new(),
        }
    }

    pub fn add_word(&mut self, word: &str, confidence: f32, start_time: f32, end_time: f32) {
        let position = self.words.len();
        self.words.push(ResultWord {
            word: word.to_string(),
            confidence,
            start_time,
            end_time,
        });
        self.word_index
            .entry(word.to_string())
            .or_default()
            .push(position);
    }

    /// Populate `words` by whitespace-splitting the sentence, for backends
    /// that return no per-word breakdown. Metadata is the unknown sentinel.
    pub fn split_sentence(&mut self) {
        let sentence = std::mem::take(&mut self.sentence);
        for word in sentence.split_whitespace() {
            self.add_word(word, UNKNOWN_METADATA, UNKNOWN_METADATA, UNKNOWN_METADATA);
        }
        self.sentence = sentence;
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.word_index.contains_key(word)
    }

    pub fn contains_any_word<S: AsRef<str>>(&self, words: &[S]) -> bool {
        words.iter().any(|w| self.word_index.contains_key(w.as_ref()))
    }

    pub fn contains_all_words<S: AsRef<str>>(&self, words: &[S]) -> bool {
        words.iter().all(|w| self.word_index.contains_key(w.as_ref()))
    }

    /// Score how much of `words` appears in this result in order, as a
    /// percentage of `words`. Passing a cutoff of 50.0 asks that at least
    /// half the words show up, in order.
    pub fn contains_words_in_order<S: AsRef<str>>(
        &self,
        words: &[S],
        score_cutoff: f32,
    ) -> (bool, f32) {
        if words.is_empty() {
            return (false, 0.0);
        }

        let mut cursor = 0;
        let mut found = 0usize;
        for word in words {
            for (offset, candidate) in self.words[cursor..].iter().enumerate() {
                if candidate.word == word.as_ref() {
                    found += 1;
                    cursor += offset + 1;
                    break;
                }
            }
        }

        let score = (found as f32 / words.len() as f32) * 100.0;
        (score >= score_cutoff, score)
    }
}

/// The unit moved through a session's output queue: all results produced by
/// one recognition step. Alternatives stay grouped so a dequeue never splits
/// them.
#[derive(Debug, Clone, Default)]
pub struct ResultBatch {
    pub results: Vec<SpeechResult>,
}

impl ResultBatch {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Parse a recognizer JSON payload into a batch.
    ///
    /// Top-level `alternatives` arrays yield one result per entry. A `text`
    /// field marks a final result, `partial` a partial one. Results with an
    /// empty sentence are skipped, so an empty batch means "nothing worth
    /// surfacing", not a failure. Only malformed JSON is an error.
    pub fn from_json(payload: &str) -> Result<Self, EngineError> {
        let root: Value = serde_json::from_str(payload)
            .map_err(|e| EngineError::ResultParseFailed(e.to_string()))?;

        let mut batch = ResultBatch::default();
        if let Some(alternatives) = root.get("alternatives").and_then(Value::as_array) {
            for alternative in alternatives {
                if let Some(result) = parse_result_object(alternative) {
                    batch.results.push(result);
                }
            }
        } else if let Some(result) = parse_result_object(&root) {
            batch.results.push(result);
        }

        Ok(batch)
    }
}

fn parse_result_object(object: &Value) -> Option<SpeechResult> {
    let (kind, sentence) = if let Some(text) = object.get("text").and_then(Value::as_str) {
        (ResultKind::Final, text)
    } else if let Some(partial) = object.get("partial").and_then(Value::as_str) {
        (ResultKind::Partial, partial)
    } else {
        tracing::error!("recognizer result has neither 'text' nor 'partial'");
        return None;
    };

    if sentence.is_empty() {
        return None;
    }

    let mut result = SpeechResult::new(kind, sentence);
    if let Some(confidence) = object.get("confidence").and_then(Value::as_f64) {
        result.confidence = confidence as f32;
    }

    match object.get("result").and_then(Value::as_array) {
        Some(words) => {
            for entry in words {
                let confidence = entry
                    .get("conf")
                    .and_then(Value::as_f64)
                    .unwrap_or(UNKNOWN_METADATA as f64) as f32;
                let word = entry.get("word").and_then(Value::as_str);
                let start = entry.get("start").and_then(Value::as_f64);
                let end = entry.get("end").and_then(Value::as_f64);
                match (word, start, end) {
                    (Some(word), Some(start), Some(end)) => {
                        result.add_word(word, confidence, start as f32, end as f32);
                    }
                    _ => tracing::error!("recognizer word entry is missing fields"),
                }
            }
        }
        None => result.split_sentence(),
    }

    Some(result)
}
