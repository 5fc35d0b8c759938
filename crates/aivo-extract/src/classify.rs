//! Intent classification with a query-hash-keyed cache.
//!
//! The hash canonicalizes the prompt (case and whitespace insensitive) so
//! reworded spacing does not defeat the cache. A hit skips the classifier
//! LLM entirely — zero incremental cost. Writes are insert-if-absent, so
//! concurrent population and repeated runs are idempotent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aivo_core::IntentClassification;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::ExtractError;
use crate::llm::AnalysisLlm;

/// Canonical hash of an intent prompt: lowercased, whitespace collapsed,
/// SHA-256, hex-encoded.
#[must_use]
pub fn query_hash(prompt: &str) -> String {
    let canonical = prompt
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

/// Cache of classifications keyed by [`query_hash`].
///
/// Writes are idempotent by construction: `insert_if_absent` is the only
/// mutation, so concurrent population needs no locking discipline from
/// callers.
pub trait ClassificationCache: Send + Sync {
    fn get(&self, query_hash: &str) -> Option<IntentClassification>;

    /// Stores the entry unless its hash is already present. Returns `true`
    /// when a write happened.
    fn insert_if_absent(&self, classification: IntentClassification) -> bool;
}

/// Process-local cache, used by tests and as the default when no cache
/// path is configured.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, IntentClassification>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClassificationCache for MemoryCache {
    fn get(&self, query_hash: &str) -> Option<IntentClassification> {
        self.entries
            .lock()
            .expect("classification cache lock poisoned")
            .get(query_hash)
            .cloned()
    }

    fn insert_if_absent(&self, classification: IntentClassification) -> bool {
        let mut entries = self
            .entries
            .lock()
            .expect("classification cache lock poisoned");
        if entries.contains_key(&classification.query_hash) {
            return false;
        }
        entries.insert(classification.query_hash.clone(), classification);
        true
    }
}

/// JSON-file-backed cache persisting across runs.
///
/// The whole map is rewritten on insert; classification volumes are tiny
/// (one entry per distinct prompt ever configured). Write failures are
/// logged and the in-memory copy stays authoritative for the rest of the
/// process.
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, IntentClassification>>,
}

impl FileCache {
    /// Opens the cache, loading any existing entries. A missing file is an
    /// empty cache; a corrupt file is an error so a damaged cache never
    /// silently re-bills every classification.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Cache`] if the file exists but cannot be
    /// read or parsed.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let entries = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(ExtractError::Cache(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ExtractError::Cache(format!("failed to parse {}: {e}", path.display()))
            })?,
        };

        Ok(Self {
            path: path.to_owned(),
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, IntentClassification>) {
        match serde_json::to_string_pretty(entries) {
            Ok(serialized) => {
                if let Err(e) = std::fs::write(&self.path, serialized) {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to persist classification cache"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize classification cache");
            }
        }
    }
}

impl ClassificationCache for FileCache {
    fn get(&self, query_hash: &str) -> Option<IntentClassification> {
        self.entries
            .lock()
            .expect("classification cache lock poisoned")
            .get(query_hash)
            .cloned()
    }

    fn insert_if_absent(&self, classification: IntentClassification) -> bool {
        let mut entries = self
            .entries
            .lock()
            .expect("classification cache lock poisoned");
        if entries.contains_key(&classification.query_hash) {
            return false;
        }
        entries.insert(classification.query_hash.clone(), classification);
        self.persist(&entries);
        true
    }
}

#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    intent_type: String,
    buyer_stage: String,
    urgency_signal: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

const CLASSIFY_SYSTEM_PROMPT: &str = "You classify a user's search query about software products. \
     Respond with JSON only: {\"intent_type\": string, \"buyer_stage\": string, \
     \"urgency_signal\": string, \"confidence\": number 0-1, \"reasoning\": string}.";

/// Classifies one intent prompt, consulting the cache first.
///
/// Returns the classification, the incremental LLM cost (zero on a cache
/// hit), and whether the result came from the cache.
///
/// # Errors
///
/// Returns [`ExtractError`] if the LLM call fails or its output does not
/// match the contract. Callers treat this as a degraded path, not a unit
/// failure.
pub async fn classify_intent(
    llm: &dyn AnalysisLlm,
    cache: &dyn ClassificationCache,
    prompt: &str,
) -> Result<(IntentClassification, f64, bool), ExtractError> {
    let hash = query_hash(prompt);

    if let Some(cached) = cache.get(&hash) {
        return Ok((cached, 0.0, true));
    }

    let user = format!("Query:\n{prompt}");
    let response = llm.complete_json(CLASSIFY_SYSTEM_PROMPT, &user).await?;
    let payload: ClassificationPayload = serde_json::from_value(response.value)
        .map_err(|e| ExtractError::MalformedOutput(e.to_string()))?;

    let classification = IntentClassification {
        query_hash: hash,
        intent_type: payload.intent_type,
        buyer_stage: payload.buyer_stage,
        urgency_signal: payload.urgency_signal,
        confidence: payload.confidence,
        reasoning: payload.reasoning,
    };

    cache.insert_if_absent(classification.clone());

    Ok((classification, response.cost_usd, false))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{LlmJson, LlmText};

    #[test]
    fn hash_ignores_case_and_whitespace() {
        assert_eq!(query_hash("Best CRM tools"), query_hash("  best   crm TOOLS "));
        assert_ne!(query_hash("best crm tools"), query_hash("best erp tools"));
    }

    fn classification(hash: &str, intent_type: &str) -> IntentClassification {
        IntentClassification {
            query_hash: hash.to_string(),
            intent_type: intent_type.to_string(),
            buyer_stage: "evaluation".to_string(),
            urgency_signal: "low".to_string(),
            confidence: 0.9,
            reasoning: String::new(),
        }
    }

    #[test]
    fn memory_cache_insert_is_idempotent() {
        let cache = MemoryCache::new();
        assert!(cache.insert_if_absent(classification("h1", "commercial")));
        assert!(!cache.insert_if_absent(classification("h1", "different")));
        // The first write wins.
        assert_eq!(cache.get("h1").unwrap().intent_type, "commercial");
    }

    struct CountingLlm {
        calls: AtomicU32,
    }

    #[async_trait]
    impl AnalysisLlm for CountingLlm {
        async fn complete_json(&self, _system: &str, _user: &str) -> Result<LlmJson, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmJson {
                value: serde_json::json!({
                    "intent_type": "commercial_investigation",
                    "buyer_stage": "evaluation",
                    "urgency_signal": "low",
                    "confidence": 0.85,
                    "reasoning": "comparison query"
                }),
                cost_usd: 0.002,
            })
        }

        async fn complete_text(
            &self,
            _prompt: &str,
            _model: Option<&str>,
        ) -> Result<LlmText, ExtractError> {
            unreachable!("classification never uses text completions")
        }
    }

    #[tokio::test]
    async fn second_classification_is_served_from_cache() {
        let llm = CountingLlm {
            calls: AtomicU32::new(0),
        };
        let cache = MemoryCache::new();

        let (first, cost, from_cache) = classify_intent(&llm, &cache, "best CRM tools")
            .await
            .unwrap();
        assert!(!from_cache);
        assert!((cost - 0.002).abs() < 1e-9);
        assert_eq!(first.intent_type, "commercial_investigation");

        // Same prompt, different whitespace: must not re-invoke the LLM.
        let (second, cost, from_cache) = classify_intent(&llm, &cache, "  Best   CRM tools ")
            .await
            .unwrap();
        assert!(from_cache);
        assert!((cost - 0.0).abs() < f64::EPSILON);
        assert_eq!(second.query_hash, first.query_hash);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    struct MalformedLlm;

    #[async_trait]
    impl AnalysisLlm for MalformedLlm {
        async fn complete_json(&self, _system: &str, _user: &str) -> Result<LlmJson, ExtractError> {
            Ok(LlmJson {
                value: serde_json::json!({ "intent_type": 7 }),
                cost_usd: 0.0,
            })
        }

        async fn complete_text(
            &self,
            _prompt: &str,
            _model: Option<&str>,
        ) -> Result<LlmText, ExtractError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_an_extract_error() {
        let cache = MemoryCache::new();
        let err = classify_intent(&MalformedLlm, &cache, "best CRM tools")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::MalformedOutput(_)));
    }

    #[test]
    fn file_cache_round_trips() {
        let path = std::env::temp_dir().join(format!(
            "aivo-classification-cache-test-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        {
            let cache = FileCache::open(&path).unwrap();
            assert!(cache.get("h1").is_none());
            assert!(cache.insert_if_absent(classification("h1", "commercial")));
        }
        {
            let cache = FileCache::open(&path).unwrap();
            assert_eq!(cache.get("h1").unwrap().intent_type, "commercial");
            assert!(!cache.insert_if_absent(classification("h1", "other")));
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_empty_cache() {
        let path = std::env::temp_dir().join(format!(
            "aivo-classification-cache-missing-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let cache = FileCache::open(&path).unwrap();
        assert!(cache.get("anything").is_none());
        let _ = std::fs::remove_file(&path);
    }
}
