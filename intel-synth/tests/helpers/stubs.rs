//! Stub external services
//!
//! Every stub counts its calls and records its requests so tests can
//! assert that an operation made exactly the calls it should (often zero).

use async_trait::async_trait;
use intel_common::config::PipelineTuning;
use intel_synth::clients::{
    ChatCompletion, ChatRequest, ClientError, CompletionClient, DialogueRequest, SearchClient,
    SearchRequest, Services, SpeechClient, SpeechOutput,
};
use intel_synth::config::ModelSettings;
use intel_synth::types::{Query, SearchOutcome, TokenUsage};
use intel_synth::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type CompletionFn = dyn Fn(&ChatRequest) -> Result<ChatCompletion, ClientError> + Send + Sync;

// ============================================================================
// Completion
// ============================================================================

pub struct StubCompletion {
    respond: Box<CompletionFn>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl StubCompletion {
    pub fn with(
        respond: impl Fn(&ChatRequest) -> Result<ChatCompletion, ClientError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answer with `text`
    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::with(move |request| Ok(completion(Some(&text), &request.model)))
    }

    /// Always answer 2xx without content
    pub fn empty() -> Arc<Self> {
        Self::with(|request| Ok(completion(None, &request.model)))
    }

    pub fn failing(error: ClientError) -> Arc<Self> {
        Self::with(move |_| Err(error.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn models_tried(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.model.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn completion(content: Option<&str>, model: &str) -> ChatCompletion {
    ChatCompletion {
        content: content.map(str::to_string),
        usage: Some(TokenUsage::new(100, 50)),
        model: model.to_string(),
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        result
    }
}

// ============================================================================
// Search
// ============================================================================

/// How the search stub answers one query
#[derive(Debug, Clone)]
pub enum SearchBehavior {
    Reply(String),
    ReplyAfter(Duration, String),
    Fail(ClientError),
    NoContent,
    Panic,
}

pub struct StubSearch {
    default: SearchBehavior,
    per_query: HashMap<String, SearchBehavior>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubSearch {
    /// Answer every query with `Findings for <query>`
    pub fn echo() -> Arc<Self> {
        Self::build(SearchBehavior::Reply(String::new()), HashMap::new())
    }

    pub fn uniform(behavior: SearchBehavior) -> Arc<Self> {
        Self::build(behavior, HashMap::new())
    }

    /// Per-query behavior, echo for anything else
    pub fn scripted(per_query: Vec<(&str, SearchBehavior)>) -> Arc<Self> {
        Self::build(
            SearchBehavior::Reply(String::new()),
            per_query
                .into_iter()
                .map(|(q, b)| (q.to_string(), b))
                .collect(),
        )
    }

    fn build(default: SearchBehavior, per_query: HashMap<String, SearchBehavior>) -> Arc<Self> {
        Arc::new(Self {
            default,
            per_query,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently running searches observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Query text out of the search prompt's `Search for:` line
fn query_text(request: &SearchRequest) -> String {
    request
        .messages
        .iter()
        .flat_map(|m| m.content.lines())
        .find_map(|line| line.strip_prefix("Search for: "))
        .unwrap_or_default()
        .to_string()
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchClient for StubSearch {
    async fn search(&self, request: SearchRequest) -> Result<ChatCompletion, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let query = query_text(&request);
        let behavior = self
            .per_query
            .get(&query)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        // Yield so sibling tasks overlap even without explicit delays
        tokio::time::sleep(Duration::from_millis(5)).await;

        match behavior {
            SearchBehavior::Reply(text) if text.is_empty() => {
                Ok(completion(Some(&format!("Findings for {}", query)), "sonar"))
            }
            SearchBehavior::Reply(text) => Ok(completion(Some(&text), "sonar")),
            SearchBehavior::ReplyAfter(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(completion(Some(&text), "sonar"))
            }
            SearchBehavior::Fail(error) => Err(error),
            SearchBehavior::NoContent => Ok(completion(None, "sonar")),
            SearchBehavior::Panic => panic!("search stub panicked for {}", query),
        }
    }
}

// ============================================================================
// Speech
// ============================================================================

pub struct StubSpeech {
    transcript: String,
    fail: Option<ClientError>,
    calls: AtomicUsize,
    requests: Mutex<Vec<DialogueRequest>>,
}

impl StubSpeech {
    pub fn speaking(transcript: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: transcript.to_string(),
            fail: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ClientError) -> Arc<Self> {
        Arc::new(Self {
            transcript: String::new(),
            fail: Some(error),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DialogueRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechClient for StubSpeech {
    async fn synthesize(&self, request: DialogueRequest) -> Result<SpeechOutput, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(error) = &self.fail {
            return Err(error.clone());
        }
        Ok(SpeechOutput {
            audio: b"ID3fake-audio".to_vec(),
            format: "mp3".to_string(),
            transcript: self.transcript.clone(),
        })
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn services(
    completion: Option<Arc<StubCompletion>>,
    search: Option<Arc<StubSearch>>,
    speech: Option<Arc<StubSpeech>>,
) -> Services {
    Services {
        completion: completion.map(|c| c as Arc<dyn CompletionClient>),
        search: search.map(|s| s as Arc<dyn SearchClient>),
        speech: speech.map(|s| s as Arc<dyn SpeechClient>),
    }
}

pub fn test_state(services: Services) -> AppState {
    AppState::new(services, ModelSettings::default(), PipelineTuning::default())
}

pub fn outcome_ok(query: &str, response: &str) -> SearchOutcome {
    SearchOutcome::succeeded(&Query::new(query, "track it"), response.to_string(), None, 10)
}

pub fn outcome_failed(query: &str) -> SearchOutcome {
    SearchOutcome::failed(&Query::new(query, "track it"), "service returned 500: boom", 10)
}
