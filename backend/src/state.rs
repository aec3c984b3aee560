// Application state

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::lexicon::Lexicon;
use crate::upstream::{GeminiClient, ScriptedGenerator, TextGenerator};

/// Central application state. Clone-friendly; everything inside is an `Arc`
/// or immutable. Per-request session state lives in `relay::RelaySession`,
/// never here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lexicon: Arc<Lexicon>,
    /// Backend for the streaming copy endpoint.
    pub generator: Arc<dyn TextGenerator>,
    /// Backend for the structured quote endpoint.
    pub quote_generator: Arc<dyn TextGenerator>,
    pub start_time: Instant,
    /// `true` once startup completes.
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
        tracing::info!("Backend marked as READY");
    }
}

impl AppState {
    pub fn new(config: Config, lexicon: Lexicon) -> Self {
        // No total timeout here: streams are bounded by the session idle timeout
        // and single-shot requests set their own.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        let stream_client = GeminiClient::new(
            http_client.clone(),
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
        );
        let quote_client = GeminiClient::new(
            http_client,
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_quote_api_key.clone(),
        )
        .with_request_timeout(config.request_timeout);

        tracing::info!("AppState initialised: {}", config.redacted_summary());

        Self::with_generators(config, lexicon, Arc::new(stream_client), Arc::new(quote_client))
    }

    /// Assemble state around arbitrary backends.
    pub fn with_generators(
        config: Config,
        lexicon: Lexicon,
        generator: Arc<dyn TextGenerator>,
        quote_generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            lexicon: Arc::new(lexicon),
            generator,
            quote_generator,
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Test-only constructor: default config, built-in lexicon, and a backend
    /// that is always unavailable. No network access.
    #[doc(hidden)]
    pub fn new_test() -> Self {
        let backend: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::unavailable());
        Self::with_generators(Config::default(), Lexicon::default(), backend.clone(), backend)
    }
}
