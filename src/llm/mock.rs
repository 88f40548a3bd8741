//! Scripted model stub for deterministic crew runs in tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::{Llm, LlmRequest, LlmResponse};

pub struct MockLlm {
    name: String,
    responses: Mutex<VecDeque<String>>,
    fallback: Mutex<Option<String>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue one response; the last queued response also becomes the fallback
    /// once the queue drains.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(text.clone());
        *self.fallback.lock().unwrap_or_else(|e| e.into_inner()) = Some(text);
        self
    }

    pub fn with_responses<I, S>(self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = self;
        for text in texts {
            out = out.with_response(text);
        }
        out
    }

    /// All requests seen so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Llm for MockLlm {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let content = match next {
            Some(text) => text,
            None => self
                .fallback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
                .ok_or_else(|| anyhow::anyhow!("mock model has no scripted response"))?,
        };

        Ok(LlmResponse {
            content,
            model: self.name.clone(),
            usage: None,
        })
    }

    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
