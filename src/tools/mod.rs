//! Agent tools.
//!
//! A tool takes a free-text input and returns free-text output. The crew
//! runtime forwards whatever the tool produces into the task prompt without
//! ranking or post-processing.

pub mod web_search;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn call(&self, input: &str) -> Result<String>;
}
