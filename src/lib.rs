pub mod cli;
pub mod config;
pub mod conflict;
pub mod crew;
pub mod doctor;
pub mod error;
pub mod llm;
pub mod podcast;
pub mod provider;
pub mod telemetry;
pub mod theme;
pub mod tools;

#[cfg(test)]
mod tests;
