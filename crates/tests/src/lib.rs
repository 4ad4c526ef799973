//! Cross-crate integration tests for speakerdsp

#[cfg(test)]
mod engine_integration;
