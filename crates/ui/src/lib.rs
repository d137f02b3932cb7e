#![deny(unsafe_code)]

/// Local-model chat panels.
///
/// Each panel relays prompts to an Ollama server and shows the streamed answer
/// once it is complete.
pub mod app;
/// Chat domain, request controller and panel views.
pub mod chat;
/// Startup configuration.
pub mod settings;
