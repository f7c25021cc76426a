

// Unit tests for orchestrator
mod conversation_filter_test;
