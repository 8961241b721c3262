// Core records: documents, topic assignments, aggregated stats
pub mod types;

// Binary polarity scale and normalization
pub mod sentiment;

// Collaborator contracts (embedding, clustering, classification)
pub mod ports;

// Domain-specific error types
pub mod errors;
