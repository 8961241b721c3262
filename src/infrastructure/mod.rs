pub mod csv_source;
pub mod export;
pub mod greedy_clusterer;
pub mod keyword_classifier;
pub mod tfidf;
