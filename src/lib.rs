//! Penpal: an AI journaling assistant built on retrieval-augmented generation.
//!
//! Journal entries are embedded with all-MiniLM-L6-v2 and stored in a vector
//! index. A question is answered in two model passes over the entries most
//! similar to it:
//!
//! 1. embed the question and fetch the `top_k` nearest entries,
//! 2. drop matches below the similarity threshold,
//! 3. ask the model to condense the surviving entries into a summary that only
//!    keeps what matters for the question,
//! 4. wait out the model's rate limit,
//! 5. ask the model to answer from the summary, or to say it does not know.
//!
//! # Modules
//!
//! - [`config`]: TOML + environment configuration
//! - [`embedding`]: text-to-vector embedding via ONNX Runtime
//! - [`store`]: vector store gateway (Pinecone or local sqlite-vec)
//! - [`retrieval`]: relevance filter and context assembly
//! - [`llm`]: language model client and rate-limit gate
//! - [`pipeline`]: the query and ingestion entry points
//! - [`server`]: HTTP surface over the pipeline

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod journal;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod server;
pub mod store;
