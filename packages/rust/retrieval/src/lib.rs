//! Knowledge base retrieval and context aggregation.
//!
//! Every application is described by three independent knowledge bases
//! (application profile, best-practice docs, assessment Q&A). This crate
//! queries them and merges the answers into a [`ContextBundle`].
//!
//! A failing knowledge base never fails the pipeline: the [`Retriever`] logs
//! the error and contributes an empty fragment instead.
//!
//! [`ContextBundle`]: migrationplanner_shared::ContextBundle

pub mod aggregator;
pub mod knowledge_base;
pub mod queries;
pub mod retriever;

pub use aggregator::{ContextAggregator, KnowledgeBaseIds};
pub use knowledge_base::{BedrockKnowledgeBase, KnowledgeBase};
pub use retriever::{Retrieval, Retriever};
