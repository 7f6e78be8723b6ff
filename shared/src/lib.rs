//! FloorFlow comment engine.
//!
//! Threaded comments with per-target floor numbering, sensitive-word
//! moderation, time-decayed hot ranking and report-driven folding. Storage
//! and the surrounding application are reached through the traits in
//! [`store`] and [`collaborators`]; [`service::CommentService`] is the entry
//! point most callers need.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod fold_rules;
pub mod model;
pub mod moderation;
pub mod report_fold;
pub mod score;
pub mod service;
pub mod store;
pub mod thread_builder;
pub mod word_list;
pub mod word_matcher;

pub use config::EngineConfig;
pub use error::{CommentError, CommentResult};
pub use service::{now_ms, Collaborators, CommentService, CommentView, CreateCommentInput};
pub use word_matcher::WordMatcher;
