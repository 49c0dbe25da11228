//! StoryHub - A Hacker News and Reddit story aggregator
//!
//! Stories are collected from every configured source in parallel, merged
//! into one in-memory store, and served with a small search interface.

pub mod collector;
pub mod config;
pub mod error;
pub mod hacker_news;
pub mod merge;
pub mod query;
pub mod reddit;
pub mod routes;
pub mod scheduler;
pub mod store;
pub mod story;
