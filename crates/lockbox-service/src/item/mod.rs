//! Encrypted items.

pub mod service;

pub use service::{CreateItemRequest, ItemService, ItemSummary, ItemView, UpdateItemRequest};
