//! Concrete clients behind the [`crate::services`] traits.

pub mod file;
pub mod supabase;
pub mod telegram;
