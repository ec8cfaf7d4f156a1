//! PostgREST range queries against the Supabase vacancy table.

mod client;

pub use client::SupabaseSource;
