pub mod memory;
pub mod postgrest;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use postgrest::SupabaseSchedulingStore;
pub use store::{SchedulingStore, StoreError, StoreResult};
pub use supabase::{PostgrestError, SupabaseClient};
