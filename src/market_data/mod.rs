pub mod broadcast_scheduler;
pub mod tick_cache;

pub use broadcast_scheduler::BroadcastScheduler;
pub use tick_cache::TickCache;
