// Testorch Infrastructure - Redis-backed Coordination Store (CS)
//
// CS is a performance shadow over PS for everything except leases and
// idempotency marks (section 4.2/7): queues, status cache, and agent
// heartbeats are all advisory and must tolerate being empty.

mod memory;
mod redis_store;

pub use memory::InMemoryCoordinationStore;
pub use redis_store::RedisCoordinationStore;
