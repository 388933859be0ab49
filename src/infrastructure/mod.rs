//! 基础设施层
//!
//! 不含业务语义的底层能力，目前只有带过期时间的缓存。

pub mod ttl_cache;

pub use ttl_cache::{Clock, SystemClock, TtlCache};
