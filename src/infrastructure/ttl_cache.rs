//! 带过期时间的内存缓存 - 基础设施层
//!
//! 办公室 → 助手配置的查询结果缓存。时间来源通过 `Clock` 注入，
//! 测试里用手动时钟推进，不需要真实等待。

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// 时间来源
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 系统时钟
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 按 key 缓存、到期丢弃的并发安全缓存
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, Instant)>>,
    ttl: Duration,
    clock: Box<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Box::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// 取出未过期的值，过期条目顺手删除
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((_, expires_at)) if now >= *expires_at => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, (value, expires_at));
    }

    pub fn remove(&self, key: &K) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// 手动推进的测试时钟
    struct ManualClock {
        base: Instant,
        offset_ms: AtomicU64,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset_ms: AtomicU64::new(0),
            }
        }

        fn advance(&self, ms: u64) {
            self.offset_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
        }
    }

    #[test]
    fn test_get_before_expiry() {
        let cache: TtlCache<i32, String> = TtlCache::new(Duration::from_secs(60));
        cache.insert(7, "asst_a".to_string());
        assert_eq!(cache.get(&7), Some("asst_a".to_string()));
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let clock = std::sync::Arc::new(ManualClock::new());

        struct SharedClock(std::sync::Arc<ManualClock>);
        impl Clock for SharedClock {
            fn now(&self) -> Instant {
                self.0.now()
            }
        }

        let cache: TtlCache<i32, String> = TtlCache::with_clock(
            Duration::from_millis(1000),
            Box::new(SharedClock(clock.clone())),
        );

        cache.insert(7, "asst_a".to_string());
        clock.advance(999);
        assert_eq!(cache.get(&7), Some("asst_a".to_string()));

        clock.advance(1);
        assert_eq!(cache.get(&7), None);
        // 过期后重新插入照常生效
        cache.insert(7, "asst_b".to_string());
        assert_eq!(cache.get(&7), Some("asst_b".to_string()));
    }

    #[test]
    fn test_remove() {
        let cache: TtlCache<i32, String> = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, "x".to_string());
        cache.remove(&1);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_missing_key() {
        let cache: TtlCache<i32, String> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&42), None);
    }
}
