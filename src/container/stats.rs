//! 容器统计信息

use std::sync::atomic::{AtomicU64, Ordering};

/// 内部容器统计信息（原子计数器）
#[derive(Default)]
pub(crate) struct InnerStats {
    pub(crate) total_resolutions: AtomicU64,
    pub(crate) singleton_cache_hits: AtomicU64,
    pub(crate) singleton_cache_misses: AtomicU64,
    pub(crate) transient_creations: AtomicU64,
    pub(crate) scoped_creations: AtomicU64,
    pub(crate) scoped_cache_hits: AtomicU64,
    pub(crate) scopes_created: AtomicU64,
}

impl InnerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, registered_services: usize, active_singletons: usize) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.total_resolutions.load(Ordering::Relaxed),
            singleton_cache_hits: self.singleton_cache_hits.load(Ordering::Relaxed),
            singleton_cache_misses: self.singleton_cache_misses.load(Ordering::Relaxed),
            transient_creations: self.transient_creations.load(Ordering::Relaxed),
            scoped_creations: self.scoped_creations.load(Ordering::Relaxed),
            scoped_cache_hits: self.scoped_cache_hits.load(Ordering::Relaxed),
            scopes_created: self.scopes_created.load(Ordering::Relaxed),
            registered_services,
            active_singletons,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 顶层解析次数（`get_singleton` 与 `Scope::resolve`）
    pub total_resolutions: u64,
    /// 单例缓存命中次数
    pub singleton_cache_hits: u64,
    /// 单例缓存未命中（即单例创建）次数
    pub singleton_cache_misses: u64,
    /// 瞬态服务创建次数
    pub transient_creations: u64,
    /// 作用域服务创建次数
    pub scoped_creations: u64,
    /// 作用域缓存命中次数
    pub scoped_cache_hits: u64,
    /// 已创建的作用域数量
    pub scopes_created: u64,
    /// 服务注册数量
    pub registered_services: usize,
    /// 活跃单例数量
    pub active_singletons: usize,
}

impl ContainerStats {
    /// 单例缓存命中率（小数形式）
    pub fn hit_rate(&self) -> f64 {
        let total = self.singleton_cache_hits + self.singleton_cache_misses;
        if total == 0 {
            0.0
        } else {
            self.singleton_cache_hits as f64 / total as f64
        }
    }

    /// 获取服务创建分布 (单例, 瞬态, 作用域)
    pub fn creation_distribution(&self) -> (u64, u64, u64) {
        (
            self.singleton_cache_misses,
            self.transient_creations,
            self.scoped_creations,
        )
    }

    /// 获取性能指标摘要
    pub fn performance_summary(&self) -> String {
        format!(
            "Container: {} total resolutions, {:.1}% singleton hit rate, {} registered services, {} active singletons, {} scopes",
            self.total_resolutions,
            self.hit_rate() * 100.0,
            self.registered_services,
            self.active_singletons,
            self.scopes_created
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(ContainerStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_summary_format() {
        let stats = ContainerStats {
            total_resolutions: 4,
            singleton_cache_hits: 3,
            singleton_cache_misses: 1,
            registered_services: 2,
            active_singletons: 1,
            scopes_created: 1,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 0.75);
        let summary = stats.performance_summary();
        assert!(summary.contains("4 total resolutions"));
        assert!(summary.contains("75.0% singleton hit rate"));
        assert!(summary.contains("2 registered services"));
    }
}
