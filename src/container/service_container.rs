//! 服务容器
//!
//! 持有描述符表和单例缓存。单例缓存每个契约一个 `OnceCell`，
//! 并发首次访问时保证最多构造一次；构造失败时 cell 保持为空，不缓存任何半成品。
//!
//! 注册和作用域解析本身不做同步保证：注册应在启动阶段完成，
//! 作用域只能在一个工作单元（一个线程/一个请求）内使用。

use super::activator::ResolutionChain;
use super::key::{unerase, AnyInstance, Implements, ServiceKey};
use super::registry::{Descriptor, DescriptorTable};
use super::scope::Scope;
use super::stats::{ContainerStats, InnerStats};
use super::validate;
use super::ServiceLifetime;
use crate::config::ContainerConfig;
use crate::errors::ContainerError;
use dashmap::{DashMap, DashSet};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, trace};

pub(crate) struct ContainerInner {
    pub(crate) config: ContainerConfig,
    pub(crate) descriptors: DescriptorTable,
    singletons: DashMap<ServiceKey, Arc<OnceCell<AnyInstance>>>,
    /// 已确认依赖图无环的单例契约，注册新服务时清空
    acyclic_singletons: DashSet<ServiceKey>,
    pub(crate) stats: InnerStats,
}

impl ContainerInner {
    /// 单例解析路径，依赖也只能从这里取（因此单例只能依赖单例）
    pub(crate) fn resolve_singleton(
        &self,
        key: ServiceKey,
        chain: &mut ResolutionChain,
    ) -> Result<AnyInstance, ContainerError> {
        if let Some(instance) = self.cached_singleton(&key) {
            InnerStats::bump(&self.stats.singleton_cache_hits);
            return Ok(instance);
        }

        let descriptor = self
            .descriptors
            .lookup(&key)
            .ok_or(ContainerError::NotRegistered {
                contract: key.type_name(),
            })?;

        if descriptor.lifetime() != ServiceLifetime::Singleton {
            return Err(ContainerError::WrongLifetime {
                contract: key.type_name(),
                actual: descriptor.lifetime(),
            });
        }

        validate::ensure_singleton_graph_acyclic(key, &self.descriptors, &self.acyclic_singletons)?;

        // 先克隆出 cell 再初始化，避免递归解析时持有 DashMap 分片锁
        let cell = self
            .singletons
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        // 即使 cycle_detection 关闭也必须检查：在同一线程内重入 OnceCell 初始化会死锁
        chain.ensure_not_reentrant(key)?;
        chain.within(key, |chain| {
            cell.get_or_try_init(|| -> Result<AnyInstance, ContainerError> {
                InnerStats::bump(&self.stats.singleton_cache_misses);
                let instance =
                    descriptor.activate(&mut |dependency| self.resolve_singleton(dependency, chain))?;
                debug!(
                    contract = key.type_name(),
                    implementation = descriptor.implementation(),
                    "Singleton created"
                );
                Ok(instance)
            })
            .cloned()
        })
    }

    fn cached_singleton(&self, key: &ServiceKey) -> Option<AnyInstance> {
        self.singletons
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    fn active_singletons(&self) -> usize {
        self.singletons
            .iter()
            .filter(|cell| cell.value().get().is_some())
            .count()
    }
}

/// 依赖注入容器
///
/// 克隆得到的是同一个容器的另一个句柄。容器由应用的组合根显式持有，
/// 不存在全局容器。
///
/// ```
/// use gitai_container::{implements, Constructor, Injectable, ServiceContainer};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// impl Injectable for English {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new("English()", |(): ()| English)]
///     }
/// }
///
/// implements!(English => dyn Greeter);
///
/// let container = ServiceContainer::new();
/// container.register_scoped::<dyn Greeter, English>()?;
///
/// let scope = container.create_scope();
/// let greeter = scope.resolve::<dyn Greeter>()?;
/// assert_eq!(greeter.greet(), "hello");
/// # Ok::<(), gitai_container::ContainerError>(())
/// ```
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<ContainerInner>,
}

impl ServiceContainer {
    /// 创建新的容器实例
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                config,
                descriptors: DescriptorTable::default(),
                singletons: DashMap::new(),
                acyclic_singletons: DashSet::new(),
                stats: InnerStats::default(),
            }),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// 注册服务
    ///
    /// 同一契约只能注册一次，重复注册返回 `DuplicateRegistration`。
    pub fn register<C, I>(&self, lifetime: ServiceLifetime) -> Result<(), ContainerError>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Implements<C>,
    {
        let descriptor = Descriptor::new::<C, I>(lifetime);
        let implementation = descriptor.implementation();
        self.inner.descriptors.insert(descriptor)?;
        // 新描述符可能补上之前缺失的依赖，从而形成新的环
        self.inner.acyclic_singletons.clear();

        debug!(
            contract = std::any::type_name::<C>(),
            implementation,
            lifetime = %lifetime,
            "Service registered"
        );
        Ok(())
    }

    /// 注册瞬态服务
    pub fn register_transient<C, I>(&self) -> Result<(), ContainerError>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Implements<C>,
    {
        self.register::<C, I>(ServiceLifetime::Transient)
    }

    /// 注册作用域服务
    pub fn register_scoped<C, I>(&self) -> Result<(), ContainerError>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Implements<C>,
    {
        self.register::<C, I>(ServiceLifetime::Scoped)
    }

    /// 注册单例服务
    pub fn register_singleton<C, I>(&self) -> Result<(), ContainerError>
    where
        C: ?Sized + Send + Sync + 'static,
        I: Implements<C>,
    {
        self.register::<C, I>(ServiceLifetime::Singleton)
    }

    /// 查找契约的描述符
    pub fn lookup<C: ?Sized + 'static>(&self) -> Option<Descriptor> {
        self.lookup_key(&ServiceKey::of::<C>())
    }

    pub fn lookup_key(&self, contract: &ServiceKey) -> Option<Descriptor> {
        self.inner.descriptors.lookup(contract)
    }

    /// 检查服务是否已注册
    pub fn is_registered<C: ?Sized + 'static>(&self) -> bool {
        self.inner.descriptors.contains(&ServiceKey::of::<C>())
    }

    /// 获取已注册的契约列表
    pub fn registered_contracts(&self) -> Vec<ServiceKey> {
        self.inner
            .descriptors
            .snapshot()
            .iter()
            .map(Descriptor::contract)
            .collect()
    }

    /// 从单例缓存解析服务
    ///
    /// 契约及其全部传递依赖都必须注册为 Singleton，否则返回 `WrongLifetime`。
    pub fn get_singleton<C>(&self) -> Result<Arc<C>, ContainerError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        InnerStats::bump(&self.inner.stats.total_resolutions);
        let mut chain = ResolutionChain::new(&self.inner.config);
        let instance = self
            .inner
            .resolve_singleton(ServiceKey::of::<C>(), &mut chain)?;
        unerase::<C>(&instance)
    }

    /// 创建新的作用域
    pub fn create_scope(&self) -> Scope {
        InnerStats::bump(&self.inner.stats.scopes_created);
        let scope = Scope::new(Arc::downgrade(&self.inner));
        trace!(scope_id = %scope.id(), "Scope created");
        scope
    }

    /// 在不实例化任何服务的情况下检查整个依赖图
    ///
    /// 检查构造函数选择、依赖是否注册、单例是否依赖了非单例以及循环依赖，
    /// 返回发现的全部问题。
    pub fn validate(&self) -> Result<(), Vec<ContainerError>> {
        let problems = validate::validate(&self.inner.descriptors.snapshot());
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        self.inner.stats.snapshot(
            self.inner.descriptors.len(),
            self.inner.active_singletons(),
        )
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}
