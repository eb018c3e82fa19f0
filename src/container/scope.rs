//! 作用域
//!
//! 一个作用域对应一个工作单元（例如一次请求），持有私有的 Scoped 实例缓存，
//! 只弱引用所属容器。作用域是 `Send` 但不是 `Sync`：它只能在一个线程内使用。

use super::activator::ResolutionChain;
use super::key::{unerase, AnyInstance, ServiceKey};
use super::service_container::ContainerInner;
use super::stats::InnerStats;
use super::ServiceLifetime;
use crate::errors::ContainerError;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::trace;

/// 作用域状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// 已创建，缓存为空
    Created,
    /// 已开始解析服务
    Active,
    /// 已释放，不能继续使用
    Released,
}

pub struct Scope {
    id: uuid::Uuid,
    container: Weak<ContainerInner>,
    state: Cell<ScopeState>,
    instances: RefCell<HashMap<ServiceKey, AnyInstance>>,
}

impl Scope {
    pub(crate) fn new(container: Weak<ContainerInner>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            container,
            state: Cell::new(ScopeState::Created),
            instances: RefCell::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn state(&self) -> ScopeState {
        self.state.get()
    }

    /// 当前缓存的 Scoped 实例数量
    pub fn cached_instances(&self) -> usize {
        self.instances.borrow().len()
    }

    /// 解析服务
    ///
    /// - Singleton：交给容器的单例缓存
    /// - Transient：每次新建，依赖按本作用域规则解析
    /// - Scoped：本作用域内只创建一次
    pub fn resolve<C>(&self) -> Result<Arc<C>, ContainerError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let container = self.container()?;
        InnerStats::bump(&container.stats.total_resolutions);

        let mut chain = ResolutionChain::new(&container.config);
        let instance = self.resolve_key(&container, ServiceKey::of::<C>(), &mut chain)?;
        unerase::<C>(&instance)
    }

    fn container(&self) -> Result<Arc<ContainerInner>, ContainerError> {
        if self.state.get() == ScopeState::Released {
            return Err(ContainerError::ScopeReleased { scope_id: self.id });
        }
        self.container
            .upgrade()
            .ok_or(ContainerError::ContainerDropped { scope_id: self.id })
    }

    fn resolve_key(
        &self,
        container: &ContainerInner,
        key: ServiceKey,
        chain: &mut ResolutionChain,
    ) -> Result<AnyInstance, ContainerError> {
        let descriptor = container
            .descriptors
            .lookup(&key)
            .ok_or(ContainerError::NotRegistered {
                contract: key.type_name(),
            })?;

        if self.state.get() == ScopeState::Created {
            self.state.set(ScopeState::Active);
        }

        match descriptor.lifetime() {
            ServiceLifetime::Singleton => container.resolve_singleton(key, chain),
            ServiceLifetime::Transient => {
                let instance = chain.within(key, |chain| {
                    descriptor.activate(&mut |dependency| self.resolve_key(container, dependency, chain))
                })?;
                InnerStats::bump(&container.stats.transient_creations);
                Ok(instance)
            }
            ServiceLifetime::Scoped => {
                let cached = self.instances.borrow().get(&key).cloned();
                if let Some(instance) = cached {
                    InnerStats::bump(&container.stats.scoped_cache_hits);
                    return Ok(instance);
                }

                let instance = chain.within(key, |chain| {
                    descriptor.activate(&mut |dependency| self.resolve_key(container, dependency, chain))
                })?;
                InnerStats::bump(&container.stats.scoped_creations);
                trace!(
                    scope_id = %self.id,
                    contract = key.type_name(),
                    implementation = descriptor.implementation(),
                    "Scoped instance created"
                );

                let mut instances = self.instances.borrow_mut();
                Ok(instances.entry(key).or_insert(instance).clone())
            }
        }
    }

    /// 释放作用域
    ///
    /// 清空 Scoped 缓存（只是丢弃引用，不调用任何清理逻辑），之后的解析都会失败。
    /// 可以重复调用；`Drop` 时也会自动调用。
    pub fn release(&self) {
        if self.state.get() == ScopeState::Released {
            return;
        }
        self.state.set(ScopeState::Released);

        let released = std::mem::take(&mut *self.instances.borrow_mut());
        trace!(scope_id = %self.id, released = released.len(), "Scope released");
        drop(released);
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .field("cached_instances", &self.cached_instances())
            .finish()
    }
}
