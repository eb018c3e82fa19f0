//! 描述符表
//!
//! 契约 -> (实现, 生命周期)。每个契约最多一个描述符，没有注销操作。

use super::activator::{activate_with, ResolveFn};
use super::constructor::{select_constructor, Constructor};
use super::key::{erase, AnyInstance, Implements, ServiceKey};
use super::ServiceLifetime;
use crate::errors::ContainerError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 类型擦除的实例激活器
pub(crate) trait ErasedActivator: Send + Sync {
    /// 实现类型名称
    fn implementation(&self) -> &'static str;

    /// 选中构造函数的参数契约
    fn signature(&self) -> Result<Vec<ServiceKey>, ContainerError>;

    /// 构造一个实例并转换为契约类型
    fn activate(&self, resolve: &mut ResolveFn<'_>) -> Result<AnyInstance, ContainerError>;
}

/// 某个实现绑定到某个契约的激活器
///
/// 构造函数选择结果只计算一次。
struct BoundActivator<C: ?Sized, I> {
    selected: OnceCell<Result<Constructor<I>, ContainerError>>,
    _contract: PhantomData<fn() -> Arc<C>>,
}

impl<C: ?Sized, I> BoundActivator<C, I>
where
    I: Implements<C>,
{
    fn new() -> Self {
        Self {
            selected: OnceCell::new(),
            _contract: PhantomData,
        }
    }

    fn constructor(&self) -> Result<&Constructor<I>, ContainerError> {
        self.selected
            .get_or_init(|| select_constructor(I::constructors()))
            .as_ref()
            .map_err(|e| e.clone())
    }
}

impl<C, I> ErasedActivator for BoundActivator<C, I>
where
    C: ?Sized + Send + Sync + 'static,
    I: Implements<C>,
{
    fn implementation(&self) -> &'static str {
        std::any::type_name::<I>()
    }

    fn signature(&self) -> Result<Vec<ServiceKey>, ContainerError> {
        Ok(self.constructor()?.signature().to_vec())
    }

    fn activate(&self, resolve: &mut ResolveFn<'_>) -> Result<AnyInstance, ContainerError> {
        let instance = activate_with(self.constructor()?, resolve)?;
        let contract: Arc<C> = <I as Implements<C>>::upcast(Arc::new(instance));
        Ok(erase(contract))
    }
}

/// 服务描述符
#[derive(Clone)]
pub struct Descriptor {
    contract: ServiceKey,
    lifetime: ServiceLifetime,
    activator: Arc<dyn ErasedActivator>,
}

impl Descriptor {
    pub(crate) fn new<C, I>(lifetime: ServiceLifetime) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Implements<C>,
    {
        Self {
            contract: ServiceKey::of::<C>(),
            lifetime,
            activator: Arc::new(BoundActivator::<C, I>::new()),
        }
    }

    pub fn contract(&self) -> ServiceKey {
        self.contract
    }

    pub fn implementation(&self) -> &'static str {
        self.activator.implementation()
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    /// 选中构造函数的参数契约（不会实例化任何东西）
    pub fn dependencies(&self) -> Result<Vec<ServiceKey>, ContainerError> {
        self.activator.signature()
    }

    pub(crate) fn activate(&self, resolve: &mut ResolveFn<'_>) -> Result<AnyInstance, ContainerError> {
        self.activator.activate(resolve)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("contract", &self.contract)
            .field("implementation", &self.implementation())
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct DescriptorTable {
    descriptors: DashMap<ServiceKey, Descriptor>,
}

impl DescriptorTable {
    pub(crate) fn insert(&self, descriptor: Descriptor) -> Result<(), ContainerError> {
        match self.descriptors.entry(descriptor.contract) {
            Entry::Occupied(existing) => Err(ContainerError::DuplicateRegistration {
                contract: descriptor.contract.type_name(),
                existing: existing.get().implementation(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(descriptor);
                Ok(())
            }
        }
    }

    /// 查找描述符（克隆出来，不持有分片锁）
    pub(crate) fn lookup(&self, contract: &ServiceKey) -> Option<Descriptor> {
        self.descriptors.get(contract).map(|entry| entry.value().clone())
    }

    pub(crate) fn contains(&self, contract: &ServiceKey) -> bool {
        self.descriptors.contains_key(contract)
    }

    pub(crate) fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<Descriptor> {
        self.descriptors.iter().map(|entry| entry.value().clone()).collect()
    }
}
