//! 契约标识与类型擦除的实例

use super::constructor::Injectable;
use crate::errors::ContainerError;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 类型擦除的服务实例
///
/// 内部保存的总是 `Arc<C>`（`C` 为契约类型），取出时做带检查的向下转型。
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

/// 契约标识
///
/// 比较和哈希只看 `TypeId`，类型名称仅用于错误信息和日志。
#[derive(Clone, Copy)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceKey {
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.type_name).finish()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// 实现类型到契约的转换
///
/// 由类型系统保证"实现满足契约"。通常用 [`implements!`](crate::implements) 生成；
/// 每个 [`Injectable`] 类型自动满足自身这个契约。
pub trait Implements<C: ?Sized>: Injectable {
    fn upcast(self: Arc<Self>) -> Arc<C>;
}

impl<T: Injectable> Implements<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

pub(crate) fn erase<C>(instance: Arc<C>) -> AnyInstance
where
    C: ?Sized + Send + Sync + 'static,
{
    Arc::new(instance)
}

pub(crate) fn unerase<C>(instance: &AnyInstance) -> Result<Arc<C>, ContainerError>
where
    C: ?Sized + Send + Sync + 'static,
{
    let any: &(dyn Any + Send + Sync) = &**instance;
    any.downcast_ref::<Arc<C>>()
        .cloned()
        .ok_or(ContainerError::TypeCastFailed {
            expected: std::any::type_name::<C>(),
        })
}
