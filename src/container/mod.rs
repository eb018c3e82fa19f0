//! 依赖注入容器
//!
//! 组成部分（自底向上）：
//! - 描述符表：契约 -> (实现, 生命周期)
//! - 构造函数选择：从实现声明的构造函数中选出唯一一个
//! - 实例激活：按参数顺序递归解析依赖并构造实例
//! - 单例缓存：整个容器共享，延迟填充
//! - 作用域：每个工作单元私有的 Scoped 实例缓存

pub mod activator;
pub mod constructor;
pub mod key;
pub mod registry;
pub mod scope;
pub mod service_container;
pub mod stats;
mod validate;

use std::fmt;

pub use activator::{activate, activate_with};
pub use constructor::{select_constructor, Constructor, Dependencies, Injectable};
pub use key::{AnyInstance, Implements, ServiceKey};
pub use registry::Descriptor;
pub use scope::{Scope, ScopeState};
pub use service_container::ServiceContainer;
pub use stats::ContainerStats;

/// 服务生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// 整个容器生命周期内只有一个实例
    Singleton,
    /// 每次解析都创建新实例
    Transient,
    /// 同一作用域内共享一个实例
    Scoped,
}

impl fmt::Display for ServiceLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceLifetime::Singleton => "Singleton",
            ServiceLifetime::Transient => "Transient",
            ServiceLifetime::Scoped => "Scoped",
        };
        f.write_str(name)
    }
}

/// 声明实现类型满足哪些契约
///
/// ```
/// use gitai_container::{implements, Constructor, Injectable};
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock;
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         42
///     }
/// }
///
/// impl Injectable for FixedClock {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new("FixedClock()", |(): ()| FixedClock)]
///     }
/// }
///
/// implements!(FixedClock => dyn Clock);
/// ```
#[macro_export]
macro_rules! implements {
    ($implementation:ty => $($contract:ty),+ $(,)?) => {
        $(
            impl $crate::Implements<$contract> for $implementation {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$contract> {
                    self
                }
            }
        )+
    };
}

/// 服务解析便捷宏
#[macro_export]
macro_rules! resolve {
    ($scope:expr, $contract:ty) => {
        $scope.resolve::<$contract>()
    };
}
