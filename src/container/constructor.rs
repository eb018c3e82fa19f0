//! 构造函数声明与选择
//!
//! Rust 没有运行时反射，所以每个实现类型通过 [`Injectable::constructors`]
//! 显式声明自己的构造函数。参数列表由构造闭包的参数类型推导出来：
//!
//! ```
//! use gitai_container::{Constructor, Injectable};
//! use std::sync::Arc;
//!
//! struct Database;
//! struct Repository {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for Repository {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new("Repository(Database)", |(db,): (Arc<Database>,)| {
//!             Repository { db }
//!         })]
//!     }
//! }
//! ```

use super::key::{unerase, AnyInstance, ServiceKey};
use crate::errors::{ConstructorProblem, ContainerError};
use std::fmt;
use std::sync::Arc;

/// 可由容器构造的实现类型
pub trait Injectable: Sized + Send + Sync + 'static {
    /// 声明的全部构造函数
    fn constructors() -> Vec<Constructor<Self>>;
}

/// 构造函数的参数列表
///
/// 为 `(Arc<A>, Arc<B>, ...)` 形式的元组实现（最多 8 个参数）。
pub trait Dependencies: Sized {
    /// 按顺序排列的参数契约
    fn signature() -> Vec<ServiceKey>;

    /// 从已解析的实例（与 `signature` 顺序一致）组装参数
    fn from_resolved(resolved: Vec<AnyInstance>) -> Result<Self, ContainerError>;
}

fn next_argument<C>(
    resolved: &mut std::vec::IntoIter<AnyInstance>,
) -> Result<Arc<C>, ContainerError>
where
    C: ?Sized + Send + Sync + 'static,
{
    let instance = resolved.next().ok_or(ContainerError::TypeCastFailed {
        expected: std::any::type_name::<C>(),
    })?;
    unerase::<C>(&instance)
}

macro_rules! impl_dependencies {
    ($($param:ident),*) => {
        impl<$($param),*> Dependencies for ($(Arc<$param>,)*)
        where
            $($param: ?Sized + Send + Sync + 'static,)*
        {
            fn signature() -> Vec<ServiceKey> {
                vec![$(ServiceKey::of::<$param>()),*]
            }

            #[allow(unused_variables, unused_mut)]
            fn from_resolved(resolved: Vec<AnyInstance>) -> Result<Self, ContainerError> {
                let mut resolved = resolved.into_iter();
                Ok(($(next_argument::<$param>(&mut resolved)?,)*))
            }
        }
    };
}

impl_dependencies!();
impl_dependencies!(A);
impl_dependencies!(A, B);
impl_dependencies!(A, B, C);
impl_dependencies!(A, B, C, D);
impl_dependencies!(A, B, C, D, E);
impl_dependencies!(A, B, C, D, E, F);
impl_dependencies!(A, B, C, D, E, F, G);
impl_dependencies!(A, B, C, D, E, F, G, H);

type BuildFn<T> = dyn Fn(Vec<AnyInstance>) -> Result<T, ContainerError> + Send + Sync;

/// 一个构造函数签名：有序参数契约 + 构造闭包
pub struct Constructor<T> {
    label: &'static str,
    signature: Vec<ServiceKey>,
    preferred: bool,
    build: Arc<BuildFn<T>>,
}

impl<T: 'static> Constructor<T> {
    pub fn new<D, F>(label: &'static str, build: F) -> Self
    where
        D: Dependencies + 'static,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        Self {
            label,
            signature: D::signature(),
            preferred: false,
            build: Arc::new(move |resolved: Vec<AnyInstance>| -> Result<T, ContainerError> {
                let dependencies = D::from_resolved(resolved)?;
                Ok(build(dependencies))
            }),
        }
    }

    /// 构造过程本身可能失败的构造函数，错误转换为 `CreationFailed`
    pub fn fallible<D, F, E>(label: &'static str, build: F) -> Self
    where
        D: Dependencies + 'static,
        F: Fn(D) -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self {
            label,
            signature: D::signature(),
            preferred: false,
            build: Arc::new(move |resolved: Vec<AnyInstance>| -> Result<T, ContainerError> {
                let dependencies = D::from_resolved(resolved)?;
                build(dependencies).map_err(|e| ContainerError::CreationFailed {
                    implementation: std::any::type_name::<T>(),
                    reason: e.to_string(),
                })
            }),
        }
    }

    /// 标记为首选构造函数
    pub fn preferred(mut self) -> Self {
        self.preferred = true;
        self
    }
}

impl<T> Constructor<T> {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn signature(&self) -> &[ServiceKey] {
        &self.signature
    }

    pub fn is_preferred(&self) -> bool {
        self.preferred
    }

    pub(crate) fn invoke(&self, resolved: Vec<AnyInstance>) -> Result<T, ContainerError> {
        (self.build)(resolved)
    }
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            signature: self.signature.clone(),
            preferred: self.preferred,
            build: Arc::clone(&self.build),
        }
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("label", &self.label)
            .field("signature", &self.signature)
            .field("preferred", &self.preferred)
            .finish()
    }
}

/// 选出唯一的构造函数
///
/// 只有一个时直接选中（不论是否标记）；否则选唯一被标记的那个。
pub fn select_constructor<T>(
    mut constructors: Vec<Constructor<T>>,
) -> Result<Constructor<T>, ContainerError> {
    let implementation = std::any::type_name::<T>();
    let no_suitable = |reason| ContainerError::NoSuitableConstructor {
        implementation,
        reason,
    };

    match constructors.len() {
        0 => return Err(no_suitable(ConstructorProblem::NoConstructors)),
        1 => return Ok(constructors.remove(0)),
        _ => {}
    }

    let candidates = constructors.len();
    let mut marked: Vec<Constructor<T>> = constructors
        .into_iter()
        .filter(Constructor::is_preferred)
        .collect();

    match marked.len() {
        1 => Ok(marked.remove(0)),
        0 => Err(no_suitable(ConstructorProblem::Unmarked { candidates })),
        n => Err(no_suitable(ConstructorProblem::MultipleMarked { marked: n })),
    }
}
