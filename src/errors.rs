use crate::container::ServiceLifetime;
use std::fmt;
use thiserror::Error;

/// 依赖注入容器错误
///
/// 所有错误都通过返回值同步传递给调用方，容器内部不做重试。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// 服务未注册
    #[error("Service '{contract}' is not registered")]
    NotRegistered { contract: &'static str },

    /// 同一契约重复注册
    #[error("Service '{contract}' is already registered (bound to '{existing}')")]
    DuplicateRegistration {
        contract: &'static str,
        existing: &'static str,
    },

    /// 单例解析路径遇到了非单例服务
    #[error("Service '{contract}' is registered as {actual}, but singleton resolution requires Singleton")]
    WrongLifetime {
        contract: &'static str,
        actual: ServiceLifetime,
    },

    /// 找不到唯一可用的构造函数
    #[error("No suitable constructor for '{implementation}': {reason}")]
    NoSuitableConstructor {
        implementation: &'static str,
        reason: ConstructorProblem,
    },

    /// 作用域已释放
    #[error("Scope {scope_id} has been released")]
    ScopeReleased { scope_id: uuid::Uuid },

    /// 作用域所属的容器已被销毁
    #[error("Container owning scope {scope_id} has been dropped")]
    ContainerDropped { scope_id: uuid::Uuid },

    /// 循环依赖
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<&'static str> },

    /// 解析深度超过配置上限
    #[error("Resolution depth limit {limit} exceeded while resolving '{contract}'")]
    ResolutionDepthExceeded { contract: &'static str, limit: usize },

    /// 构造函数本身返回了错误
    #[error("Failed to create service '{implementation}': {reason}")]
    CreationFailed {
        implementation: &'static str,
        reason: String,
    },

    /// 类型转换失败
    #[error("Type cast failed: expected '{expected}'")]
    TypeCastFailed { expected: &'static str },
}

/// 构造函数选择失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorProblem {
    /// 没有声明任何构造函数
    NoConstructors,
    /// 多个构造函数且没有一个被标记
    Unmarked { candidates: usize },
    /// 超过一个构造函数被标记
    MultipleMarked { marked: usize },
}

impl fmt::Display for ConstructorProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorProblem::NoConstructors => write!(f, "no constructors declared"),
            ConstructorProblem::Unmarked { candidates } => {
                write!(f, "{} constructors declared and none is marked preferred", candidates)
            }
            ConstructorProblem::MultipleMarked { marked } => {
                write!(f, "{} constructors are marked preferred", marked)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid configuration field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
