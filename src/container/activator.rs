//! 实例激活
//!
//! 按构造函数签名顺序逐个解析参数（从左到右，不并行），然后调用构造闭包。
//! 任何一个依赖解析失败都会中止激活并原样向上传递，不会返回半成品。

use super::constructor::{select_constructor, Constructor, Injectable};
use super::key::{AnyInstance, ServiceKey};
use crate::config::ContainerConfig;
use crate::errors::ContainerError;

/// 依赖解析回调
pub type ResolveFn<'a> = dyn FnMut(ServiceKey) -> Result<AnyInstance, ContainerError> + 'a;

/// 选择构造函数并激活
pub fn activate<I: Injectable>(resolve: &mut ResolveFn<'_>) -> Result<I, ContainerError> {
    let constructor = select_constructor(I::constructors())?;
    activate_with(&constructor, resolve)
}

/// 用已选定的构造函数激活
pub fn activate_with<I>(
    constructor: &Constructor<I>,
    resolve: &mut ResolveFn<'_>,
) -> Result<I, ContainerError> {
    let mut resolved = Vec::with_capacity(constructor.signature().len());
    for dependency in constructor.signature() {
        resolved.push(resolve(*dependency)?);
    }
    constructor.invoke(resolved)
}

/// 一次顶层解析所经过的契约链
///
/// 每次顶层 `resolve` 都会新建一条链，因此不同线程、不同作用域之间互不干扰。
pub(crate) struct ResolutionChain {
    stack: Vec<ServiceKey>,
    cycle_detection: bool,
    max_depth: usize,
}

impl ResolutionChain {
    pub(crate) fn new(config: &ContainerConfig) -> Self {
        Self {
            stack: Vec::new(),
            cycle_detection: config.cycle_detection,
            max_depth: config.max_resolution_depth,
        }
    }

    /// 进入一次激活
    pub(crate) fn enter(&mut self, key: ServiceKey) -> Result<(), ContainerError> {
        if self.cycle_detection {
            self.ensure_not_reentrant(key)?;
        }

        if self.stack.len() >= self.max_depth {
            return Err(ContainerError::ResolutionDepthExceeded {
                contract: key.type_name(),
                limit: self.max_depth,
            });
        }

        self.stack.push(key);
        Ok(())
    }

    /// 不受配置影响的重入检查（单例的 `OnceCell` 不允许重入初始化）
    pub(crate) fn ensure_not_reentrant(&self, key: ServiceKey) -> Result<(), ContainerError> {
        match self.stack.iter().position(|k| *k == key) {
            Some(start) => {
                let mut chain: Vec<&'static str> =
                    self.stack[start..].iter().map(ServiceKey::type_name).collect();
                chain.push(key.type_name());
                Err(ContainerError::CyclicDependency { chain })
            }
            None => Ok(()),
        }
    }

    pub(crate) fn exit(&mut self) {
        self.stack.pop();
    }

    /// 在链上执行一次激活，无论成功与否都会出栈
    pub(crate) fn within<T>(
        &mut self,
        key: ServiceKey,
        activation: impl FnOnce(&mut Self) -> Result<T, ContainerError>,
    ) -> Result<T, ContainerError> {
        self.enter(key)?;
        let result = activation(self);
        self.exit();
        result
    }
}
