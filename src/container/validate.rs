//! 依赖图静态检查
//!
//! 只读取描述符和选中构造函数的签名，不实例化任何服务。

use super::key::ServiceKey;
use super::registry::{Descriptor, DescriptorTable};
use super::ServiceLifetime;
use crate::errors::ContainerError;
use dashmap::DashSet;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

pub(crate) fn validate(descriptors: &[Descriptor]) -> Vec<ContainerError> {
    let mut ordered: Vec<&Descriptor> = descriptors.iter().collect();
    ordered.sort_by_key(|d| d.contract().type_name());

    let lifetimes: HashMap<ServiceKey, ServiceLifetime> = ordered
        .iter()
        .map(|d| (d.contract(), d.lifetime()))
        .collect();

    let mut problems = Vec::new();
    let mut graph: HashMap<ServiceKey, Vec<ServiceKey>> = HashMap::new();

    for descriptor in &ordered {
        let dependencies = match descriptor.dependencies() {
            Ok(dependencies) => dependencies,
            Err(err) => {
                problems.push(err);
                continue;
            }
        };

        let mut edges = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            match lifetimes.get(&dependency) {
                None => problems.push(ContainerError::NotRegistered {
                    contract: dependency.type_name(),
                }),
                Some(&actual)
                    if descriptor.lifetime() == ServiceLifetime::Singleton
                        && actual != ServiceLifetime::Singleton =>
                {
                    problems.push(ContainerError::WrongLifetime {
                        contract: dependency.type_name(),
                        actual,
                    });
                    edges.push(dependency);
                }
                Some(_) => edges.push(dependency),
            }
        }
        graph.insert(descriptor.contract(), edges);
    }

    let roots: Vec<ServiceKey> = ordered.iter().map(|d| d.contract()).collect();
    problems.extend(find_cycles(&roots, &graph));

    debug!(
        services = descriptors.len(),
        problems = problems.len(),
        "Dependency graph validated"
    );
    problems
}

/// 构造单例前检查从 `start` 可达的单例依赖是否成环
///
/// 单例的 `OnceCell` 在不同线程之间会互相等待，运行时的解析链只能发现同一线程内的重入，
/// 所以环必须在任何初始化开始之前静态地排除。确认无环的契约记入 `known_acyclic`。
pub(crate) fn ensure_singleton_graph_acyclic(
    start: ServiceKey,
    table: &DescriptorTable,
    known_acyclic: &DashSet<ServiceKey>,
) -> Result<(), ContainerError> {
    if known_acyclic.contains(&start) {
        return Ok(());
    }

    let mut walk = SingletonWalk {
        table,
        known_acyclic,
        finished: HashSet::new(),
        path: Vec::new(),
    };
    if let Some(cycle) = walk.visit(start) {
        return Err(cycle);
    }

    for key in walk.finished {
        known_acyclic.insert(key);
    }
    Ok(())
}

struct SingletonWalk<'a> {
    table: &'a DescriptorTable,
    known_acyclic: &'a DashSet<ServiceKey>,
    finished: HashSet<ServiceKey>,
    path: Vec<ServiceKey>,
}

impl SingletonWalk<'_> {
    fn visit(&mut self, node: ServiceKey) -> Option<ContainerError> {
        if let Some(start) = self.path.iter().position(|k| *k == node) {
            let mut chain: Vec<&'static str> =
                self.path[start..].iter().map(ServiceKey::type_name).collect();
            chain.push(node.type_name());
            return Some(ContainerError::CyclicDependency { chain });
        }
        if self.finished.contains(&node) || self.known_acyclic.contains(&node) {
            return None;
        }

        // 未注册、非单例或构造函数有问题的节点由激活过程报告
        let dependencies = match self.table.lookup(&node) {
            Some(descriptor) if descriptor.lifetime() == ServiceLifetime::Singleton => {
                descriptor.dependencies().unwrap_or_default()
            }
            _ => Vec::new(),
        };

        self.path.push(node);
        for dependency in dependencies {
            if let Some(cycle) = self.visit(dependency) {
                return Some(cycle);
            }
        }
        self.path.pop();

        self.finished.insert(node);
        None
    }
}

/// 深度优先找出所有回边形成的环，同一个环只报告一次
fn find_cycles(
    roots: &[ServiceKey],
    graph: &HashMap<ServiceKey, Vec<ServiceKey>>,
) -> Vec<ContainerError> {
    let mut search = CycleSearch {
        graph,
        visited: HashSet::new(),
        path: Vec::new(),
        seen: HashSet::new(),
        cycles: Vec::new(),
    };

    for &root in roots {
        if !search.visited.contains(&root) {
            search.visit(root);
        }
    }
    search.cycles
}

struct CycleSearch<'a> {
    graph: &'a HashMap<ServiceKey, Vec<ServiceKey>>,
    visited: HashSet<ServiceKey>,
    path: Vec<ServiceKey>,
    seen: HashSet<BTreeSet<&'static str>>,
    cycles: Vec<ContainerError>,
}

impl CycleSearch<'_> {
    fn visit(&mut self, node: ServiceKey) {
        self.visited.insert(node);
        self.path.push(node);

        let neighbors = self.graph.get(&node).cloned().unwrap_or_default();
        for neighbor in neighbors {
            if let Some(start) = self.path.iter().position(|k| *k == neighbor) {
                self.record(start, neighbor);
            } else if !self.visited.contains(&neighbor) {
                self.visit(neighbor);
            }
        }

        self.path.pop();
    }

    fn record(&mut self, start: usize, back_to: ServiceKey) {
        let members: BTreeSet<&'static str> =
            self.path[start..].iter().map(ServiceKey::type_name).collect();
        if !self.seen.insert(members) {
            return;
        }

        let mut chain: Vec<&'static str> =
            self.path[start..].iter().map(ServiceKey::type_name).collect();
        chain.push(back_to.type_name());
        self.cycles.push(ContainerError::CyclicDependency { chain });
    }
}
