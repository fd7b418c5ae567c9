//! Variant resolution for build invocations.
//!
//! Turns the task names a build was started with (`assembleRelease`,
//! `:app:assembleFreeDebug`, ...) into the exact set of variants being
//! produced. A name that does not map onto a manifest-merge task directly is
//! treated as an aggregate and its declared dependencies are walked, bounded
//! by a depth cap.

mod config;
mod graph;
mod parser;
mod result;

pub use config::{
    ResolverConfig, DEFAULT_MANIFEST_TASK_FORMAT, DEFAULT_MAX_DEPTH, DEFAULT_TASK_PREFIXES,
    VARIANT_PLACEHOLDER,
};
pub use graph::{TaskGraph, TaskGraphSnapshot, TaskKind, TaskNode};
pub use parser::{capitalize, decapitalize, parse_task_name, ParsedTaskName, TaskNamePattern};
pub use result::{Resolution, ResolutionMiss};

use std::collections::{BTreeSet, HashSet};

/// Errors building a resolver from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("invalid task prefix: {0:?}")]
    InvalidPrefix(String),

    #[error("invalid pattern for prefix {prefix:?}: {message}")]
    InvalidPattern { prefix: String, message: String },

    #[error("manifest task format must contain {{}}: {0:?}")]
    InvalidFormat(String),

    #[error("max_depth must be at least 1")]
    InvalidDepth,
}

/// Resolves invocations against a task graph.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
    patterns: Vec<TaskNamePattern>,
}

impl Resolver {
    /// Create a resolver, compiling one pattern per configured prefix.
    pub fn new(config: ResolverConfig) -> Result<Self, ResolverError> {
        if !config.manifest_task_format.contains(VARIANT_PLACEHOLDER) {
            return Err(ResolverError::InvalidFormat(
                config.manifest_task_format.clone(),
            ));
        }
        if config.max_depth == 0 {
            return Err(ResolverError::InvalidDepth);
        }
        let patterns = config
            .task_prefixes
            .iter()
            .map(|prefix| TaskNamePattern::new(prefix, config.project.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, patterns })
    }

    /// The configuration this resolver was built from.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every requested task name and union the variants.
    pub fn resolve<G: TaskGraph + ?Sized>(&self, invocation: &[String], graph: &G) -> Resolution {
        let mut resolution = Resolution {
            invocation: invocation.to_vec(),
            ..Default::default()
        };

        for requested in invocation {
            let misses_before = resolution.misses.len();
            let found = self.resolve_one(requested, graph, &mut resolution.misses);

            let recognized = parse_task_name(&self.patterns, requested).is_some();
            if found.is_empty() && recognized && resolution.misses.len() == misses_before {
                resolution
                    .misses
                    .push(ResolutionMiss::NoVariant(requested.clone()));
            }
            resolution.variants.extend(found);
        }

        resolution
    }

    /// Walk from one requested task name using an explicit work-list.
    fn resolve_one<G: TaskGraph + ?Sized>(
        &self,
        requested: &str,
        graph: &G,
        misses: &mut Vec<ResolutionMiss>,
    ) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut work: Vec<(String, usize)> = vec![(requested.to_string(), 0)];
        visited.insert(requested.to_string());

        while let Some((name, depth)) = work.pop() {
            let Some(parsed) = parse_task_name(&self.patterns, &name) else {
                // Dependencies outside the recognized prefixes are expected
                // (preBuild, lint, ...); only the requested name is reported.
                if depth == 0 {
                    misses.push(ResolutionMiss::UnsupportedTask(name));
                }
                continue;
            };

            let merge_task = self.config.manifest_task_name(&parsed.token);
            if self
                .lookup(graph, &parsed, &merge_task)
                .is_some_and(|task| task.is_manifest_merge())
            {
                found.insert(parsed.variant());
                continue;
            }

            let aggregate_name = parsed.task_name();
            let aggregate = graph
                .task(name.trim())
                .or_else(|| self.lookup(graph, &parsed, &aggregate_name));
            let Some(aggregate) = aggregate else {
                misses.push(ResolutionMiss::LookupFailure {
                    task: aggregate_name,
                    origin: requested.to_string(),
                });
                continue;
            };

            if depth >= self.config.max_depth {
                misses.push(ResolutionMiss::DepthExceeded {
                    task: aggregate_name,
                    origin: requested.to_string(),
                });
                continue;
            }

            for dep in &aggregate.depends_on {
                if visited.insert(dep.clone()) {
                    work.push((dep.clone(), depth + 1));
                }
            }
        }

        found
    }

    /// Find `task` in the project `parsed` was qualified with, then in the
    /// configured project, then by simple name.
    fn lookup<'g, G: TaskGraph + ?Sized>(
        &self,
        graph: &'g G,
        parsed: &ParsedTaskName,
        task: &str,
    ) -> Option<&'g TaskNode> {
        let in_project = self
            .config
            .project
            .as_ref()
            .map(|project| format!(":{}:{}", project, task));
        parsed
            .qualify(task)
            .into_iter()
            .chain(in_project)
            .chain(std::iter::once(task.to_string()))
            .find_map(|candidate| graph.task(&candidate))
    }
}

/// Resolve an invocation with the given configuration.
pub fn resolve<G: TaskGraph + ?Sized>(
    invocation: &[String],
    graph: &G,
    config: &ResolverConfig,
) -> Result<Resolution, ResolverError> {
    Ok(Resolver::new(config.clone())?.resolve(invocation, graph))
}
