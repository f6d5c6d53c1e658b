//! Name-based condition evaluation.

use std::sync::Arc;

use dashmap::DashMap;

use crate::runtime::{
    host::{
        args::{split_args, split_queries},
        ConditionEvaluator,
    },
    InvocationContext,
};

/// Handler for one named query.
///
/// Receives the tokenized query, name first, and the call context.
pub type QueryFn =
    Arc<dyn Fn(&[String], &InvocationContext<'_>) -> Result<bool, String> + Send + Sync>;

/// [`ConditionEvaluator`] over a table of named queries.
///
/// A condition is a comma-separated list of queries that must all hold. A
/// query is a name followed by whitespace-separated arguments, optionally
/// prefixed with `!` to negate it. Names are case-insensitive. `TRUE` and
/// `FALSE` are always available.
///
/// An unknown query or a handler error is logged and makes the whole
/// condition false, negated or not.
///
/// # Examples
///
/// ```rust,ignore
/// let queries = QueryEvaluator::new();
/// queries.register("SEASON", |args, _| Ok(args.get(1).is_some_and(|s| s == "spring")));
///
/// assert!(queries.evaluate("SEASON spring, !FALSE", &ctx));
/// ```
pub struct QueryEvaluator {
    queries: DashMap<String, QueryFn>,
}

impl QueryEvaluator {
    /// Creates an evaluator with the built-in `TRUE` and `FALSE` queries.
    #[must_use]
    pub fn new() -> Self {
        let evaluator = Self {
            queries: DashMap::new(),
        };
        evaluator.register("TRUE", |_, _| Ok(true));
        evaluator.register("FALSE", |_, _| Ok(false));
        evaluator
    }

    /// Registers or replaces a query handler.
    pub fn register<F>(&self, name: &str, handler: F)
    where
        F: Fn(&[String], &InvocationContext<'_>) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.queries
            .insert(name.to_ascii_uppercase(), Arc::new(handler));
    }

    /// Returns `true` if a query with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(&name.to_ascii_uppercase())
    }

    fn check(&self, query: &str, ctx: &InvocationContext<'_>) -> bool {
        let (negated, body) = match query.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, query),
        };

        let args = split_args(body);
        let Some(name) = args.first() else {
            tracing::warn!(query, "Empty query in condition");
            return false;
        };

        let handler = match self.queries.get(&name.to_ascii_uppercase()) {
            Some(entry) => entry.value().clone(),
            None => {
                tracing::warn!(query = %name, "Unknown condition query");
                return false;
            }
        };

        match handler(&args, ctx) {
            Ok(result) => result != negated,
            Err(message) => {
                tracing::warn!(query, %message, "Condition query failed");
                false
            }
        }
    }
}

impl ConditionEvaluator for QueryEvaluator {
    fn evaluate(&self, condition: &str, ctx: &InvocationContext<'_>) -> bool {
        split_queries(condition)
            .into_iter()
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .all(|query| self.check(query, ctx))
    }
}

impl Default for QueryEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEvaluator")
            .field("query_count", &self.queries.len())
            .finish_non_exhaustive()
    }
}
