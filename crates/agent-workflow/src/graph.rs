//! Task graph definition and execution

use agent_core::{Agent, Context, Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// One unit of work: an agent, what to ask it, and whose output it needs
#[derive(Clone)]
pub struct TaskNode {
    pub id: String,
    pub agent: Arc<dyn Agent>,
    pub description: String,
    pub expected_output: String,
    pub depends_on: Vec<String>,
}

impl TaskNode {
    pub fn new(
        id: impl Into<String>,
        agent: Arc<dyn Agent>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent,
            description: description.into(),
            expected_output: expected_output.into(),
            depends_on: Vec::new(),
        }
    }

    /// Declare tasks whose outputs this task receives as context
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Prompt sent to the agent, with dependency outputs appended
    fn prompt(&self, context: &Context) -> String {
        let mut prompt = format!(
            "{}\n\nExpected output: {}",
            self.description.trim(),
            self.expected_output.trim()
        );

        if !self.depends_on.is_empty() {
            prompt.push_str("\n\nContext from earlier tasks:");
            for dep in &self.depends_on {
                let output = context.task_output(dep).unwrap_or_default();
                prompt.push_str(&format!("\n\n### {dep}\n{output}"));
            }
        }

        prompt
    }
}

/// A validated DAG of tasks
///
/// Tasks run sequentially. Among the tasks whose dependencies are satisfied,
/// the one declared first runs first, so a graph declared in a valid order
/// runs in exactly that order.
///
/// # Example
///
/// ```no_run
/// use agent_core::{Agent, Context};
/// use agent_workflow::{TaskGraph, TaskNode};
/// use std::sync::Arc;
///
/// # async fn example(news: Arc<dyn Agent>, writer: Arc<dyn Agent>) -> agent_core::Result<()> {
/// let graph = TaskGraph::builder()
///     .add_task(TaskNode::new("news", news, "Get BTC news", "One paragraph"))
///     .add_task(
///         TaskNode::new("report", writer, "Write the report", "One paragraph")
///             .depends_on(["news"]),
///     )
///     .build()?;
///
/// let mut context = Context::new().with_symbol("BTC");
/// let report = graph.execute(&mut context).await?;
/// # Ok(())
/// # }
/// ```
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    order: Vec<usize>,
}

impl TaskGraph {
    /// Create a new graph builder
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::new()
    }

    /// Task ids in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.nodes[i].id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run every task in order and return the output of the last one
    ///
    /// Each output is recorded in `context` under its task id. The first
    /// failing task aborts the run.
    pub async fn execute(&self, context: &mut Context) -> Result<String> {
        let mut last_output = String::new();

        for &index in &self.order {
            let node = &self.nodes[index];
            let prompt = node.prompt(context);
            let started = Instant::now();

            info!(
                task = %node.id,
                agent = node.agent.name(),
                depends_on = ?node.depends_on,
                "Task started"
            );

            let output = node.agent.process(prompt, context).await?;

            info!(
                task = %node.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                output_length = output.len(),
                "Task finished"
            );

            context.set_task_output(&node.id, output.clone());
            last_output = output;
        }

        Ok(last_output)
    }
}

/// Builder for constructing task graphs
#[derive(Default)]
pub struct TaskGraphBuilder {
    nodes: Vec<TaskNode>,
}

impl TaskGraphBuilder {
    /// Create a new graph builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the graph
    pub fn add_task(mut self, node: TaskNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Validate the graph and compute its execution order
    ///
    /// Rejects empty graphs, duplicate ids, unknown dependencies and cycles.
    pub fn build(self) -> Result<TaskGraph> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidGraph("graph has no tasks".to_string()));
        }

        let mut index_of = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if index_of.insert(node.id.as_str(), i).is_some() {
                return Err(Error::InvalidGraph(format!("duplicate task id '{}'", node.id)));
            }
        }

        let mut deps: Vec<HashSet<usize>> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut set = HashSet::new();
            for dep in &node.depends_on {
                let &d = index_of.get(dep.as_str()).ok_or_else(|| {
                    Error::InvalidGraph(format!(
                        "task '{}' depends on unknown task '{dep}'",
                        node.id
                    ))
                })?;
                set.insert(d);
            }
            deps.push(set);
        }

        let order = topological_order(&deps).ok_or_else(|| {
            Error::InvalidGraph("task dependencies form a cycle".to_string())
        })?;

        Ok(TaskGraph {
            nodes: self.nodes,
            order,
        })
    }
}

/// Kahn's algorithm, always picking the earliest declared ready task
fn topological_order(deps: &[HashSet<usize>]) -> Option<Vec<usize>> {
    let mut done = vec![false; deps.len()];
    let mut order = Vec::with_capacity(deps.len());

    while order.len() < deps.len() {
        let next = (0..deps.len()).find(|&i| !done[i] && deps[i].iter().all(|&d| done[d]))?;
        done[next] = true;
        order.push(next);
    }

    Some(order)
}
