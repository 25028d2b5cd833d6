//! Workflow graph and its interpreter.

use super::WorkflowError;
use crate::conversation::{Conversation, Message};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of node executions allowed per run.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// One step of a workflow.
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    /// Runs the step and returns the messages to append.
    ///
    /// # Arguments
    /// * `conversation` - The conversation so far
    ///
    /// # Returns
    /// Messages appended to the conversation, possibly none.
    async fn run(&self, conversation: &Conversation) -> Result<Vec<Message>, WorkflowError>;
}

/// Where a run goes after a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Run the named node next.
    Goto(String),
    /// Stop the run.
    End,
}

impl Transition {
    /// Transition to `node`.
    #[must_use]
    pub fn goto(node: impl Into<String>) -> Self {
        Self::Goto(node.into())
    }
}

/// Predicate choosing the next transition from the conversation.
pub type BranchFn = Box<dyn Fn(&Conversation) -> Transition + Send + Sync>;

/// Outgoing edge of a node.
pub enum Edge {
    /// Always continue to the named node.
    Always(String),
    /// Evaluate a predicate over the conversation.
    Branch(BranchFn),
}

impl Edge {
    /// Resolves the edge against the current conversation.
    #[must_use]
    pub fn next(&self, conversation: &Conversation) -> Transition {
        match self {
            Self::Always(target) => Transition::Goto(target.clone()),
            Self::Branch(predicate) => predicate(conversation),
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always(target) => f.debug_tuple("Always").field(target).finish(),
            Self::Branch(_) => f.write_str("Branch(..)"),
        }
    }
}

/// Reported to the observer before a node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEvent<'a> {
    /// 1-based step number.
    pub index: usize,
    /// Node about to run.
    pub node: &'a str,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    /// Final conversation.
    pub conversation: Conversation,
    /// Nodes executed, in order.
    pub steps: Vec<String>,
}

impl WorkflowRun {
    /// Text of the last message carrying code.
    #[must_use]
    pub fn final_output(&self) -> Option<String> {
        self.conversation.final_output()
    }
}

/// Collects nodes and edges and validates them into a [`WorkflowGraph`].
#[derive(Default)]
pub struct GraphBuilder {
    nodes: HashMap<String, Arc<dyn WorkflowNode>>,
    edges: HashMap<String, Edge>,
    entry: Option<String>,
    max_steps: Option<usize>,
    problems: Vec<String>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named node.
    #[must_use]
    pub fn add_node(mut self, name: impl Into<String>, node: Arc<dyn WorkflowNode>) -> Self {
        let name = name.into();
        if self.nodes.insert(name.clone(), node).is_some() {
            self.problems.push(format!("node '{name}' added twice"));
        }
        self
    }

    /// Adds an unconditional edge.
    #[must_use]
    pub fn add_edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.insert_edge(from.into(), Edge::Always(to.into()))
    }

    /// Adds a conditional edge.
    #[must_use]
    pub fn add_branch<F>(self, from: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Conversation) -> Transition + Send + Sync + 'static,
    {
        self.insert_edge(from.into(), Edge::Branch(Box::new(predicate)))
    }

    /// Sets the node a run starts at.
    #[must_use]
    pub fn set_entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Overrides the step limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    fn insert_edge(mut self, from: String, edge: Edge) -> Self {
        if self.edges.contains_key(&from) {
            self.problems.push(format!("node '{from}' has more than one outgoing edge"));
        } else {
            self.edges.insert(from, edge);
        }
        self
    }

    /// Validates and freezes the graph.
    ///
    /// # Errors
    /// Returns `WorkflowError::InvalidGraph` listing every problem found: a
    /// missing or unknown entry, edges from or to unknown nodes, nodes without
    /// an outgoing edge, duplicates, or a zero step limit.
    pub fn build(self) -> Result<WorkflowGraph, WorkflowError> {
        let mut problems = self.problems;

        match self.entry.as_deref() {
            None => problems.push("no entry node".to_string()),
            Some(entry) if !self.nodes.contains_key(entry) => {
                problems.push(format!("entry node '{entry}' does not exist"));
            }
            Some(_) => {}
        }

        let mut sources: Vec<&String> = self.edges.keys().collect();
        sources.sort();
        for from in sources {
            if !self.nodes.contains_key(from) {
                problems.push(format!("edge from unknown node '{from}'"));
            }
            if let Some(Edge::Always(to)) = self.edges.get(from) {
                if !self.nodes.contains_key(to) {
                    problems.push(format!("edge from '{from}' to unknown node '{to}'"));
                }
            }
        }

        let mut names: Vec<&String> = self.nodes.keys().collect();
        names.sort();
        for name in names {
            if !self.edges.contains_key(name) {
                problems.push(format!("node '{name}' has no outgoing edge"));
            }
        }

        let max_steps = self.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
        if max_steps == 0 {
            problems.push("step limit must be at least 1".to_string());
        }

        match (problems.is_empty(), self.entry) {
            (true, Some(entry)) => Ok(WorkflowGraph { nodes: self.nodes, edges: self.edges, entry, max_steps }),
            _ => Err(WorkflowError::InvalidGraph(problems.join("; "))),
        }
    }
}

/// A validated workflow graph.
pub struct WorkflowGraph {
    nodes: HashMap<String, Arc<dyn WorkflowNode>>,
    edges: HashMap<String, Edge>,
    entry: String,
    max_steps: usize,
}

impl fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nodes: Vec<&String> = self.nodes.keys().collect();
        nodes.sort();
        f.debug_struct("WorkflowGraph")
            .field("entry", &self.entry)
            .field("nodes", &nodes)
            .field("edges", &self.edges)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl WorkflowGraph {
    /// Entry node name.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Step limit.
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Returns `true` if a node named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Runs the graph to completion.
    ///
    /// # Errors
    /// Returns the first node error, or a step-limit or unknown-node error.
    pub async fn run(&self, conversation: Conversation) -> Result<WorkflowRun, WorkflowError> {
        self.run_with_observer(conversation, |_| {}).await
    }

    /// Runs the graph, reporting each step to `observer` before it executes.
    ///
    /// # Arguments
    /// * `conversation` - Initial conversation, usually one user message
    /// * `observer` - Called once per step
    ///
    /// # Errors
    /// Returns the first node error, or a step-limit or unknown-node error.
    pub async fn run_with_observer<F>(
        &self,
        mut conversation: Conversation,
        mut observer: F,
    ) -> Result<WorkflowRun, WorkflowError>
    where
        F: FnMut(StepEvent<'_>) + Send,
    {
        let mut current = self.entry.clone();
        let mut steps: Vec<String> = Vec::new();

        loop {
            if steps.len() >= self.max_steps {
                return Err(WorkflowError::StepLimit { limit: self.max_steps, node: current });
            }

            let node = self.nodes.get(&current).ok_or_else(|| WorkflowError::UnknownNode(current.clone()))?;
            let index = steps.len() + 1;
            observer(StepEvent { index, node: &current });
            info!(step = index, node = %current, "Running step");

            let appended = node.run(&conversation).await?;
            debug!(node = %current, appended = appended.len(), "Step finished");
            conversation.extend(appended);

            let transition = match self.edges.get(&current) {
                Some(edge) => edge.next(&conversation),
                None => Transition::End,
            };
            steps.push(current);

            match transition {
                Transition::Goto(next) => current = next,
                Transition::End => break,
            }
        }

        info!(steps = steps.len(), messages = conversation.len(), "Workflow finished");
        Ok(WorkflowRun { conversation, steps })
    }
}
