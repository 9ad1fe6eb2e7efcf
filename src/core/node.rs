use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

use crate::core::config::NodeConfig;
use crate::core::database::SharedDatabase;
use crate::core::error::{ErrorKind, NodeError, NodeResult};
use crate::core::frame::TabularFrame;
use crate::core::signature::Signature;
use crate::core::telemetry::{Telemetry, TraceEntry};

/// Where an invocation is in its read → transform → write lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Start,
    ParamsResolved,
    Connected,
    InputsRead,
    Transformed,
    OutputWritten,
    Closed(Outcome),
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(ErrorKind),
}

/// Defines the behavior of a pipeline node.
///
/// `prep` reads, `exec` transforms, `post` writes. Only `exec` and
/// `clone_box` must be provided: the defaults read the primary input table
/// and commit the result under the configured output name.
pub trait NodeLogic: Send + Sync + 'static {
    /// Columns this node reads from its primary input and adds to its output.
    fn signature(&self) -> Signature {
        Signature::new()
    }

    /// Load the input frames.
    ///
    /// The primary input's schema is checked against [`NodeLogic::signature`]
    /// before any rows are read.
    fn prep(&self, db: &SharedDatabase, config: &NodeConfig) -> NodeResult<Vec<TabularFrame>> {
        let primary = config.primary_input()?;
        let described = db.describe_table(primary)?;

        let validation = self.signature().check_input(&described);
        validation.log_summary(&format!("input '{primary}'"));
        validation.into_result()?;

        Ok(vec![db.read_table(primary)?])
    }

    /// Compute the output frame. Must not touch the database.
    fn exec(&self, inputs: Vec<TabularFrame>) -> NodeResult<TabularFrame>;

    /// Commit the output frame with replace semantics.
    fn post(
        &self,
        db: &mut SharedDatabase,
        config: &NodeConfig,
        output: &TabularFrame,
    ) -> NodeResult<()> {
        let validation = self
            .signature()
            .check_output(output, &config.expected_columns);
        validation.log_summary(&format!("output '{}'", config.output_table));
        validation.into_result()?;

        db.replace_table(&config.output_table, output)?;
        if !db.relation_exists(&config.output_table)? {
            return Err(NodeError::write(
                config.output_table.as_str(),
                "table not visible after commit",
            ));
        }
        Ok(())
    }

    /// Create a boxed clone of this trait object.
    fn clone_box(&self) -> Box<dyn NodeLogic>;
}

impl Clone for Box<dyn NodeLogic> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// What happened during one invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub node_name: String,
    pub states: Vec<NodeState>,
    pub input_rows: usize,
    pub output_rows: usize,
    pub duration: Duration,
}

impl RunReport {
    fn new(node_name: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            node_name: node_name.to_string(),
            states: vec![NodeState::Start],
            input_rows: 0,
            output_rows: 0,
            duration: Duration::ZERO,
        }
    }

    fn advance(&mut self, state: NodeState) {
        log::debug!("Node '{}' -> {:?}", self.node_name, state);
        self.states.push(state);
    }

    /// The last state reached.
    pub fn state(&self) -> NodeState {
        self.states.last().copied().unwrap_or(NodeState::Start)
    }

    /// The last state reached before the node closed.
    pub fn last_completed(&self) -> NodeState {
        self.states
            .iter()
            .rev()
            .find(|s| !matches!(s, NodeState::Closed(_)))
            .copied()
            .unwrap_or(NodeState::Start)
    }

    pub fn succeeded(&self) -> bool {
        self.state() == NodeState::Closed(Outcome::Success)
    }

    fn trace_entry(&self, config: &NodeConfig, signature: &Signature) -> TraceEntry {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let (status, error_kind) = match self.state() {
            NodeState::Closed(Outcome::Failure(kind)) => ("failure", Some(kind.to_string())),
            _ => ("success", None),
        };

        TraceEntry {
            timestamp,
            run_id: self.run_id.to_string(),
            node_name: self.node_name.clone(),
            signature_hash: signature.structural_hash(),
            input_tables: config.input_tables.iter().map(|t| t.to_string()).collect(),
            output_table: config.output_table.to_string(),
            input_rows: self.input_rows as u64,
            output_rows: self.output_rows as u64,
            status: status.to_string(),
            error_kind,
            duration_ms: self.duration.as_millis() as u64,
            metadata: [
                ("database_path".to_string(), config.database_path.clone()),
                (
                    "last_completed".to_string(),
                    format!("{:?}", self.last_completed()),
                ),
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// A failed invocation: the error plus how far the node got.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct NodeFailure {
    pub error: NodeError,
    pub report: RunReport,
}

impl NodeFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// A single pipeline step bound to its logic.
pub struct Node {
    /// The logic implementation that defines the node's behavior
    pub behaviour: Box<dyn NodeLogic>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            behaviour: self.behaviour.clone_box(),
        }
    }
}

impl Node {
    /// Creates a new node with the given logic.
    pub fn new<L: NodeLogic>(behaviour: L) -> Self {
        Node {
            behaviour: Box::new(behaviour),
        }
    }

    /// Executes one invocation against the shared database.
    pub fn run(&self, config: &NodeConfig) -> Result<RunReport, NodeFailure> {
        self.run_with_telemetry(config, None)
    }

    /// Executes one invocation and records its trace.
    ///
    /// The database connection is released before this returns, whichever
    /// step failed.
    pub fn run_with_telemetry(
        &self,
        config: &NodeConfig,
        telemetry: Option<&dyn Telemetry>,
    ) -> Result<RunReport, NodeFailure> {
        let started = Instant::now();
        let mut report = RunReport::new(&config.model_name);
        report.advance(NodeState::ParamsResolved);

        log::info!(
            "Running node '{}': [{}] -> {}",
            config.model_name,
            config
                .input_tables
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            config.output_table
        );

        let result = self.execute(config, &mut report);
        report.advance(NodeState::Closed(match &result {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::Failure(e.kind()),
        }));
        report.duration = started.elapsed();

        if let Some(t) = telemetry {
            t.record(report.trace_entry(config, &self.behaviour.signature()));
        }

        match result {
            Ok(()) => {
                log::info!(
                    "Node '{}' wrote {} rows to '{}' in {:?}",
                    config.model_name,
                    report.output_rows,
                    config.output_table,
                    report.duration
                );
                Ok(report)
            }
            Err(error) => Err(NodeFailure { error, report }),
        }
    }

    fn execute(&self, config: &NodeConfig, report: &mut RunReport) -> NodeResult<()> {
        // `db` is released on drop if any step below returns early.
        let mut db = SharedDatabase::open(&config.database_path)?;
        report.advance(NodeState::Connected);

        let inputs = self.behaviour.prep(&db, config)?;
        report.input_rows = inputs.first().map(TabularFrame::row_count).unwrap_or(0);
        report.advance(NodeState::InputsRead);

        let output = self.behaviour.exec(inputs)?;
        report.advance(NodeState::Transformed);

        self.behaviour.post(&mut db, config, &output)?;
        report.output_rows = output.row_count();
        report.advance(NodeState::OutputWritten);

        db.close()
    }
}
