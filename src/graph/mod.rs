//! Pull-based signal-processing graph.
//!
//! Nodes are tagged variants stored in an arena and addressed by index. A
//! node references at most two upstream nodes; upstream ids must already
//! exist when a node is added, so wiring a cycle is impossible by
//! construction. The owning pipeline updates the arena once per tick in
//! insertion order, which is therefore dependency order.

pub mod average;
pub mod derivative;
pub mod input;
pub mod onset;

pub use average::AveragingFilter;
pub use derivative::DerivativeFilter;
pub use input::InputStage;
pub use onset::{Axis, OnsetDetector, OnsetState};

use crate::sample::{Sample, SampleBuffer};

/// Index of a node within its graph.
pub type NodeId = usize;

/// The node kinds a graph can hold.
pub enum NodeKind {
    /// Pulls valid samples from the sensor's raw buffer.
    Input(InputStage),
    /// Trailing moving average per channel.
    Average(AveragingFilter),
    /// First differences per channel.
    Derivative(DerivativeFilter),
    /// Peak finding, thresholding and debouncing over the averaged signal.
    Onset(OnsetDetector),
}

struct GraphNode {
    kind: NodeKind,
    upstream: [Option<NodeId>; 2],
    output: Vec<Sample>,
    new_samples: usize,
}

/// A small DAG of signal nodes for one sensor.
pub struct SignalGraph {
    nodes: Vec<GraphNode>,
}

/// Graph wiring errors.
#[derive(Debug, PartialEq, Eq)]
pub enum GraphError {
    /// Referenced upstream node does not exist yet.
    UnknownUpstream(NodeId),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::UnknownUpstream(id) => write!(f, "unknown upstream node {id}"),
        }
    }
}

impl std::error::Error for GraphError {}

impl SignalGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node fed by up to two existing upstream nodes.
    pub fn add(
        &mut self,
        kind: NodeKind,
        upstream: [Option<NodeId>; 2],
    ) -> Result<NodeId, GraphError> {
        let id = self.nodes.len();
        for up in upstream.into_iter().flatten() {
            if up >= id {
                return Err(GraphError::UnknownUpstream(up));
            }
        }
        self.nodes.push(GraphNode {
            kind,
            upstream,
            output: Vec::new(),
            new_samples: 0,
        });
        Ok(id)
    }

    /// Recompute every node in dependency order.
    ///
    /// `source` is the owning sensor's raw buffer, read by input nodes;
    /// `now` is the caller's monotonic clock in seconds.
    pub fn update(&mut self, source: &SampleBuffer, now: f64) {
        for i in 0..self.nodes.len() {
            let (done, rest) = self.nodes.split_at_mut(i);
            let node = &mut rest[0];

            let up0 = node.upstream[0].map(|id| &done[id]);
            let up1 = node.upstream[1].map(|id| &done[id]);
            // A node's new-sample count derives from its upstream(s).
            let upstream_new = match (up0, up1) {
                (Some(a), Some(b)) => a.new_samples.max(b.new_samples),
                (Some(a), None) | (None, Some(a)) => a.new_samples,
                (None, None) => 0,
            };
            let upstream_output: &[Sample] = up0.map(|n| n.output.as_slice()).unwrap_or(&[]);

            match &mut node.kind {
                NodeKind::Input(stage) => {
                    node.output = stage.process(source);
                    node.new_samples = source.new_count();
                }
                NodeKind::Average(filter) => {
                    node.output = filter.process(upstream_output);
                    node.new_samples = upstream_new;
                }
                NodeKind::Derivative(filter) => {
                    node.output = filter.process(upstream_output);
                    node.new_samples = upstream_new;
                }
                NodeKind::Onset(detector) => {
                    detector.update(upstream_output, upstream_new, now);
                    node.output.clear();
                    node.new_samples = 0;
                }
            }
        }
    }

    /// A node's last computed output buffer.
    pub fn output(&self, id: NodeId) -> &[Sample] {
        &self.nodes[id].output
    }

    /// How many of a node's outputs are new this tick.
    pub fn new_samples(&self, id: NodeId) -> usize {
        self.nodes[id].new_samples
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id].kind
    }

    /// Current onset state, if the node is an onset detector.
    pub fn onset_state(&self, id: NodeId) -> Option<OnsetState> {
        match &self.nodes[id].kind {
            NodeKind::Onset(detector) => Some(detector.state()),
            _ => None,
        }
    }
}

impl Default for SignalGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    #[test]
    fn test_upstream_must_exist() {
        let mut graph = SignalGraph::new();
        let err = graph
            .add(NodeKind::Average(AveragingFilter::new(2, 1)), [Some(3), None])
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownUpstream(3));
    }

    #[test]
    fn test_new_sample_count_derives_from_upstreams() {
        let mut buf = SampleBuffer::new(64);
        for i in 0..6 {
            let mut s = Sample::new(i as f64 * 0.02, 1);
            s.set_accel(i as f64, 0.0, 0.0);
            buf.append(s);
        }

        let mut graph = SignalGraph::new();
        let input = graph
            .add(NodeKind::Input(InputStage::new(48)), [None, None])
            .unwrap();
        let avg = graph
            .add(
                NodeKind::Average(AveragingFilter::new(2, 2)),
                [Some(input), None],
            )
            .unwrap();
        let deriv = graph
            .add(
                NodeKind::Derivative(DerivativeFilter::new(2)),
                [Some(avg), None],
            )
            .unwrap();

        graph.update(&buf, 0.1);

        assert_eq!(graph.new_samples(input), 6);
        assert_eq!(graph.new_samples(avg), 6);
        assert_eq!(graph.new_samples(deriv), 6);
        assert_eq!(graph.output(avg).len(), 6);
        assert_eq!(graph.output(deriv).len(), 5);
    }

    #[test]
    fn test_unattached_average_is_silent() {
        let buf = SampleBuffer::new(16);
        let mut graph = SignalGraph::new();
        let avg = graph
            .add(NodeKind::Average(AveragingFilter::new(3, 2)), [None, None])
            .unwrap();

        graph.update(&buf, 0.0);
        assert!(graph.output(avg).is_empty());
        assert_eq!(graph.new_samples(avg), 0);
    }
}
