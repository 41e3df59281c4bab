//! Multi-node placement
//!
//! A task with a [`ParallelEnvironment`] reserves several nodes at once;
//! the optional [`TopologyDescriptor`] constrains where those nodes live.

use std::sync::Arc;

use crate::error::JobError;

/// Placement constraint for the nodes of a parallel task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyDescriptor {
    /// No constraint
    Arbitrary,
    /// Nodes as close to each other as possible
    BestProximity,
    /// Nodes whose pairwise latency is below `threshold` (microseconds)
    ThresholdProximity { threshold: i64 },
    /// All nodes on one host
    SingleHost,
    /// One host, reserved exclusively
    SingleHostExclusive,
    /// Several hosts, each reserved exclusively
    MultipleHostsExclusive,
    /// One node per host, hosts reserved exclusively
    DifferentHostsExclusive,
}

impl TopologyDescriptor {
    /// Exclusive descriptors reserve whole hosts.
    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            Self::SingleHostExclusive | Self::MultipleHostsExclusive | Self::DifferentHostsExclusive
        )
    }
}

/// Node reservation of a parallel task.
///
/// The topology descriptor is shared between clones: copying an
/// environment copies the node count and points at the same descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelEnvironment {
    nodes_number: u32,
    topology: Option<Arc<TopologyDescriptor>>,
}

impl ParallelEnvironment {
    pub fn new(nodes_number: i64, topology: Option<TopologyDescriptor>) -> Result<Self, JobError> {
        if nodes_number < 1 || nodes_number > i64::from(u32::MAX) {
            return Err(JobError::InvalidNodesNumber(nodes_number));
        }
        Ok(Self {
            nodes_number: nodes_number as u32,
            topology: topology.map(Arc::new),
        })
    }

    pub fn nodes_number(&self) -> u32 {
        self.nodes_number
    }

    pub fn topology(&self) -> Option<&TopologyDescriptor> {
        self.topology.as_deref()
    }

    /// Shared handle on the descriptor, for callers that keep it around.
    pub fn topology_handle(&self) -> Option<Arc<TopologyDescriptor>> {
        self.topology.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_less_than_one_node() {
        assert_eq!(
            ParallelEnvironment::new(0, None),
            Err(JobError::InvalidNodesNumber(0))
        );
        assert!(ParallelEnvironment::new(-2, None).is_err());
    }

    #[test]
    fn test_clone_shares_topology() {
        let env = ParallelEnvironment::new(4, Some(TopologyDescriptor::SingleHost)).unwrap();
        let copy = env.clone();

        assert_eq!(copy.nodes_number(), 4);
        let (a, b) = (env.topology_handle().unwrap(), copy.topology_handle().unwrap());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_exclusive_topologies() {
        assert!(TopologyDescriptor::SingleHostExclusive.is_exclusive());
        assert!(TopologyDescriptor::DifferentHostsExclusive.is_exclusive());
        assert!(!TopologyDescriptor::BestProximity.is_exclusive());
    }

    #[test]
    fn test_without_topology() {
        let env = ParallelEnvironment::new(2, None).unwrap();
        assert!(env.topology().is_none());
    }
}
