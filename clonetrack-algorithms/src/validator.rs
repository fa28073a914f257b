//! Feasibility gates and method selection for one day.

use std::fmt;

use chrono::FixedOffset;
use clonetrack_core::{
    Assignment, ClusteringConfig, DetectionPairRow, Edge, Graph, GraphBuilder, Label, Method,
    Result,
};
use log::debug;

use crate::chain::TwoPairsChainHandler;
use crate::greedy::GreedyTemporalClustering;
use crate::spatial::SpatialKMeansClustering;

/// Why a day was judged not clusterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// No rows for the day.
    EmptyInput,
    /// No complete pair survived graph construction.
    EmptyGraph,
    /// Some pair spans no more than the minimum separation.
    InsufficientSeparation,
    /// Two pairs that do not form an A–B–C chain.
    NoChain,
    /// Too many pairs for exact handling, too few for the algorithms.
    DeadZone,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmptyInput => "empty input",
            Self::EmptyGraph => "no complete pair",
            Self::InsufficientSeparation => "pairs too close together",
            Self::NoChain => "two pairs without a shared detection",
            Self::DeadZone => "pair count between exact and algorithmic handling",
        })
    }
}

/// Result of assessing one day.
#[derive(Debug, Clone)]
pub struct DayAssessment {
    /// The day's constraint graph (empty if the input was empty).
    pub graph: Graph,
    /// Node labels; empty when the day was rejected.
    pub assignment: Assignment,
    /// Method that produced the labels.
    pub method: Option<Method>,
    /// Smallest pair distance (km).
    pub min_pair_km: f64,
    /// Number of pairs that made it into the graph.
    pub n_pairs: usize,
    /// Violations of the chosen labels.
    pub violations: usize,
    /// Reason for rejection, if any.
    pub rejection: Option<Rejection>,
}

impl DayAssessment {
    fn rejected(graph: Graph, min_pair_km: f64, rejection: Rejection) -> Self {
        let n_pairs = graph.edges().len();
        Self {
            graph,
            assignment: Assignment::new(),
            method: None,
            min_pair_km,
            n_pairs,
            violations: 0,
            rejection: Some(rejection),
        }
    }

    fn accepted(graph: Graph, min_pair_km: f64, method: Method, assignment: Assignment) -> Self {
        let n_pairs = graph.edges().len();
        let violations = assignment.violations(graph.edges());
        Self {
            graph,
            assignment,
            method: Some(method),
            min_pair_km,
            n_pairs,
            violations,
            rejection: None,
        }
    }

    /// Returns true if the day produced a labelling.
    #[must_use]
    pub fn is_clusterable(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Decides whether a day can be split into two vehicles, and how.
#[derive(Debug, Clone)]
pub struct ClusteringValidator {
    config: ClusteringConfig,
    offset: FixedOffset,
}

impl ClusteringValidator {
    /// Creates a validator.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ClusteringConfig) -> Result<Self> {
        config.validate()?;
        let offset = config.offset()?;
        Ok(Self { config, offset })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Assesses one day of detection pairs.
    #[must_use]
    pub fn is_clusterable(&self, rows: &[DetectionPairRow]) -> DayAssessment {
        if rows.is_empty() {
            return DayAssessment::rejected(Graph::default(), 0.0, Rejection::EmptyInput);
        }
        match GraphBuilder::with_offset(self.offset).build(rows) {
            Ok(graph) => self.assess_graph(graph),
            Err(err) => {
                debug!("graph construction failed: {err}");
                DayAssessment::rejected(Graph::default(), 0.0, Rejection::EmptyInput)
            }
        }
    }

    /// Assesses an already-built graph.
    #[must_use]
    pub fn assess_graph(&self, graph: Graph) -> DayAssessment {
        if graph.is_empty() {
            return DayAssessment::rejected(graph, 0.0, Rejection::EmptyGraph);
        }

        let min_pair_km = graph.min_pair_distance_km();
        if min_pair_km <= self.config.min_pair_distance_km {
            debug!(
                "minimum pair distance {min_pair_km:.3} km <= {} km",
                self.config.min_pair_distance_km
            );
            return DayAssessment::rejected(graph, min_pair_km, Rejection::InsufficientSeparation);
        }

        let n_pairs = graph.edges().len();
        match n_pairs {
            1 => {
                let labels = single_pair_labels(&graph.edges()[0]);
                DayAssessment::accepted(graph, min_pair_km, Method::ManualSinglePair, labels)
            }
            2 => match TwoPairsChainHandler::handle(graph.edges()) {
                Some(labels) => {
                    DayAssessment::accepted(graph, min_pair_km, Method::TwoPairsChain, labels)
                }
                None => DayAssessment::rejected(graph, min_pair_km, Rejection::NoChain),
            },
            n if n < self.config.min_algorithmic_pairs => {
                DayAssessment::rejected(graph, min_pair_km, Rejection::DeadZone)
            }
            _ => {
                let greedy =
                    GreedyTemporalClustering::new(self.config.max_speed_kmh).cluster(&graph);
                let spatial = SpatialKMeansClustering::new(self.config.kmeans_seed).cluster(&graph);
                let (method, labels, _) = select_assignment(greedy, spatial, graph.edges());
                DayAssessment::accepted(graph, min_pair_km, method, labels)
            }
        }
    }
}

fn single_pair_labels(edge: &Edge) -> Assignment {
    [
        (edge.origin, Label::Vehicle0),
        (edge.destination, Label::Vehicle1),
    ]
    .into_iter()
    .collect()
}

/// Keeps whichever labelling has fewer violations; ties favour greedy.
///
/// Returns the method tag, the labels and their violation count.
#[must_use]
pub fn select_assignment(
    greedy: Assignment,
    spatial: Assignment,
    edges: &[Edge],
) -> (Method, Assignment, usize) {
    let greedy_violations = greedy.violations(edges);
    let spatial_violations = spatial.violations(edges);
    debug!("violations: greedy={greedy_violations} spatial={spatial_violations}");

    if greedy_violations <= spatial_violations {
        (Method::GreedyTemporalFeasible, greedy, greedy_violations)
    } else {
        (Method::SpatialKMeansRepair, spatial, spatial_violations)
    }
}
