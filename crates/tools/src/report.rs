//! JSON shapes printed by the command line.

use catalog::{Field, FieldError, GeoRecord, NewMemory, RecordId, ValidationErrors};
use cluster::{ClusterId, ClusterNode};
use foundation::LngLat;
use map::{HeadlessSurface, LoadState, MapView, MarkerSpec, MarkerState, MarkerTarget, Viewport};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeReport {
    Cluster {
        id: ClusterId,
        position: LngLat,
        count: usize,
    },
    Memory {
        id: RecordId,
        position: LngLat,
        title: String,
    },
}

impl From<ClusterNode<'_, GeoRecord>> for NodeReport {
    fn from(node: ClusterNode<'_, GeoRecord>) -> Self {
        match node {
            ClusterNode::Aggregate(a) => NodeReport::Cluster {
                id: a.id,
                position: a.position,
                count: a.count,
            },
            ClusterNode::Leaf(leaf) => NodeReport::Memory {
                id: leaf.item.id.clone(),
                position: leaf.position,
                title: leaf.item.display_title().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClustersReport {
    /// Index level that answered the query.
    pub zoom: u8,
    pub nodes: Vec<NodeReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandReport {
    pub cluster: ClusterId,
    pub expansion_zoom: u8,
    pub children: Vec<NodeReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMarker {
    pub target: MarkerTarget,
    pub state: MarkerState,
    pub spec: MarkerSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub load: LoadState,
    pub viewport: Viewport,
    pub markers: Vec<RenderedMarker>,
}

impl RenderReport {
    pub fn of(view: &MapView<HeadlessSurface>) -> Self {
        let markers = view
            .markers()
            .handles()
            .iter()
            .filter_map(|handle| {
                let spec = view.surface().marker(handle.surface_id)?;
                Some(RenderedMarker {
                    target: handle.target.clone(),
                    state: handle.state,
                    spec: spec.clone(),
                })
            })
            .collect();
        Self {
            load: view.load_state().clone(),
            viewport: *view.viewport(),
            markers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    pub field: Field,
    pub message: String,
}

impl From<&FieldError> for FieldReport {
    fn from(err: &FieldError) -> Self {
        Self {
            field: err.field(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ValidateReport {
    Valid { memory: NewMemory },
    Invalid { errors: Vec<FieldReport> },
}

impl From<Result<NewMemory, ValidationErrors>> for ValidateReport {
    fn from(result: Result<NewMemory, ValidationErrors>) -> Self {
        match result {
            Ok(memory) => ValidateReport::Valid { memory },
            Err(errors) => ValidateReport::Invalid {
                errors: errors.iter().map(FieldReport::from).collect(),
            },
        }
    }
}
