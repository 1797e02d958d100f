use std::fmt;
use std::str::FromStr;

use foundation::LngLat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ClusterError;

/// Identifies an aggregate within one [`crate::ClusterIndex`].
///
/// `zoom` is the level the aggregate was formed at; `seed` is the slot of the
/// node it grew from one level deeper. Ids are only meaningful for the index
/// that issued them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId {
    pub zoom: u8,
    pub seed: u32,
}

impl ClusterId {
    pub fn new(zoom: u8, seed: u32) -> Self {
        Self { zoom, seed }
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zoom, self.seed)
    }
}

impl FromStr for ClusterId {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ClusterError::MalformedId(s.to_string());
        let (zoom, seed) = s.split_once('/').ok_or_else(malformed)?;
        Ok(Self {
            zoom: zoom.trim().parse().map_err(|_| malformed())?,
            seed: seed.trim().parse().map_err(|_| malformed())?,
        })
    }
}

impl Serialize for ClusterId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClusterId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A group of items rendered as one map symbol.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Aggregate {
    pub id: ClusterId,
    /// Count-weighted centroid of the members.
    pub position: LngLat,
    pub count: usize,
}

/// A single input item surfaced by a query.
#[derive(Debug, PartialEq)]
pub struct Leaf<'a, T> {
    /// Position of the item in the build input.
    pub index: usize,
    pub position: LngLat,
    pub item: &'a T,
}

impl<T> Clone for Leaf<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Leaf<'_, T> {}

/// One element of a cluster query result.
#[derive(Debug, PartialEq)]
pub enum ClusterNode<'a, T> {
    Leaf(Leaf<'a, T>),
    Aggregate(Aggregate),
}

impl<T> Clone for ClusterNode<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ClusterNode<'_, T> {}

impl<'a, T> ClusterNode<'a, T> {
    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusterNode::Aggregate(_))
    }

    pub fn position(&self) -> LngLat {
        match self {
            ClusterNode::Leaf(leaf) => leaf.position,
            ClusterNode::Aggregate(agg) => agg.position,
        }
    }

    /// Number of input items this node stands for.
    pub fn count(&self) -> usize {
        match self {
            ClusterNode::Leaf(_) => 1,
            ClusterNode::Aggregate(agg) => agg.count,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf<'a, T>> {
        match self {
            ClusterNode::Leaf(leaf) => Some(leaf),
            ClusterNode::Aggregate(_) => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match self {
            ClusterNode::Leaf(_) => None,
            ClusterNode::Aggregate(agg) => Some(agg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ClusterId, ClusterNode, Leaf};
    use crate::ClusterError;
    use foundation::LngLat;
    use pretty_assertions::assert_eq;

    #[test]
    fn cluster_id_text_form() {
        let id = ClusterId::new(3, 17);
        assert_eq!(id.to_string(), "3/17");
        assert_eq!("3/17".parse::<ClusterId>(), Ok(id));
        assert_eq!(
            "3-17".parse::<ClusterId>(),
            Err(ClusterError::MalformedId("3-17".to_string()))
        );
        assert!("300/1".parse::<ClusterId>().is_err());
    }

    #[test]
    fn cluster_id_serializes_as_string() {
        let json = serde_json::to_string(&ClusterId::new(0, 4)).unwrap();
        assert_eq!(json, "\"0/4\"");
        let back: ClusterId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClusterId::new(0, 4));
    }

    #[test]
    fn leaf_counts_as_one() {
        let item = "memory";
        let node = ClusterNode::Leaf(Leaf {
            index: 0,
            position: LngLat::new(1.0, 2.0),
            item: &item,
        });
        assert!(!node.is_cluster());
        assert_eq!(node.count(), 1);
        assert_eq!(node.position(), LngLat::new(1.0, 2.0));
        assert!(node.as_aggregate().is_none());
    }
}
