use crate::model::{LinkData, NodeData};
use serde::{Deserialize, Serialize};

/// Incremental change delivered by the data source. Events are applied strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DataEvent {
    /// Inserts node trees under `parent_id` (top level when `None`) starting at `index`
    /// (appended when `None`), then the links.
    #[serde(rename_all = "camelCase")]
    Add {
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        nodes: Vec<NodeData>,
        #[serde(default)]
        links: Vec<LinkData>,
        #[serde(default)]
        index: Option<usize>,
    },
    /// Removes node subtrees and links by id. Links touching removed nodes stay in the data set
    /// but become unresolvable until a node with the same id returns.
    #[serde(rename_all = "camelCase")]
    Remove {
        #[serde(default)]
        parent_id: Option<String>,
        #[serde(default)]
        nodes: Vec<String>,
        #[serde(default)]
        links: Vec<String>,
    },
    /// Replaces payloads of existing nodes and links. Unknown ids are ignored.
    #[serde(rename_all = "camelCase")]
    Change {
        #[serde(default)]
        nodes: Vec<NodeData>,
        #[serde(default)]
        links: Vec<LinkData>,
    },
}

impl DataEvent {
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            DataEvent::Add { parent_id, .. } | DataEvent::Remove { parent_id, .. } => {
                parent_id.as_deref()
            }
            DataEvent::Change { .. } => None,
        }
    }

    /// Ids of the nodes named directly by the event (top-level entries of added trees).
    pub fn node_ids(&self) -> Vec<String> {
        match self {
            DataEvent::Add { nodes, .. } | DataEvent::Change { nodes, .. } => {
                nodes.iter().map(|n| n.id.clone()).collect()
            }
            DataEvent::Remove { nodes, .. } => nodes.clone(),
        }
    }

    pub fn link_ids(&self) -> Vec<String> {
        match self {
            DataEvent::Add { links, .. } | DataEvent::Change { links, .. } => {
                links.iter().map(|l| l.id.clone()).collect()
            }
            DataEvent::Remove { links, .. } => links.clone(),
        }
    }
}
