use crate::error::{Error, Result};
use crate::geom::{Size, size};
use crate::model::Padding;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How links hidden inside collapsed containers are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PromotedLinkBehavior {
    /// Aggregate hidden links onto the nearest visible ancestors.
    #[default]
    Full,
    /// Hidden links are tracked but never drawn.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationMode {
    #[default]
    Auto,
    None,
}

/// Per-diagram settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramConfig {
    pub promoted_link_behavior: PromotedLinkBehavior,
    pub animation_on_data_change: AnimationMode,
    /// Padding given to a container when it is disclosed, until a layout overrides it.
    pub container_padding: Padding,
    pub component_size: Size,
    pub locale_is_right_to_left: bool,
    /// Keep an overview (minimap) state that snapshots clone.
    pub overview: bool,
    pub layout_name: String,
    pub layout_attributes: Map<String, Value>,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            promoted_link_behavior: PromotedLinkBehavior::Full,
            animation_on_data_change: AnimationMode::Auto,
            container_padding: Padding::uniform(10.0),
            component_size: size(800.0, 600.0),
            locale_is_right_to_left: false,
            overview: false,
            layout_name: String::new(),
            layout_attributes: Map::new(),
        }
    }
}

impl DiagramConfig {
    pub fn from_json(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|err| Error::Config {
            message: err.to_string(),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::Config {
            message: err.to_string(),
        })
    }
}
