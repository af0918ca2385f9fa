use crate::geom::{Rect, Size};
use crate::model::Padding;
use serde_json::{Map, Value};

/// Everything a layout function is told about the pass it runs in.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Name the host registered the layout under. Empty by default.
    pub layout_name: String,
    /// Free-form attributes forwarded from the diagram config. Empty by default.
    pub global_attributes: Map<String, Value>,
    /// Set when this context lays out the children of one container. `None` (the default) is
    /// the top-level layout.
    pub container_id: Option<String>,
    /// Padding of `container_id`. Only meaningful for container sub-layouts; `None` by default.
    pub container_padding: Option<Padding>,
    pub locale_is_right_to_left: bool,
    /// Pixel size of the diagram component. Zero by default.
    pub component_size: Size,
    /// Visible region in global coordinates. Zero-sized by default.
    pub current_viewport: Rect,
    /// Ids the host reports as changed since the previous layout. Empty means "everything".
    pub dirty_ids: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layout_name: String::new(),
            global_attributes: Map::new(),
            container_id: None,
            container_padding: None,
            locale_is_right_to_left: false,
            component_size: Size::zero(),
            current_viewport: Rect::zero(),
            dirty_ids: Vec::new(),
        }
    }
}

impl LayoutConfig {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.global_attributes.get(name)
    }

    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(Value::as_f64)
    }

    /// Sub-layout config for the children of `container_id`.
    pub fn for_container(&self, container_id: &str, padding: Padding) -> Self {
        Self {
            container_id: Some(container_id.to_string()),
            container_padding: Some(padding),
            ..self.clone()
        }
    }
}
