use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static description of a node type: its ports and configurable
/// properties, as rendered by the canvas property forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Registry tag, e.g. "ReadCSVNode"
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub color: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub properties: Vec<PropertyDescriptor>,
    pub version: u32,
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            color: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: Vec::new(),
            version: 1,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_input(mut self, handle: impl Into<String>) -> Self {
        self.inputs.push(handle.into());
        self
    }

    pub fn with_output(mut self, handle: impl Into<String>) -> Self {
        self.outputs.push(handle.into());
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Default values of every declared property
    pub fn defaults(&self) -> HashMap<String, Value> {
        self.properties
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect()
    }
}

/// Editor widget for a property
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    String,
    Text,
    Number,
    Boolean,
    Options,
    File,
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub display_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PropertyOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_options: Option<DisplayOptions>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            display_name: display_name.into(),
            name: name.into(),
            kind,
            default: Value::Null,
            description: String::new(),
            options: Vec::new(),
            display_options: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.push(PropertyOption {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Only show this property while sibling `property` holds one of `values`
    pub fn shown_when(mut self, property: impl Into<String>, values: Vec<Value>) -> Self {
        self.display_options
            .get_or_insert_with(DisplayOptions::default)
            .show
            .insert(property.into(), values);
        self
    }

    /// Evaluate the conditional-visibility predicate against the current
    /// values of sibling properties. Properties without a predicate are
    /// always visible.
    pub fn is_visible(&self, siblings: &HashMap<String, Value>) -> bool {
        match &self.display_options {
            None => true,
            Some(options) => options.show.iter().all(|(sibling, allowed)| {
                siblings
                    .get(sibling)
                    .map(|current| allowed.contains(current))
                    .unwrap_or(false)
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyOption {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DisplayOptions {
    pub show: HashMap<String, Vec<Value>>,
}
