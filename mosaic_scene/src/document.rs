use indexmap::IndexMap;
use mosaic_ids::{NodeId, TypeTag};
use serde::{Deserialize, Serialize};

/// Attribute names ending in this suffix hold node references.
pub const REFERENCE_SUFFIX: &str = "NodeRef";

#[inline]
pub fn is_reference_field(name: &str) -> bool {
    name.len() > REFERENCE_SUFFIX.len() && name.ends_with(REFERENCE_SUFFIX)
}

/// A scalar value as written in scene text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Str(String),
    /// Bare identifier that is not a reference, e.g. `mode = Visible`
    Ident(String),
    /// `(A, B, C)` list of identifiers
    IdentList(Vec<String>),
    /// `(1, 2, 3)` numeric tuple
    Tuple(Vec<f64>),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Reference targets carried by this value, if it can be read as references.
    /// `()` is an empty reference list.
    pub fn as_reference_targets(&self) -> Option<Vec<NodeId>> {
        match self {
            Value::Ident(s) => Some(vec![NodeId::from(s.as_str())]),
            Value::IdentList(list) => Some(list.iter().map(|s| NodeId::from(s.as_str())).collect()),
            Value::Tuple(nums) if nums.is_empty() => Some(Vec::new()),
            _ => None,
        }
    }
}

/// One serialized node: its declared id, type tag, label, references and plain attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub node_type: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub references: IndexMap<String, Vec<NodeId>>,
    #[serde(default)]
    pub attributes: IndexMap<String, Value>,
}

impl NodeRecord {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<TypeTag>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            name: None,
            references: IndexMap::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_reference(mut self, role: impl Into<String>, target: impl Into<NodeId>) -> Self {
        self.references
            .entry(role.into())
            .or_default()
            .push(target.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// All reference targets in role order.
    pub fn reference_targets(&self) -> impl Iterator<Item = (&str, &NodeId)> {
        self.references
            .iter()
            .flat_map(|(role, targets)| targets.iter().map(move |t| (role.as_str(), t)))
    }
}

/// A parsed scene file: top-level variables plus node records in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub vars: IndexMap<String, Value>,
    pub records: Vec<NodeRecord>,
}

impl SceneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: NodeRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: &str) -> Option<&NodeRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}
