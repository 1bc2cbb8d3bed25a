//! String identifiers for scene nodes.
//! A node id is `<base><suffix>`: the base is the node's type tag and the suffix is either a
//! positive integer (`ModelHierarchyNode3`) or a singleton tag (`SelectionNodeSingleton`).
//! The empty string is the nil id, used by nodes that are not attached yet.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Defines a string-backed identifier type (NodeId, TypeTag).
macro_rules! define_string_id {
    ($type_name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $type_name(String);

        impl $type_name {
            #[inline]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[inline]
            pub const fn nil() -> Self {
                Self(String::new())
            }

            #[inline]
            pub fn is_nil(&self) -> bool {
                self.0.is_empty()
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($type_name), "({})"), self.0)
            }
        }

        impl fmt::Display for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $type_name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $type_name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $type_name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $type_name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $type_name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $type_name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $type_name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_string_id!(
    NodeId,
    "Node ID: `<TypeTag><n>` or `<TypeTag><SingletonTag>`. Immutable once attached."
);
define_string_id!(
    TypeTag,
    "Type tag of a node kind, e.g. `ModelHierarchyNode`. Also the base of generated ids."
);

impl NodeId {
    /// `ModelHierarchyNode` + `3` -> `ModelHierarchyNode3`.
    pub fn from_parts(base: &str, suffix: impl fmt::Display) -> Self {
        Self(format!("{base}{suffix}"))
    }

    /// Splits the trailing decimal index off the id.
    /// Ids without a trailing index (singletons, hand-written ids) return `None`.
    pub fn split_index(&self) -> (&str, Option<u64>) {
        let digits = self
            .0
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 || digits == self.0.len() {
            return (self.0.as_str(), None);
        }
        let (base, index) = self.0.split_at(self.0.len() - digits);
        match index.parse::<u64>() {
            Ok(n) => (base, Some(n)),
            Err(_) => (self.0.as_str(), None),
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_node_id(&self.0)
    }
}

/// A node id must start with a letter or `_` and contain only alphanumerics and `_`,
/// so it can be written as a bare identifier in the scene format.
pub fn is_valid_node_id(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
