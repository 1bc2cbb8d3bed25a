pub mod error;
pub mod ids;
pub mod registry;

pub use error::*;
pub use ids::*;
pub use registry::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_nil() {
        let nil = NodeId::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.as_str(), "");
        assert!(!nil.is_valid());
    }

    #[test]
    fn node_id_parts() {
        let id = NodeId::from_parts("ModelHierarchyNode", 3);
        assert_eq!(id, "ModelHierarchyNode3");
        assert_eq!(id.split_index(), ("ModelHierarchyNode", Some(3)));
        assert!(id.is_valid());
    }

    #[test]
    fn node_id_split_without_index() {
        let singleton = NodeId::from_parts("SelectionNode", "Singleton");
        assert_eq!(singleton.split_index(), ("SelectionNodeSingleton", None));
        assert_eq!(NodeId::from("42").split_index(), ("42", None));
    }

    #[test]
    fn node_id_validity() {
        assert!(is_valid_node_id("ViewNode1"));
        assert!(is_valid_node_id("_scratch"));
        assert!(!is_valid_node_id("1ViewNode"));
        assert!(!is_valid_node_id("View Node"));
        assert!(!is_valid_node_id("View-Node"));
    }

    #[test]
    fn node_id_debug_and_display() {
        let id = NodeId::from("ViewNode2");
        assert_eq!(format!("{id}"), "ViewNode2");
        assert_eq!(format!("{id:?}"), "NodeId(ViewNode2)");
    }

    #[test]
    fn registry_generates_smallest_free_index() {
        let mut registry = IdRegistry::new();
        let first = registry.reserve_next_id("ModelHierarchyNode");
        assert_eq!(first, "ModelHierarchyNode1");
        registry.register_id(first).unwrap();

        registry
            .register_id(NodeId::from("ModelHierarchyNode3"))
            .unwrap();
        let second = registry.reserve_next_id("ModelHierarchyNode");
        assert_eq!(second, "ModelHierarchyNode2");
        registry.register_id(second).unwrap();

        assert_eq!(
            registry.reserve_next_id("ModelHierarchyNode"),
            "ModelHierarchyNode4"
        );
    }

    #[test]
    fn registry_unregistered_candidate_is_returned_again() {
        let mut registry = IdRegistry::new();
        let a = registry.reserve_next_id("ViewNode");
        let b = registry.reserve_next_id("ViewNode");
        assert_eq!(a, b);
    }

    #[test]
    fn registry_bases_do_not_collide() {
        let mut registry = IdRegistry::new();
        registry.register_id(NodeId::from("ViewNode1")).unwrap();
        assert_eq!(registry.reserve_next_id("CameraNode"), "CameraNode1");
        assert_eq!(registry.reserve_next_id("ViewNode"), "ViewNode2");
    }

    #[test]
    fn registry_rejects_duplicates_and_bad_ids() {
        let mut registry = IdRegistry::new();
        registry.register_id(NodeId::from("ViewNode1")).unwrap();
        assert_eq!(
            registry.register_id(NodeId::from("ViewNode1")),
            Err(IdError::Duplicate(NodeId::from("ViewNode1")))
        );
        assert_eq!(registry.register_id(NodeId::nil()), Err(IdError::Empty));
        assert!(matches!(
            registry.register_id(NodeId::from("View Node")),
            Err(IdError::Malformed(_))
        ));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn registry_release_is_idempotent_and_reuses_index() {
        let mut registry = IdRegistry::new();
        for _ in 0..3 {
            let id = registry.reserve_next_id("ModelNode");
            registry.register_id(id).unwrap();
        }
        let two = NodeId::from("ModelNode2");
        assert!(registry.release_id(&two));
        assert!(!registry.release_id(&two));
        assert!(!registry.is_live("ModelNode2"));
        assert_eq!(registry.reserve_next_id("ModelNode"), "ModelNode2");
    }

    #[test]
    fn registry_reserved_ids_are_skipped_until_cleared() {
        let mut registry = IdRegistry::new();
        registry.reserve_ids((1..=3).map(|n| NodeId::from_parts("ModelNode", n)));
        assert!(registry.is_reserved("ModelNode2"));
        assert_eq!(registry.reserve_next_id("ModelNode"), "ModelNode4");

        registry.clear_reserved();
        assert!(!registry.is_reserved("ModelNode2"));
        assert_eq!(registry.reserve_next_id("ModelNode"), "ModelNode1");
    }

    #[test]
    fn registry_clear_forgets_everything() {
        let mut registry = IdRegistry::new();
        registry.register_id(NodeId::from("ModelNode1")).unwrap();
        registry.reserve_ids([NodeId::from("ModelNode2")]);
        registry.clear();
        assert_eq!(registry.live_count(), 0);
        assert!(!registry.is_reserved("ModelNode2"));
        assert_eq!(registry.reserve_next_id("ModelNode"), "ModelNode1");
    }
}
