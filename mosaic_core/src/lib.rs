pub mod config;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod import;
pub mod integrity;
pub mod node;
pub mod references;
pub mod scene;

pub use config::*;
pub use error::*;
pub use events::*;
pub use hierarchy::*;
pub use import::*;
pub use integrity::*;
pub use node::*;
pub use references::*;
pub use scene::*;

pub use mosaic_ids::{IdError, IdRegistry, NodeId};

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_scene::{NodeRecord, SceneDocument, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn mh(n: u32) -> String {
        format!("ModelHierarchyNode{n}")
    }

    /// Five-node parent chain declared as ModelHierarchyNode1..5.
    fn chain_document(label: &str) -> SceneDocument {
        let mut document = SceneDocument::new();
        for i in 1..=5 {
            let mut record =
                NodeRecord::new(mh(i), "ModelHierarchyNode").with_name(format!("{label}{i}"));
            if i > 1 {
                record = record.with_reference(PARENT_ROLE, mh(i - 1));
            }
            document.push(record);
        }
        document
    }

    fn scenario_a() -> Scene {
        let mut scene = Scene::new();
        let first = scene
            .add(Node::new(NodeKind::ModelHierarchyNode).named("H1"))
            .unwrap();
        assert_eq!(first, "ModelHierarchyNode1");
        for i in 2..=5 {
            let node = Node::with_id(NodeKind::ModelHierarchyNode, mh(i))
                .named(format!("H{i}"))
                .with_parent(mh(i - 1));
            let attached = scene.add(node).unwrap();
            assert_eq!(attached.as_str(), mh(i));
        }
        scene
    }

    fn record_events(scene: &Scene) -> Rc<RefCell<Vec<SceneEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        scene
            .events()
            .subscribe_all(move |e| sink.borrow_mut().push(e.clone()));
        log
    }

    fn kinds(log: &Rc<RefCell<Vec<SceneEvent>>>) -> Vec<SceneEventKind> {
        log.borrow().iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn scenario_a_ids_are_assigned_without_renaming() {
        let scene = scenario_a();
        assert_eq!(scene.len(), 5);
        assert_eq!(scene.get("ModelHierarchyNode5").unwrap().name, "H5");

        let mut cache = HierarchyCache::new();
        assert_eq!(
            cache.children_of(&scene, "ModelHierarchyNode1").to_vec(),
            vec![id("ModelHierarchyNode2")]
        );
    }

    #[test]
    fn scenario_b_colliding_chain_is_renamed_and_relinked() {
        let mut scene = scenario_a();
        let report = scene.import_document(&chain_document("Incoming")).unwrap();

        assert_eq!(scene.len(), 10);
        let expected: Vec<NodeId> = (6..=10).map(|i| id(&mh(i))).collect();
        assert_eq!(report.attached, expected);
        for i in 1..=5 {
            assert_eq!(report.renames.get(mh(i).as_str()), Some(&id(&mh(i + 5))));
        }

        let mut cache = HierarchyCache::new();
        assert_eq!(
            cache.children_of(&scene, "ModelHierarchyNode6").to_vec(),
            vec![id("ModelHierarchyNode7")]
        );
        for i in 7..=10 {
            assert_eq!(scene.parent_of(&mh(i)), Some(&id(&mh(i - 1))));
        }
        assert_eq!(scene.parent_of("ModelHierarchyNode6"), None);
        assert_eq!(scene.get("ModelHierarchyNode6").unwrap().name, "Incoming1");

        // the pre-existing chain is not cross-linked
        for i in 2..=5 {
            assert_eq!(scene.parent_of(&mh(i)), Some(&id(&mh(i - 1))));
        }
        assert_eq!(
            cache.descendants_of(&scene, "ModelHierarchyNode1"),
            (2..=5).map(|i| id(&mh(i))).collect::<Vec<_>>()
        );
        assert!(report.dangling.is_empty());
    }

    #[test]
    fn scenario_c_single_collision_relinks_to_renamed_root() {
        let mut scene = Scene::new();
        scene
            .add(Node::new(NodeKind::ModelHierarchyNode).named("Existing"))
            .unwrap();
        let report = scene.import_document(&chain_document("Incoming")).unwrap();

        assert_eq!(scene.len(), 6);
        assert_eq!(scene.get("ModelHierarchyNode1").unwrap().name, "Existing");

        let root = report.final_id("ModelHierarchyNode1").unwrap().clone();
        assert_eq!(root, "ModelHierarchyNode6");
        let second = report.final_id("ModelHierarchyNode2").unwrap().clone();
        assert_eq!(scene.parent_of(&second), Some(&root));

        let mut cache = HierarchyCache::new();
        assert!(cache.children_of(&scene, "ModelHierarchyNode1").is_empty());
        let expected: Vec<NodeId> = (2..=5)
            .map(|i| report.final_id(&mh(i)).unwrap().clone())
            .collect();
        assert_eq!(cache.descendants_of(&scene, &root), expected);
    }

    #[test]
    fn scenario_d_reparenting_invalidates_cache() {
        let mut scene = Scene::new();
        let p = scene.create(NodeKind::ModelHierarchyNode).unwrap();
        let q = scene.create(NodeKind::ModelHierarchyNode).unwrap();
        let a = scene
            .add(Node::new(NodeKind::ModelHierarchyNode).with_parent(p.clone()))
            .unwrap();
        let b = scene
            .add(Node::new(NodeKind::ModelHierarchyNode).with_parent(p.clone()))
            .unwrap();

        let mut cache = HierarchyCache::new();
        assert_eq!(cache.children_of(&scene, &p).to_vec(), vec![a.clone(), b.clone()]);
        assert!(cache.children_of(&scene, &q).is_empty());
        assert_eq!(cache.rebuild_count(), 1);

        scene.set_parent(&b, Some(q.as_str())).unwrap();
        assert!(cache.is_stale(&scene));
        assert_eq!(cache.children_of(&scene, &p).to_vec(), vec![a]);
        assert_eq!(cache.children_of(&scene, &q).to_vec(), vec![b]);
        assert_eq!(cache.rebuild_count(), 2);
    }

    #[test]
    fn scenario_e_dangling_reference_is_kept_and_reported() {
        let mut scene = Scene::new();
        let text = r#"
[ModelHierarchyNode1]
name = "Orphan"
[ModelHierarchyNode]
    parentNodeRef = ModelHierarchyNode99
[/ModelHierarchyNode]
[/ModelHierarchyNode1]
"#;
        let report = scene.import_text(text).unwrap();

        assert_eq!(report.attached, vec![id("ModelHierarchyNode1")]);
        let expected = vec![DanglingReference {
            holder: id("ModelHierarchyNode1"),
            role: PARENT_ROLE.to_string(),
            target: id("ModelHierarchyNode99"),
        }];
        assert_eq!(report.dangling, expected);
        assert_eq!(
            scene.parent_of("ModelHierarchyNode1"),
            Some(&id("ModelHierarchyNode99"))
        );
        assert_eq!(scene.dangling_references(), expected);
    }

    #[test]
    fn import_notifies_after_references_are_final() {
        let mut scene = scenario_a();
        let log = record_events(&scene);
        scene.import_document(&chain_document("X")).unwrap();

        let mut expected = vec![SceneEventKind::SceneImportStarted];
        expected.extend(std::iter::repeat(SceneEventKind::NodeAdded).take(5));
        expected.push(SceneEventKind::SceneImportEnded);
        assert_eq!(kinds(&log), expected);

        let added: Vec<NodeId> = log
            .borrow()
            .iter()
            .filter_map(|e| e.node_id().cloned())
            .collect();
        assert_eq!(added, (6..=10).map(|i| id(&mh(i))).collect::<Vec<_>>());
    }

    #[test]
    fn import_with_unknown_type_changes_nothing() {
        let mut scene = scenario_a();
        let before = scene.modified_time();
        let log = record_events(&scene);

        let mut document = chain_document("X");
        document.push(NodeRecord::new("VolumeNode1", "VolumeNode"));
        let err = scene.import_document(&document).unwrap_err();

        assert!(matches!(
            err,
            SceneError::Import(ImportError::UnknownNodeType { .. })
        ));
        assert_eq!(scene.len(), 5);
        assert_eq!(scene.modified_time(), before);
        assert!(log.borrow().is_empty());
        assert!(!scene.registry().is_reserved("ModelHierarchyNode3"));
    }

    #[test]
    fn import_rejects_malformed_ids_and_text() {
        let mut scene = Scene::new();
        let mut document = SceneDocument::new();
        document.push(NodeRecord::new("bad id", "ModelNode"));
        assert!(matches!(
            scene.import_document(&document),
            Err(SceneError::Import(ImportError::InvalidId(_)))
        ));

        let err = scene.import_text("[ModelNode1]\n[ModelNode]\n").unwrap_err();
        assert!(matches!(err, SceneError::Import(ImportError::Parse(_))));
        assert!(scene.is_empty());
    }

    #[test]
    fn repeated_record_id_in_batch_is_attached_under_a_fresh_id() {
        let mut scene = Scene::new();
        let mut document = SceneDocument::new();
        document.push(NodeRecord::new("ModelNode1", "ModelNode").with_name("first"));
        document.push(NodeRecord::new("ModelNode1", "ModelNode").with_name("second"));
        document.push(
            NodeRecord::new("ModelDisplayNode1", "ModelDisplayNode")
                .with_reference("modelNodeRef", "ModelNode1"),
        );
        let report = scene.import_document(&document).unwrap();

        assert_eq!(report.duplicates, vec![(id("ModelNode1"), id("ModelNode2"))]);
        assert!(report.renames.is_empty());
        assert_eq!(scene.get("ModelNode1").unwrap().name, "first");
        assert_eq!(scene.get("ModelNode2").unwrap().name, "second");
        assert_eq!(
            scene
                .get("ModelDisplayNode1")
                .unwrap()
                .references
                .first("modelNodeRef"),
            Some(&id("ModelNode1"))
        );
    }

    #[test]
    fn imported_singleton_merges_and_references_follow() {
        let mut scene = Scene::new();
        scene.create(NodeKind::SelectionNode).unwrap();
        scene.create(NodeKind::ModelNode).unwrap();

        let text = r#"
[ModelNode1]
[ModelNode]
[/ModelNode]
[/ModelNode1]

[SelectionNodeSingleton]
[SelectionNode]
    activeModelNodeRef = ModelNode1
[/SelectionNode]
[/SelectionNodeSingleton]
"#;
        let report = scene.import_text(text).unwrap();

        assert_eq!(report.attached, vec![id("ModelNode2")]);
        assert_eq!(report.merged_singletons, vec![id("SelectionNodeSingleton")]);
        assert_eq!(scene.len(), 3);
        assert_eq!(
            scene
                .get("SelectionNodeSingleton")
                .unwrap()
                .references
                .first("activeModelNodeRef"),
            Some(&id("ModelNode2"))
        );
    }

    #[test]
    fn singleton_add_merges_into_existing() {
        let mut scene = Scene::new();
        let first = scene
            .add(Node::new(NodeKind::SelectionNode).with_reference("activeModelNodeRef", "ModelNode1"))
            .unwrap();
        assert_eq!(first, "SelectionNodeSingleton");

        let log = record_events(&scene);
        let second = scene
            .add(
                Node::new(NodeKind::SelectionNode)
                    .named("Selection")
                    .with_reference("activeModelNodeRef", "ModelNode2"),
            )
            .unwrap();

        assert_eq!(second, first);
        assert_eq!(scene.len(), 1);
        let node = scene.get(&first).unwrap();
        assert_eq!(node.name, "Selection");
        assert_eq!(
            node.references.first("activeModelNodeRef"),
            Some(&id("ModelNode2"))
        );
        assert_eq!(kinds(&log), vec![SceneEventKind::NodeModified]);
    }

    #[test]
    fn add_rejects_live_explicit_id() {
        let mut scene = Scene::new();
        scene
            .add(Node::with_id(NodeKind::ModelNode, "ModelNode1"))
            .unwrap();
        let err = scene
            .add(Node::with_id(NodeKind::ModelNode, "ModelNode1"))
            .unwrap_err();
        assert_eq!(err, SceneError::Id(IdError::Duplicate(id("ModelNode1"))));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn add_rejects_another_kinds_singleton_id() {
        let mut scene = Scene::new();
        let err = scene
            .add(Node::with_id(NodeKind::ModelNode, "SelectionNodeSingleton"))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::ReservedId {
                id: id("SelectionNodeSingleton"),
                owner: "SelectionNode",
            }
        );
        assert!(scene.is_empty());
        assert!(!scene.registry().is_live("SelectionNodeSingleton"));

        let selection = scene.create(NodeKind::SelectionNode).unwrap();
        assert_eq!(selection, "SelectionNodeSingleton");
        assert_eq!(scene.nodes_by_kind(NodeKind::SelectionNode).count(), 1);
        assert_eq!(scene.nodes_by_kind(NodeKind::ModelNode).count(), 0);
    }

    #[test]
    fn import_rejects_record_claiming_another_kinds_singleton_id() {
        let mut scene = scenario_a();
        let before = scene.modified_time();
        let log = record_events(&scene);

        let text = r#"
[LayoutNodeSingleton]
[ModelNode]
[/ModelNode]
[/LayoutNodeSingleton]
"#;
        let err = scene.import_text(text).unwrap_err();
        assert_eq!(
            err,
            SceneError::Import(ImportError::ReservedId {
                id: id("LayoutNodeSingleton"),
                owner: "LayoutNode",
            })
        );
        assert_eq!(scene.len(), 5);
        assert_eq!(scene.modified_time(), before);
        assert!(log.borrow().is_empty());

        let layout = scene.create(NodeKind::LayoutNode).unwrap();
        assert_eq!(scene.get(&layout).map(Node::kind), Some(NodeKind::LayoutNode));
    }

    #[test]
    fn unnamed_nodes_get_unique_names() {
        let mut scene = Scene::new();
        let a = scene.create(NodeKind::ModelNode).unwrap();
        let b = scene.create(NodeKind::ModelNode).unwrap();
        let c = scene
            .add(Node::new(NodeKind::ModelNode).named("Skull"))
            .unwrap();

        assert_eq!(scene.get(&a).unwrap().name, "ModelNode");
        assert_eq!(scene.get(&b).unwrap().name, "ModelNode_1");
        assert_eq!(scene.get(&c).unwrap().name, "Skull");
        assert_eq!(
            scene
                .first_node_by_name("ModelNode_1")
                .map(|n| n.id().clone()),
            Some(b)
        );
    }

    #[test]
    fn remove_releases_id_for_reuse_and_keeps_references() {
        let mut scene = Scene::new();
        let model = scene.create(NodeKind::ModelNode).unwrap();
        let display = scene.create(NodeKind::ModelDisplayNode).unwrap();
        scene
            .add_reference(&model, DISPLAY_ROLE, display.clone())
            .unwrap();

        let log = record_events(&scene);
        let removed = scene.remove(&display).unwrap();

        assert_eq!(removed.id(), &display);
        assert!(!scene.contains(&display));
        assert_eq!(
            scene.get(&model).unwrap().references.first(DISPLAY_ROLE),
            Some(&display)
        );
        assert_eq!(scene.dangling_references().len(), 1);
        assert_eq!(
            kinds(&log),
            vec![
                SceneEventKind::NodeAboutToBeRemoved,
                SceneEventKind::NodeRemoved
            ]
        );
        assert_eq!(scene.create(NodeKind::ModelDisplayNode).unwrap(), display);
        assert!(matches!(
            scene.remove("ModelNode9"),
            Err(SceneError::NodeNotFound(_))
        ));
    }

    #[test]
    fn remove_can_clear_references() {
        let mut scene = Scene::with_config(SceneConfig {
            clear_references_on_remove: true,
            ..SceneConfig::default()
        });
        let model = scene.create(NodeKind::ModelNode).unwrap();
        let display = scene.create(NodeKind::ModelDisplayNode).unwrap();
        scene
            .add_reference(&model, DISPLAY_ROLE, display.clone())
            .unwrap();

        scene.remove(&display).unwrap();
        assert!(scene.get(&model).unwrap().references.is_empty());
        assert!(scene.dangling_references().is_empty());
    }

    #[test]
    fn modify_node_bumps_times_and_notifies() {
        let mut scene = Scene::new();
        let model = scene.create(NodeKind::ModelNode).unwrap();
        let before = scene.modified_time();
        let log = record_events(&scene);

        let old = scene
            .modify_node(&model, |n| std::mem::replace(&mut n.name, "Renamed".into()))
            .unwrap();

        assert_eq!(old, "ModelNode");
        assert!(scene.modified_time() > before);
        assert_eq!(
            scene.get(&model).unwrap().modified_time(),
            scene.modified_time()
        );
        assert_eq!(
            *log.borrow(),
            vec![SceneEvent::NodeModified {
                id: model.clone(),
                kind: NodeKind::ModelNode
            }]
        );
        assert!(scene.modify_node("ModelNode7", |_| ()).is_err());
    }

    #[test]
    fn set_parent_rejects_self_and_cycles() {
        let mut scene = Scene::new();
        let a = scene.create(NodeKind::HierarchyNode).unwrap();
        let b = scene
            .add(Node::new(NodeKind::HierarchyNode).with_parent(a.clone()))
            .unwrap();

        assert_eq!(
            scene.set_parent(&a, Some(a.as_str())),
            Err(SceneError::SelfParent(a.clone()))
        );
        assert_eq!(
            scene.set_parent(&a, Some(b.as_str())),
            Err(SceneError::CyclicHierarchy {
                child: a.clone(),
                parent: b.clone()
            })
        );
        assert!(matches!(
            scene.set_parent(&a, Some("HierarchyNode42")),
            Err(SceneError::NodeNotFound(_))
        ));

        scene.set_parent(&b, None).unwrap();
        assert_eq!(scene.parent_of(&b), None);
    }

    #[test]
    fn cyclic_data_is_reported_and_traversal_terminates() {
        let mut scene = Scene::with_config(SceneConfig {
            reject_hierarchy_cycles: false,
            ..SceneConfig::default()
        });
        let a = scene.create(NodeKind::HierarchyNode).unwrap();
        let b = scene
            .add(Node::new(NodeKind::HierarchyNode).with_parent(a.clone()))
            .unwrap();
        let c = scene
            .add(Node::new(NodeKind::HierarchyNode).with_parent(b.clone()))
            .unwrap();
        scene.set_parent(&a, Some(c.as_str())).unwrap();

        let mut cache = HierarchyCache::new();
        assert_eq!(cache.descendants_of(&scene, &a), vec![b.clone(), c.clone()]);
        assert_eq!(
            scene.hierarchy_cycles(),
            vec![vec![a.clone(), c.clone(), b.clone()]]
        );
        assert_eq!(cache.top_parent_of(&scene, &b), c);
    }

    #[test]
    fn sibling_order_can_be_changed() {
        let mut scene = Scene::new();
        let p = scene.create(NodeKind::ModelHierarchyNode).unwrap();
        let kids: Vec<NodeId> = (0..4)
            .map(|_| {
                scene
                    .add(Node::new(NodeKind::ModelHierarchyNode).with_parent(p.clone()))
                    .unwrap()
            })
            .collect();

        let mut cache = HierarchyCache::new();
        assert_eq!(cache.children_of(&scene, &p).to_vec(), kids);

        scene.move_in_parent(&kids[0], 2).unwrap();
        assert_eq!(
            cache.children_of(&scene, &p).to_vec(),
            vec![
                kids[1].clone(),
                kids[2].clone(),
                kids[0].clone(),
                kids[3].clone()
            ]
        );
        assert_eq!(cache.index_in_parent(&scene, &kids[0]), Some(2));

        scene.set_index_in_parent(&kids[3], 0).unwrap();
        assert_eq!(
            cache.children_of(&scene, &p).to_vec(),
            vec![
                kids[3].clone(),
                kids[1].clone(),
                kids[2].clone(),
                kids[0].clone()
            ]
        );

        scene.set_index_in_parent(&kids[3], 2).unwrap();
        assert_eq!(
            cache.children_of(&scene, &p).to_vec(),
            vec![
                kids[1].clone(),
                kids[2].clone(),
                kids[3].clone(),
                kids[0].clone()
            ]
        );

        assert!(matches!(
            scene.move_in_parent(&kids[0], 5),
            Err(SceneError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            scene.set_index_in_parent(&p, 0),
            Err(SceneError::NoParent(_))
        ));
    }

    #[test]
    fn cache_answers_parent_and_association_queries() {
        let mut scene = Scene::new();
        let model = scene.create(NodeKind::ModelNode).unwrap();
        let root = scene.create(NodeKind::ModelHierarchyNode).unwrap();
        let mid = scene
            .add(Node::new(NodeKind::ModelHierarchyNode).with_parent(root.clone()))
            .unwrap();
        let leaf = scene
            .add(
                Node::new(NodeKind::ModelHierarchyNode)
                    .with_parent(mid.clone())
                    .with_reference(ASSOCIATED_ROLE, model.clone()),
            )
            .unwrap();

        let mut cache = HierarchyCache::new();
        assert_eq!(cache.parent_of(&scene, &leaf), Some(mid.clone()));
        assert_eq!(cache.top_parent_of(&scene, &leaf), root);
        assert_eq!(cache.top_parent_of(&scene, &root), root);
        assert_eq!(
            cache.associated_hierarchy_of(&scene, &model),
            Some(leaf.clone())
        );
        assert_eq!(
            cache.associated_children_of(&scene, &root, true),
            vec![model.clone()]
        );
        assert!(cache.associated_children_of(&scene, &root, false).is_empty());
        assert_eq!(cache.nth_child(&scene, &root, 0), Some(mid));
        assert_eq!(cache.rebuild_count(), 1);
    }

    #[test]
    fn cache_rebuilds_for_a_different_scene() {
        let scene_a = scenario_a();
        let scene_b = scenario_a();
        assert_eq!(scene_a.modified_time(), scene_b.modified_time());

        let mut cache = HierarchyCache::new();
        cache.rebuild(&scene_a);
        assert!(!cache.is_stale(&scene_a));
        assert!(cache.is_stale(&scene_b));
        assert_eq!(cache.children_of(&scene_b, "ModelHierarchyNode1").len(), 1);
        assert_eq!(cache.rebuild_count(), 2);

        cache.clear();
        assert!(cache.is_stale(&scene_b));
    }

    #[test]
    fn exported_text_imports_into_an_empty_scene_unchanged() {
        let mut scene = scenario_a();
        let model = scene
            .add(
                Node::new(NodeKind::ModelNode)
                    .named("Skull")
                    .with_reference(DISPLAY_ROLE, "ModelDisplayNode1"),
            )
            .unwrap();
        scene
            .add(Node::with_id(NodeKind::ModelDisplayNode, "ModelDisplayNode1"))
            .unwrap();
        scene
            .modify_node(&model, |n| {
                n.attributes.insert("opacity".into(), Value::Number(0.5));
            })
            .unwrap();

        let text = scene.to_text();
        let mut copy = Scene::new();
        let report = copy.import_text(&text).unwrap();

        assert!(report.renames.is_empty());
        assert!(report.dangling.is_empty());
        assert_eq!(copy.export(), scene.export());
    }

    #[test]
    fn clear_removes_everything_and_resets_ids() {
        let mut scene = scenario_a();
        let log = record_events(&scene);
        scene.clear();

        assert!(scene.is_empty());
        assert_eq!(log.borrow().last(), Some(&SceneEvent::SceneCleared));
        assert_eq!(
            kinds(&log)
                .into_iter()
                .filter(|k| *k == SceneEventKind::NodeRemoved)
                .count(),
            5
        );
        assert_eq!(
            scene.create(NodeKind::ModelHierarchyNode).unwrap(),
            "ModelHierarchyNode1"
        );
    }

    #[test]
    fn reference_queries() {
        let mut scene = Scene::new();
        let display = scene.create(NodeKind::ModelDisplayNode).unwrap();
        let color = scene.create(NodeKind::ColorTableNode).unwrap();
        scene
            .add_reference(&display, "colorNodeRef", color.clone())
            .unwrap();
        let model = scene
            .add(Node::new(NodeKind::ModelNode).with_reference(DISPLAY_ROLE, display.clone()))
            .unwrap();

        assert_eq!(scene.referencing_nodes(&display), vec![model.clone()]);
        assert_eq!(
            scene.referenced_nodes(&model),
            vec![display.clone(), color.clone()]
        );
        assert!(scene.referenced_nodes(&color).is_empty());
        assert_eq!(scene.nodes_by_kind(NodeKind::ModelNode).count(), 1);
    }

    #[test]
    fn node_subscription_sees_only_its_node() {
        let mut scene = Scene::new();
        let watched = scene.create(NodeKind::ModelNode).unwrap();
        let other = scene.create(NodeKind::ModelNode).unwrap();

        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        let token = scene.events().subscribe_node(
            watched.clone(),
            Some(SceneEventKind::NodeModified),
            move |_| *counter.borrow_mut() += 1,
        );

        scene.modify_node(&other, |_| ()).unwrap();
        scene.modify_node(&watched, |_| ()).unwrap();
        assert_eq!(*hits.borrow(), 1);

        assert!(scene.events().unsubscribe(token));
        scene.modify_node(&watched, |_| ()).unwrap();
        assert_eq!(*hits.borrow(), 1);
    }
}
