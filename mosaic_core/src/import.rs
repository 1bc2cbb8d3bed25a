// import.rs - Merge a serialized batch into a live scene
//
// 1. Validate every record (known type, well-formed ids). Any failure rejects the batch
//    before the scene is touched.
// 2. Reserve all declared ids so generated ids never land on one of them.
// 3. Pass 1: walk records in source order. A declared id that is free is kept; one that is
//    live gets a fresh id and an entry in the rename table. Nodes attach silently.
// 4. Pass 2: rewrite every reference on the incoming nodes through the rename table.
// 5. Fire NodeAdded for each attached node, bracketed by import start/end events, so
//    observers only ever see final references.

use indexmap::IndexMap;
use log::{debug, info, warn};
use mosaic_ids::{NodeId, is_valid_node_id};
use mosaic_scene::{NodeRecord, SceneDocument, parse_scene_text};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::{
    DanglingReference, ImportError, Node, NodeKind, Result, SORTING_ATTRIBUTE, Scene, SceneEvent,
};

/// What an import did to the scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Nodes attached by the batch, in attach order.
    pub attached: Vec<NodeId>,
    /// Declared id -> final id. Incoming references were rewritten through this table.
    pub renames: IndexMap<NodeId, NodeId>,
    /// Records that repeated an earlier record's id in the same batch, as (declared, final).
    /// References to the repeated id keep pointing at the first record.
    pub duplicates: Vec<(NodeId, NodeId)>,
    /// Existing singleton nodes that took over an incoming record's content.
    pub merged_singletons: Vec<NodeId>,
    /// References on incoming nodes whose target is neither in the batch nor live.
    pub dangling: Vec<DanglingReference>,
}

impl ImportReport {
    /// Final id of the record declared as `declared`.
    pub fn final_id(&self, declared: &str) -> Option<&NodeId> {
        self.renames
            .get(declared)
            .or_else(|| self.attached.iter().find(|id| id.as_str() == declared))
    }

    pub fn was_renamed(&self, declared: &str) -> bool {
        self.renames.contains_key(declared)
    }
}

struct PreparedRecord<'a> {
    record: &'a NodeRecord,
    kind: NodeKind,
}

fn prepare_records(document: &SceneDocument) -> std::result::Result<Vec<PreparedRecord<'_>>, ImportError> {
    document
        .records
        .iter()
        .map(|record| {
            if !is_valid_node_id(&record.id) {
                return Err(ImportError::InvalidId(record.id.to_string()));
            }
            let kind = NodeKind::from_type_tag(&record.node_type).ok_or_else(|| {
                ImportError::UnknownNodeType {
                    id: record.id.clone(),
                    tag: record.node_type.to_string(),
                }
            })?;
            if let Some(owner) = NodeKind::singleton_owner(&record.id).filter(|k| *k != kind) {
                return Err(ImportError::ReservedId {
                    id: record.id.clone(),
                    owner: owner.type_tag(),
                });
            }
            for (role, target) in record.reference_targets() {
                if !is_valid_node_id(target) {
                    return Err(ImportError::InvalidReference {
                        id: record.id.clone(),
                        role: role.to_string(),
                        target: target.to_string(),
                    });
                }
            }
            Ok(PreparedRecord { record, kind })
        })
        .collect()
}

/// Builds a detached node from a record, lifting `sortingValue` out of the attributes.
pub fn node_from_record(kind: NodeKind, record: &NodeRecord) -> Node {
    let mut node = Node::with_id(kind, record.id.clone());
    if let Some(name) = &record.name {
        node.name = name.clone();
    }
    for (role, targets) in &record.references {
        node.references.set(role, targets.iter().cloned());
    }
    for (key, value) in &record.attributes {
        if key == SORTING_ATTRIBUTE {
            if let Some(sorting) = value.as_f64() {
                node.set_sorting_value(sorting);
                continue;
            }
        }
        node.attributes.insert(key.clone(), value.clone());
    }
    node
}

impl Scene {
    /// Parses scene text and imports it. Parse errors reject the whole batch.
    pub fn import_text(&mut self, text: &str) -> Result<ImportReport> {
        let document = parse_scene_text(text).map_err(ImportError::from)?;
        self.import_document(&document)
    }

    /// Attaches every record of `document`, renaming ids that collide with live nodes and
    /// rewriting references to match. Either the whole batch attaches or nothing does.
    pub fn import_document(&mut self, document: &SceneDocument) -> Result<ImportReport> {
        let prepared = prepare_records(document)?;
        debug!("import batch of {} records validated", prepared.len());

        self.emit(&SceneEvent::SceneImportStarted);
        self.registry
            .reserve_ids(prepared.iter().map(|p| p.record.id.clone()));

        let mut report = ImportReport::default();
        let outcome = self.resolve_ids(&prepared, &mut report);
        self.registry.clear_reserved();

        let merges = match outcome {
            Ok(merges) => merges,
            Err(err) => {
                for id in report.attached.iter().rev() {
                    self.detach_silently(id);
                }
                warn!("import rolled back: {err}");
                self.emit(&SceneEvent::SceneImportEnded);
                return Err(err.into());
            }
        };

        self.rewrite_references(&mut report, merges);
        self.collect_dangling(&mut report);

        for id in &report.attached {
            if let Some(kind) = self.get(id).map(Node::kind) {
                self.emit(&SceneEvent::NodeAdded {
                    id: id.clone(),
                    kind,
                });
            }
        }
        for id in &report.merged_singletons {
            if let Some(kind) = self.get(id).map(Node::kind) {
                self.emit(&SceneEvent::NodeModified {
                    id: id.clone(),
                    kind,
                });
            }
        }
        self.emit(&SceneEvent::SceneImportEnded);

        info!(
            "imported {} nodes ({} renamed, {} dangling references)",
            report.attached.len(),
            report.renames.len(),
            report.dangling.len()
        );
        Ok(report)
    }

    /// Pass 1. Returns incoming singleton content still to be merged into live singletons.
    fn resolve_ids(
        &mut self,
        prepared: &[PreparedRecord<'_>],
        report: &mut ImportReport,
    ) -> std::result::Result<Vec<(NodeId, Node)>, ImportError> {
        let mut merges = Vec::new();
        let mut claimed: FxHashSet<&str> = FxHashSet::default();

        for PreparedRecord { record, kind } in prepared {
            let node = node_from_record(*kind, record);
            let declared = &record.id;

            if let Some(singleton_id) = kind.singleton_id() {
                if *declared != singleton_id {
                    report
                        .renames
                        .insert(declared.clone(), singleton_id.clone());
                }
                if self.contains(&singleton_id) {
                    merges.push((singleton_id, node));
                    continue;
                }
                self.registry
                    .register_id(singleton_id.clone())
                    .map_err(|e| ImportError::Internal(e.to_string()))?;
                self.attach(node, singleton_id.clone());
                report.attached.push(singleton_id);
                continue;
            }

            let repeated = !claimed.insert(declared.as_str());
            let final_id = if self.registry.is_live(declared) {
                let fresh = self.registry.reserve_next_id(kind.type_tag());
                if repeated {
                    warn!("record id {declared} repeats within the batch; attached as {fresh}");
                    report.duplicates.push((declared.clone(), fresh.clone()));
                } else {
                    debug!("renaming incoming {declared} to {fresh}");
                    report.renames.insert(declared.clone(), fresh.clone());
                }
                fresh
            } else {
                declared.clone()
            };

            self.registry
                .register_id(final_id.clone())
                .map_err(|e| ImportError::Internal(e.to_string()))?;
            self.attach(node, final_id.clone());
            report.attached.push(final_id);
        }

        Ok(merges)
    }

    /// Pass 2.
    fn rewrite_references(&mut self, report: &mut ImportReport, merges: Vec<(NodeId, Node)>) {
        let renames = &report.renames;
        for id in &report.attached {
            if let Some(node) = self.nodes.get_mut(id.as_str()) {
                node.references.rewrite(|target| renames.get(target).cloned());
            }
        }

        let mut merged: Vec<NodeId> = Vec::new();
        for (existing, mut incoming) in merges {
            incoming
                .references
                .rewrite(|target| renames.get(target).cloned());
            let time = self.bump();
            if let Some(node) = self.nodes.get_mut(existing.as_str()) {
                node.copy_content_from(incoming);
                node.touch(time);
            }
            debug!("merged incoming singleton into {existing}");
            if !merged.contains(&existing) {
                merged.push(existing);
            }
        }
        report.merged_singletons = merged;
    }

    fn collect_dangling(&self, report: &mut ImportReport) {
        let incoming = report.attached.iter().chain(report.merged_singletons.iter());
        let mut dangling = Vec::new();
        for id in incoming {
            let Some(node) = self.get(id) else {
                continue;
            };
            for (role, target) in node.references.iter() {
                if !self.contains(target) {
                    if self.config().warn_on_dangling {
                        warn!("{id}.{role} points at missing node {target}");
                    }
                    dangling.push(DanglingReference {
                        holder: id.clone(),
                        role: role.to_string(),
                        target: target.clone(),
                    });
                }
            }
        }
        report.dangling = dangling;
    }
}
