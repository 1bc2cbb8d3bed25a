use log::{debug, info, warn};
use mosaic_core::{
    CONFIG_FILE_NAME, HierarchyCache, NodeKind, Scene, SceneConfig, load_scene_config,
};
use mosaic_ids::NodeId;
use rustc_hash::FxHashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let args: Vec<String> = env::args().collect();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    let result = resolve_config(&args, &cwd).and_then(|config| match command {
        "inspect" => inspect_command(&args, config),
        "tree" => tree_command(&args, config),
        "merge" => merge_command(&args, config),
        "check" => check_command(&args, config),
        _ => {
            print_usage();
            Err(format!("unknown command `{command}`"))
        }
    });

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  mosaic inspect <scene>                        # list nodes by type");
    eprintln!("  mosaic tree <scene>                           # print the node hierarchy");
    eprintln!("  mosaic merge <base> <incoming> [--out <file>] [--json]");
    eprintln!("  mosaic check <scene>                          # dangling references and cycles");
    eprintln!("Options:");
    eprintln!("  --config <file>   scene settings (default: ./{CONFIG_FILE_NAME} if present)");
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Positional arguments after the command, skipping flags and their values.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter().skip(2);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "--out" => {
                iter.next();
            }
            flag if flag.starts_with("--") => {}
            value => out.push(value),
        }
    }
    out
}

fn resolve_config(args: &[String], cwd: &Path) -> Result<SceneConfig, String> {
    let path = match parse_flag_value(args, "--config") {
        Some(path) => PathBuf::from(path),
        None => {
            let local = cwd.join(CONFIG_FILE_NAME);
            if !local.is_file() {
                return Ok(SceneConfig::default());
            }
            local
        }
    };
    debug!("loading config from {}", path.display());
    load_scene_config(&path).map_err(|err| format!("config {}: {err}", path.display()))
}

fn load_scene(path: &str, config: SceneConfig) -> Result<Scene, String> {
    let text = fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?;
    let mut scene = Scene::with_config(config);
    let report = scene
        .import_text(&text)
        .map_err(|err| format!("failed to load {path}: {err}"))?;
    info!("loaded {} nodes from {path}", report.attached.len());
    Ok(scene)
}

fn require<'a>(values: &[&'a str], index: usize, what: &str) -> Result<&'a str, String> {
    values
        .get(index)
        .copied()
        .ok_or_else(|| format!("missing {what}"))
}

fn inspect_command(args: &[String], config: SceneConfig) -> Result<(), String> {
    let values = positional(args);
    let path = require(&values, 0, "scene file")?;
    let scene = load_scene(path, config)?;

    for node in scene.nodes() {
        println!("{:<32} {:<26} {}", node.id(), node.type_tag(), node.name);
    }
    println!();
    for kind in NodeKind::ALL {
        let count = scene.nodes_by_kind(kind).count();
        if count > 0 {
            println!("{:<26} {count}", kind.type_tag());
        }
    }
    println!("{} nodes, {} dangling references", scene.len(), scene.dangling_references().len());
    Ok(())
}

fn tree_command(args: &[String], config: SceneConfig) -> Result<(), String> {
    let values = positional(args);
    let path = require(&values, 0, "scene file")?;
    let scene = load_scene(path, config)?;

    for line in tree_lines(&scene) {
        println!("{line}");
    }
    Ok(())
}

/// One line per hierarchy node, indented by depth. Nodes whose parent chain never reaches a
/// root are printed afterwards, starting from the first member of each cycle.
fn tree_lines(scene: &Scene) -> Vec<String> {
    let mut cache = HierarchyCache::new();
    let hierarchy: Vec<NodeId> = scene
        .nodes()
        .filter(|n| n.kind().is_hierarchy())
        .map(|n| n.id().clone())
        .collect();

    let mut lines = Vec::new();
    let mut visited = FxHashSet::default();
    for id in &hierarchy {
        if scene.parent_of(id).is_none_or(|p| !scene.contains(p)) {
            push_subtree(scene, &mut cache, id, &mut visited, &mut lines);
        }
    }
    for id in &hierarchy {
        if !visited.contains(id) {
            warn!("{id} sits on a parent cycle");
            push_subtree(scene, &mut cache, id, &mut visited, &mut lines);
        }
    }
    lines
}

fn push_subtree(
    scene: &Scene,
    cache: &mut HierarchyCache,
    root: &NodeId,
    visited: &mut FxHashSet<NodeId>,
    lines: &mut Vec<String>,
) {
    let mut stack = vec![(root.clone(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Some(node) = scene.get(&id) else {
            continue;
        };
        let indent = "  ".repeat(depth);
        lines.push(match node.associated_node_id() {
            Some(associated) => format!("{indent}{} [{id}] -> {associated}", node.name),
            None => format!("{indent}{} [{id}]", node.name),
        });
        let children = cache.children_of(scene, &id);
        stack.extend(children.iter().rev().map(|child| (child.clone(), depth + 1)));
    }
}

fn merge_command(args: &[String], config: SceneConfig) -> Result<(), String> {
    let values = positional(args);
    let base = require(&values, 0, "base scene file")?;
    let incoming = require(&values, 1, "incoming scene file")?;
    let json = has_flag(args, "--json");

    let mut scene = load_scene(base, config)?;
    let text =
        fs::read_to_string(incoming).map_err(|err| format!("failed to read {incoming}: {err}"))?;
    let report = scene
        .import_text(&text)
        .map_err(|err| format!("failed to merge {incoming}: {err}"))?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|err| format!("failed to encode report: {err}"))?;
        println!("{out}");
    } else {
        for (from, to) in &report.renames {
            eprintln!("renamed {from} -> {to}");
        }
        for (declared, attached) in &report.duplicates {
            eprintln!("repeated {declared} attached as {attached}");
        }
        for dangling in &report.dangling {
            eprintln!(
                "dangling {}.{} -> {}",
                dangling.holder, dangling.role, dangling.target
            );
        }
    }

    let merged = scene.to_text();
    match parse_flag_value(args, "--out") {
        Some(out) => {
            fs::write(&out, merged).map_err(|err| format!("failed to write {out}: {err}"))?;
            eprintln!("wrote {} nodes to {out}", scene.len());
        }
        None if !json => print!("{merged}"),
        None => {}
    }
    Ok(())
}

fn check_command(args: &[String], config: SceneConfig) -> Result<(), String> {
    let values = positional(args);
    let path = require(&values, 0, "scene file")?;
    let scene = load_scene(path, config)?;

    let dangling = scene.dangling_references();
    for reference in &dangling {
        println!(
            "dangling: {}.{} -> {}",
            reference.holder, reference.role, reference.target
        );
    }
    let cycles = scene.hierarchy_cycles();
    for cycle in &cycles {
        let path: Vec<&str> = cycle.iter().map(NodeId::as_str).collect();
        println!("cycle: {}", path.join(" -> "));
    }

    let problems = dangling.len() + cycles.len();
    if problems > 0 {
        return Err(format!("{path}: {problems} problem(s) found"));
    }
    println!("{path}: ok ({} nodes)", scene.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::Node;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positional_skips_flags_and_their_values() {
        let args = args(&[
            "mosaic", "merge", "--config", "x.toml", "a.scn", "--json", "b.scn", "--out", "c.scn",
        ]);
        assert_eq!(positional(&args), vec!["a.scn", "b.scn"]);
        assert_eq!(parse_flag_value(&args, "--out"), Some("c.scn".to_string()));
        assert!(has_flag(&args, "--json"));
    }

    #[test]
    fn tree_prints_nested_children_in_order() {
        let mut scene = Scene::new();
        let root = scene
            .add(Node::new(NodeKind::HierarchyNode).named("root"))
            .unwrap();
        let a = scene
            .add(Node::new(NodeKind::HierarchyNode).named("a").with_parent(root.clone()))
            .unwrap();
        scene
            .add(Node::new(NodeKind::HierarchyNode).named("a1").with_parent(a))
            .unwrap();
        scene
            .add(Node::new(NodeKind::HierarchyNode).named("b").with_parent(root))
            .unwrap();

        assert_eq!(
            tree_lines(&scene),
            vec![
                "root [HierarchyNode1]",
                "  a [HierarchyNode2]",
                "    a1 [HierarchyNode3]",
                "  b [HierarchyNode4]",
            ]
        );
    }

    #[test]
    fn tree_prints_pure_cycles_and_deep_chains() {
        let mut scene = Scene::with_config(SceneConfig {
            reject_hierarchy_cycles: false,
            ..SceneConfig::default()
        });
        let a = scene
            .add(Node::new(NodeKind::HierarchyNode).named("a"))
            .unwrap();
        let b = scene
            .add(Node::new(NodeKind::HierarchyNode).named("b").with_parent(a.clone()))
            .unwrap();
        scene.set_parent(&a, Some(b.as_str())).unwrap();

        assert_eq!(
            tree_lines(&scene),
            vec!["a [HierarchyNode1]", "  b [HierarchyNode2]"]
        );

        let mut chain = Scene::new();
        let mut parent = chain
            .add(Node::new(NodeKind::HierarchyNode).named("n0"))
            .unwrap();
        for i in 1..=5_000 {
            parent = chain
                .add(
                    Node::new(NodeKind::HierarchyNode)
                        .named(format!("n{i}"))
                        .with_parent(parent),
                )
                .unwrap();
        }
        let lines = tree_lines(&chain);
        assert_eq!(lines.len(), 5_001);
        assert!(lines[5_000].ends_with(&format!("n5000 [{parent}]")));
    }

    #[test]
    fn missing_positional_is_an_error() {
        assert_eq!(
            require(&[], 0, "scene file"),
            Err("missing scene file".to_string())
        );
    }
}
