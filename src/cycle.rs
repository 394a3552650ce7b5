//! Cycle detection for dependency graphs
//!
//! Depth-first search with three-color marking:
//!
//! 1. **Unvisited**: node hasn't been processed
//! 2. **Visiting**: node is on the current path
//! 3. **Visited**: node and everything reachable from it are done
//!
//! Reaching a Visiting node closes a cycle. The traversal keeps its own work
//! stack, so graph depth is bounded only by memory. Every back edge produces
//! one reported cycle; roots are visited in key order and edges in declared
//! order, so the report is deterministic. Edges to nodes that are not keys of
//! the graph are ignored.

use std::collections::{BTreeMap, HashMap};

use crate::domain::ResourceNode;

/// Adjacency map from node id to the ids it depends on
pub type Graph = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    Visiting,
    Visited,
}

/// Find cycles in `graph`.
///
/// Each cycle is closed: its first and last elements are the same node.
/// An empty result means the graph is acyclic.
pub fn find_cycles(graph: &Graph) -> Vec<Vec<String>> {
    let mut colors: HashMap<&str, Color> = graph
        .keys()
        .map(|k| (k.as_str(), Color::Unvisited))
        .collect();
    let mut cycles = Vec::new();

    for root in graph.keys() {
        if colors.get(root.as_str()) != Some(&Color::Unvisited) {
            continue;
        }

        // (node, index of the next edge to follow)
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        colors.insert(root.as_str(), Color::Visiting);

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let edges = graph.get(node).map_or(&[][..], Vec::as_slice);

            if top.1 >= edges.len() {
                colors.insert(node, Color::Visited);
                stack.pop();
                continue;
            }

            let next = edges[top.1].as_str();
            top.1 += 1;

            match colors.get(next) {
                None | Some(Color::Visited) => {}
                Some(Color::Unvisited) => {
                    colors.insert(next, Color::Visiting);
                    stack.push((next, 0));
                }
                Some(Color::Visiting) => {
                    let start = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| (*n).to_string()).collect();
                    cycle.push(next.to_string());
                    log::debug!("Cycle found: {}", cycle.join(" -> "));
                    cycles.push(cycle);
                }
            }
        }
    }

    cycles
}

/// The asset references behind one edge of a package cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEdge {
    pub from_package: String,
    pub to_package: String,
    /// `(referring asset path, referenced asset path)` pairs
    pub references: Vec<(String, String)>,
}

impl std::fmt::Display for CycleEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let refs = self
            .references
            .iter()
            .map(|(from, to)| format!("{} -> {}", from, to))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} -> {} via {}", self.from_package, self.to_package, refs)
    }
}

/// Attribute every edge of a closed package cycle to the direct asset
/// references that create it.
pub fn attribute_package_cycle(cycle: &[String], nodes: &[ResourceNode]) -> Vec<CycleEdge> {
    let package_of: HashMap<&str, &str> = nodes
        .iter()
        .map(|n| (n.path.as_str(), n.package_id.as_str()))
        .collect();

    cycle
        .windows(2)
        .map(|pair| {
            let (from, to) = (&pair[0], &pair[1]);
            let references = nodes
                .iter()
                .filter(|n| &n.package_id == from)
                .flat_map(|n| {
                    n.direct_dependencies
                        .iter()
                        .filter(|dep| package_of.get(dep.as_str()) == Some(&to.as_str()))
                        .map(|dep| (n.path.clone(), dep.clone()))
                })
                .collect();
            CycleEdge {
                from_package: from.clone(),
                to_package: to.clone(),
                references,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn graph(edges: &[(&str, &[&str])]) -> Graph {
        edges
            .iter()
            .map(|(k, deps)| {
                (
                    (*k).to_string(),
                    deps.iter().map(|d| (*d).to_string()).collect(),
                )
            })
            .collect()
    }

    fn node(path: &str, package: &str, deps: &[&str]) -> ResourceNode {
        let mut node = ResourceNode::new(path, PathBuf::from(path), path, path, package);
        node.direct_dependencies = deps.iter().map(|d| (*d).to_string()).collect();
        node
    }

    #[test]
    fn test_acyclic_graph() {
        let g = graph(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        assert!(find_cycles(&g).is_empty());
    }

    #[test]
    fn test_two_node_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        assert_eq!(find_cycles(&g), vec![vec!["a", "b", "a"]]);
    }

    #[test]
    fn test_self_loop() {
        let g = graph(&[("a", &["a"])]);
        assert_eq!(find_cycles(&g), vec![vec!["a", "a"]]);
    }

    #[test]
    fn test_cycle_reached_from_other_root() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["b"])]);
        assert_eq!(find_cycles(&g), vec![vec!["b", "c", "b"]]);
    }

    #[test]
    fn test_every_back_edge_reported() {
        let g = graph(&[("a", &["b"]), ("b", &["a", "c"]), ("c", &["a"])]);
        let cycles = find_cycles(&g);
        assert_eq!(cycles.len(), 2);
        for cycle in &cycles {
            assert_eq!(cycle.first(), cycle.last());
        }
    }

    #[test]
    fn test_unknown_targets_ignored() {
        let g = graph(&[("a", &["missing"])]);
        assert!(find_cycles(&g).is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut g = Graph::new();
        for i in 0..100_000 {
            g.insert(format!("n{i:06}"), vec![format!("n{:06}", i + 1)]);
        }
        g.insert("n100000".to_string(), vec!["n000000".to_string()]);
        let cycles = find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 100_002);
    }

    #[test]
    fn test_graph_not_mutated() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        let before = g.clone();
        let _ = find_cycles(&g);
        assert_eq!(g, before);
    }

    #[test]
    fn test_attribute_package_cycle() {
        let nodes = vec![
            node("content/p/x.mat", "p", &["content/q/y.png"]),
            node("content/q/y.png", "q", &["content/p/z.txt"]),
            node("content/p/z.txt", "p", &[]),
        ];
        let cycle = vec!["p".to_string(), "q".to_string(), "p".to_string()];
        let edges = attribute_package_cycle(&cycle, &nodes);
        assert_eq!(edges.len(), 2);
        assert_eq!(
            edges[0].references,
            vec![("content/p/x.mat".to_string(), "content/q/y.png".to_string())]
        );
        assert_eq!(
            edges[1].to_string(),
            "q -> p via content/q/y.png -> content/p/z.txt"
        );
    }
}
