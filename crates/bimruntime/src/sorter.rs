use bimcore::{Graph, GraphError, NodeId};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, VecDeque};

/// Compute a producer-before-consumer ordering over the graph.
///
/// Validates edge endpoints, then depth-first traversal in node
/// declaration order with an on-stack marker. Re-entering a node still
/// on the recursion stack is a cycle and fails the whole run before any
/// node executes. A node is inserted at the front of the order once its
/// entire downstream subtree has been visited, so for every edge
/// `u -> v`, `u` ends up before `v`. Deterministic for a given graph.
pub fn topo_sort(graph: &Graph) -> Result<Vec<NodeId>, GraphError> {
    let dag = build_dag(graph)?;

    let mut marks = vec![Mark::Unvisited; dag.node_count()];
    let mut order = VecDeque::with_capacity(dag.node_count());

    for idx in dag.node_indices() {
        if marks[idx.index()] == Mark::Unvisited {
            visit(&dag, idx, &mut marks, &mut order)?;
        }
    }

    Ok(order.into())
}

/// Build the dependency graph from the node/edge collections, rejecting
/// edges whose endpoints are not in the node list.
fn build_dag(graph: &Graph) -> Result<DiGraph<NodeId, ()>, GraphError> {
    let mut dag = DiGraph::new();
    let mut node_to_index: HashMap<&str, NodeIndex> = HashMap::new();

    for node in &graph.nodes {
        let idx = dag.add_node(node.id.clone());
        node_to_index.insert(node.id.as_str(), idx);
    }

    for edge in &graph.edges {
        let source = node_to_index.get(edge.source.as_str()).ok_or_else(|| {
            GraphError::UnknownNodeReference {
                node_id: edge.source.clone(),
            }
        })?;
        let target = node_to_index.get(edge.target.as_str()).ok_or_else(|| {
            GraphError::UnknownNodeReference {
                node_id: edge.target.clone(),
            }
        })?;
        dag.add_edge(*source, *target, ());
    }

    Ok(dag)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

fn visit(
    dag: &DiGraph<NodeId, ()>,
    idx: NodeIndex,
    marks: &mut [Mark],
    order: &mut VecDeque<NodeId>,
) -> Result<(), GraphError> {
    match marks[idx.index()] {
        Mark::Done => return Ok(()),
        Mark::OnStack => return Err(GraphError::CyclicGraph),
        Mark::Unvisited => {}
    }

    marks[idx.index()] = Mark::OnStack;
    for succ in dag.neighbors(idx) {
        visit(dag, succ, marks, order)?;
    }
    marks[idx.index()] = Mark::Done;
    order.push_front(dag[idx].clone());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimcore::{port, NodeSpec};

    fn graph_with(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new("test");
        for id in nodes {
            graph.add_node(NodeSpec::new(*id, "parameterNode"));
        }
        for (from, to) in edges {
            graph.connect(*from, port::OUTPUT, *to, port::INPUT);
        }
        graph
    }

    fn position(order: &[NodeId], id: &str) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    #[test]
    fn orders_linear_chain() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let order = topo_sort(&graph).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn every_edge_is_ordered() {
        let edges = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")];
        let graph = graph_with(&["e", "d", "c", "b", "a"], &edges);
        let order = topo_sort(&graph).unwrap();
        for (u, v) in edges {
            assert!(
                position(&order, u) < position(&order, v),
                "{} must come before {}",
                u,
                v
            );
        }
    }

    #[test]
    fn rejects_two_node_cycle() {
        let graph = graph_with(&["a", "b"], &[("a", "b"), ("b", "a")]);
        assert_eq!(topo_sort(&graph), Err(GraphError::CyclicGraph));
    }

    #[test]
    fn rejects_self_loop() {
        let graph = graph_with(&["a"], &[("a", "a")]);
        assert_eq!(topo_sort(&graph), Err(GraphError::CyclicGraph));
    }

    #[test]
    fn rejects_dangling_edge_endpoint() {
        let graph = graph_with(&["a"], &[("a", "ghost")]);
        assert_eq!(
            topo_sort(&graph),
            Err(GraphError::UnknownNodeReference {
                node_id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn deterministic_across_runs() {
        let graph = graph_with(
            &["a", "b", "c", "d"],
            &[("a", "c"), ("b", "c"), ("c", "d")],
        );
        let first = topo_sort(&graph).unwrap();
        for _ in 0..10 {
            assert_eq!(topo_sort(&graph).unwrap(), first);
        }
    }

    #[test]
    fn disconnected_nodes_are_included() {
        let graph = graph_with(&["a", "b", "lonely"], &[("a", "b")]);
        let order = topo_sort(&graph).unwrap();
        assert_eq!(order.len(), 3);
        assert!(order.contains(&"lonely".to_string()));
    }
}
