//! Logical ordering of one file's elements from its sequence flows.
//!
//! Ordering runs over every element the flows mention, not only the
//! elements that become graph nodes. Gateways and intermediate events sit
//! between activities all the time; if the walk skipped them, the activity
//! after a gateway would never be reached and would lose its order. The
//! projection down to graph nodes happens only at the very end.

use procmap_interchange::SequenceFlow;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Branch id of the primary path.
pub const MAIN_BRANCH: &str = "main";

/// Logical position of one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceOrder {
    pub order_index: usize,
    pub branch_id: String,
}

/// Adjacency over every element id mentioned in a flow list.
///
/// Elements are indexed in first-mention order so that every traversal
/// below is deterministic for a given flow list.
struct FlowGraph<'a> {
    ids: Vec<&'a str>,
    outgoing: Vec<Vec<usize>>,
    indegree: Vec<usize>,
}

impl<'a> FlowGraph<'a> {
    fn new(flows: &'a [SequenceFlow]) -> Self {
        let mut graph = FlowGraph {
            ids: Vec::new(),
            outgoing: Vec::new(),
            indegree: Vec::new(),
        };
        let mut index: HashMap<&'a str, usize> = HashMap::new();
        let mut seen_edges: HashSet<(usize, usize)> = HashSet::new();

        for flow in flows {
            let from = graph.intern(&mut index, flow.source_ref.as_str());
            let to = graph.intern(&mut index, flow.target_ref.as_str());
            if seen_edges.insert((from, to)) {
                graph.outgoing[from].push(to);
                graph.indegree[to] += 1;
            }
        }

        graph
    }

    fn intern(&mut self, index: &mut HashMap<&'a str, usize>, id: &'a str) -> usize {
        if let Some(&i) = index.get(id) {
            return i;
        }
        self.ids.push(id);
        self.outgoing.push(Vec::new());
        self.indegree.push(0);
        let i = self.ids.len() - 1;
        index.insert(id, i);
        i
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|candidate| *candidate == id)
    }
}

/// Compute `orderIndex`/`branchId` for the interesting elements of one file.
///
/// Equivalent to [`order_from`] with no declared start elements.
pub fn order(
    flows: &[SequenceFlow],
    interesting_ids: &BTreeSet<String>,
    element_to_node: &BTreeMap<String, String>,
) -> BTreeMap<String, SequenceOrder> {
    order_from(flows, &[], interesting_ids, element_to_node)
}

/// Compute `orderIndex`/`branchId` for the interesting elements of one file,
/// keyed by node id.
///
/// The walk is breadth-first from the declared `start_ids` that appear in the
/// flows, or from every element without incoming flows when none do. Each
/// visited element, interesting or not, takes the next counter value.
/// Elements left unvisited (other components, source-less cycles) are
/// walked afterwards in first-mention order with the same counter.
///
/// At an element with several outgoing flows the first flow keeps the
/// current branch and flow `n` (n >= 1) opens `"{branch}-branch-{n}"`.
pub fn order_from(
    flows: &[SequenceFlow],
    start_ids: &[String],
    interesting_ids: &BTreeSet<String>,
    element_to_node: &BTreeMap<String, String>,
) -> BTreeMap<String, SequenceOrder> {
    let graph = FlowGraph::new(flows);
    let all = walk(&graph, start_ids);

    let mut projected = BTreeMap::new();
    for (element_id, node_id) in element_to_node {
        if !interesting_ids.contains(element_id) {
            continue;
        }
        if let Some(order) = all.get(element_id.as_str()) {
            projected.insert(node_id.clone(), order.clone());
        }
    }

    tracing::trace!(
        elements = graph.ids.len(),
        projected = projected.len(),
        "sequence order computed"
    );

    projected
}

/// Order of every element mentioned in the flows, keyed by element id.
pub fn order_all(flows: &[SequenceFlow], start_ids: &[String]) -> BTreeMap<String, SequenceOrder> {
    let graph = FlowGraph::new(flows);
    walk(&graph, start_ids)
        .into_iter()
        .map(|(id, order)| (id.to_string(), order))
        .collect()
}

fn walk<'a>(graph: &FlowGraph<'a>, start_ids: &[String]) -> HashMap<&'a str, SequenceOrder> {
    let n = graph.ids.len();
    let mut assigned: Vec<Option<SequenceOrder>> = vec![None; n];
    let mut counter = 0usize;

    let declared: Vec<usize> = start_ids
        .iter()
        .filter_map(|id| graph.position(id))
        .collect();
    let seeds: Vec<usize> = if declared.is_empty() {
        (0..n).filter(|&i| graph.indegree[i] == 0).collect()
    } else {
        declared
    };

    let mut queue: VecDeque<usize> = VecDeque::new();
    for seed in seeds {
        visit(seed, MAIN_BRANCH, &mut assigned, &mut counter, &mut queue);
    }
    drain(graph, &mut assigned, &mut counter, &mut queue);

    // Remaining components continue the same counter.
    for i in 0..n {
        if assigned[i].is_none() {
            visit(i, MAIN_BRANCH, &mut assigned, &mut counter, &mut queue);
            drain(graph, &mut assigned, &mut counter, &mut queue);
        }
    }

    graph
        .ids
        .iter()
        .zip(assigned)
        .filter_map(|(id, order)| order.map(|o| (*id, o)))
        .collect()
}

fn visit(
    element: usize,
    branch: &str,
    assigned: &mut [Option<SequenceOrder>],
    counter: &mut usize,
    queue: &mut VecDeque<usize>,
) {
    if assigned[element].is_some() {
        return;
    }
    assigned[element] = Some(SequenceOrder {
        order_index: *counter,
        branch_id: branch.to_string(),
    });
    *counter += 1;
    queue.push_back(element);
}

fn drain(
    graph: &FlowGraph<'_>,
    assigned: &mut [Option<SequenceOrder>],
    counter: &mut usize,
    queue: &mut VecDeque<usize>,
) {
    while let Some(current) = queue.pop_front() {
        let branch = match &assigned[current] {
            Some(order) => order.branch_id.clone(),
            None => continue,
        };
        for (n, &next) in graph.outgoing[current].iter().enumerate() {
            let next_branch = if n == 0 {
                branch.clone()
            } else {
                format!("{}-branch-{}", branch, n)
            };
            visit(next, &next_branch, assigned, counter, queue);
        }
    }
}

/// Sequence edges between interesting elements, walking through
/// pass-through elements.
///
/// For `a -> X -> c` with `X` not interesting this yields `(a, c)`. Pairs
/// are returned in first-mention order of the source, then discovery order
/// of the target; self-loops are dropped.
pub fn collapse(flows: &[SequenceFlow], interesting_ids: &BTreeSet<String>) -> Vec<(String, String)> {
    let graph = FlowGraph::new(flows);
    let is_interesting: Vec<bool> = graph
        .ids
        .iter()
        .map(|id| interesting_ids.contains(*id))
        .collect();

    let mut pairs = Vec::new();
    for source in 0..graph.ids.len() {
        if !is_interesting[source] {
            continue;
        }
        let mut seen = vec![false; graph.ids.len()];
        let mut queue: VecDeque<usize> = graph.outgoing[source].iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if seen[current] {
                continue;
            }
            seen[current] = true;
            if is_interesting[current] {
                if current != source {
                    pairs.push((
                        graph.ids[source].to_string(),
                        graph.ids[current].to_string(),
                    ));
                }
                continue;
            }
            queue.extend(graph.outgoing[current].iter().copied());
        }
    }
    pairs
}
