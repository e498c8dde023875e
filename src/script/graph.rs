//! Dialog graph generation
//!
//! ```text
//! brand ──► category/<b> ──► department/<b>/<c> ──► subdepartment/<b>/<c>/<d>
//!   │            │                  │                         │
//!   └─ skip ─────┴─ skip ───────────┴─ skip ──────────────────┴──► datepicker
//!                                                                    │
//!                      number_of_designs ◄───────────────────────────┘
//!                             │
//!                      number_of_variations ──► result ──► design_complete
//!                                                  └─────► design_error
//! ```
//!
//! Each segment is a catalog name or the `any` placeholder. A node whose
//! scope has skipped levels offers the union of next-level keys across all
//! parents consistent with the fixed levels.

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::node::*;
use crate::catalog::CatalogIndex;
use crate::config::{NumberBounds, ScriptConfig};
use crate::conversation::{Dimension, DimensionValue, NumericField};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Root node '{0}' is missing")]
    MissingRoot(String),

    #[error("Node '{node}' routes to unknown node '{target}'")]
    DanglingNext { node: String, target: String },

    #[error("Back option '{option}' on node '{node}' carries an effect")]
    BackWithEffect { node: String, option: String },

    #[error("Node '{0}' has no options and no way back")]
    DeadEnd(String),

    #[error("Node '{0}' takes input but has no successor")]
    MissingSuccessor(String),
}

/// Complete dialog for one catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptGraph {
    root: String,
    nodes: IndexMap<String, ScriptNode>,
}

impl ScriptGraph {
    /// Expand a catalog index into the full node set and validate it.
    pub fn generate(index: &CatalogIndex, config: &ScriptConfig) -> Result<Self, ScriptError> {
        let mut nodes: IndexMap<String, ScriptNode> = IndexMap::new();

        let mut pending: VecDeque<Vec<Option<String>>> = VecDeque::from([Vec::new()]);
        while let Some(scope) = pending.pop_front() {
            let scope_refs: Vec<Option<&str>> = scope.iter().map(Option::as_deref).collect();
            let id = scope_node_id(&scope_refs);
            if nodes.contains_key(&id) {
                continue;
            }

            let children = index.children(&scope_refs);
            let skip = has_skip(scope.len(), index);
            let node = scope_node(id.clone(), &scope_refs, &children, skip, config);

            if scope.len() < 3 {
                for child in &children {
                    let mut next = scope.clone();
                    next.push(Some(child.to_string()));
                    pending.push_back(next);
                }
                if skip {
                    let mut next = scope.clone();
                    next.push(None);
                    pending.push_back(next);
                }
            }

            nodes.insert(id, node);
        }

        for node in fixed_nodes(config) {
            nodes.insert(node.id.clone(), node);
        }

        let graph = Self {
            root: ROOT_NODE.to_string(),
            nodes,
        };
        graph.validate()?;

        tracing::debug!(nodes = graph.nodes.len(), "Dialog graph generated");
        Ok(graph)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn get(&self, id: &str) -> Option<&ScriptNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ScriptNode> {
        self.nodes.values()
    }

    /// Check structural invariants.
    ///
    /// Computed routes depend on the live selection and are checked by the
    /// engine when they are taken.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if !self.nodes.contains_key(&self.root) {
            return Err(ScriptError::MissingRoot(self.root.clone()));
        }

        for node in self.nodes.values() {
            let check = |next: &NextId| match next {
                NextId::Static(target) if !self.nodes.contains_key(target) => {
                    Err(ScriptError::DanglingNext {
                        node: node.id.clone(),
                        target: target.clone(),
                    })
                }
                _ => Ok(()),
            };

            for option in &node.options {
                if option.is_back() && option.effect.is_some() {
                    return Err(ScriptError::BackWithEffect {
                        node: node.id.clone(),
                        option: option.text.clone(),
                    });
                }
                check(&option.next)?;
            }

            match (&node.kind, &node.next) {
                (NodeKind::DatePick | NodeKind::NumberInput { .. }, None) => {
                    return Err(ScriptError::MissingSuccessor(node.id.clone()));
                }
                (_, Some(next)) => check(next)?,
                (NodeKind::Choice | NodeKind::Table, None) if node.options.is_empty() => {
                    return Err(ScriptError::DeadEnd(node.id.clone()));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Skip is offered at every level of a non-empty catalog, so rows with
/// missing lower levels still reach the datepicker. An empty catalog keeps
/// only the root skip, leading to a back-only node.
fn has_skip(depth: usize, index: &CatalogIndex) -> bool {
    depth == 0 || !index.is_empty()
}

/// Node choosing the dimension below `scope`.
fn scope_node(
    id: String,
    scope: &[Option<&str>],
    children: &[&str],
    skip: bool,
    config: &ScriptConfig,
) -> ScriptNode {
    let depth = scope.len();
    let dimension = Dimension::at_depth(depth).unwrap_or(Dimension::SubDepartment);

    let mut node =
        ScriptNode::choice(id, scope_message(scope, children, skip, dimension, config));

    let child_next = |child: Option<&str>| {
        if depth >= 3 {
            NextId::to(DATEPICKER_NODE)
        } else {
            let mut next = scope.to_vec();
            next.push(child);
            NextId::Static(scope_node_id(&next))
        }
    };

    for &child in children {
        node.options.push(
            ScriptOption::new(child, child_next(Some(child)))
                .with_effect(dimension, DimensionValue::value(child)),
        );
    }

    if skip {
        node.options.push(
            ScriptOption::new(format!("Skip (Any {})", dimension.label()), child_next(None))
                .with_effect(dimension, DimensionValue::Any),
        );
    }

    if let Some(parent) = depth.checked_sub(1).and_then(Dimension::at_depth) {
        node.options.push(ScriptOption::back(
            format!("Back to {}", parent.plural()),
            NextId::Static(scope_node_id(&scope[..depth - 1])),
        ));
    }

    node
}

fn scope_message(
    scope: &[Option<&str>],
    children: &[&str],
    skip: bool,
    dimension: Dimension,
    config: &ScriptConfig,
) -> String {
    if scope.is_empty() {
        return format!(
            "Hello! I'm your {} assistant. Please select a brand to start:",
            config.assistant_name
        );
    }
    if children.is_empty() && skip {
        return format!(
            "No {} are listed for this selection. Skip to continue or go back:",
            dimension.plural()
        );
    }
    if children.is_empty() {
        return format!(
            "No {} are available for this selection. Please go back and choose again:",
            dimension.plural()
        );
    }

    let parent = scope.last().copied().flatten();
    match (dimension, parent) {
        (Dimension::Category, Some(brand)) => {
            format!("Please select a category from {} (or skip to continue):", brand)
        }
        (Dimension::Department, Some(category)) => {
            format!("Please select a department for {} (or skip to continue):", category)
        }
        (Dimension::SubDepartment, Some(department)) => {
            format!("Select a sub-department for {} (or skip to continue):", department)
        }
        (Dimension::SubDepartment, None) => {
            "Select a sub-department (or skip to continue):".to_string()
        }
        (_, _) => format!(
            "Please select a {} (or skip to continue):",
            dimension.label().to_lowercase()
        ),
    }
}

fn number_node(
    id: &str,
    field: NumericField,
    question: &str,
    bounds: NumberBounds,
    next: &str,
) -> ScriptNode {
    ScriptNode {
        id: id.to_string(),
        kind: NodeKind::NumberInput {
            field,
            min: bounds.min,
            max: bounds.max,
            default: bounds.default,
        },
        message: MessageSpec::Static(format!(
            "{} (Enter a number between {} and {})",
            question, bounds.min, bounds.max
        )),
        options: Vec::new(),
        next: Some(NextId::to(next)),
    }
}

/// Nodes shared by every catalog path.
fn fixed_nodes(config: &ScriptConfig) -> Vec<ScriptNode> {
    let datepicker = ScriptNode {
        id: DATEPICKER_NODE.to_string(),
        kind: NodeKind::DatePick,
        message: MessageSpec::Static("When do you plan to release the new designs?:".to_string()),
        options: Vec::new(),
        next: Some(NextId::to(NUMBER_OF_DESIGNS_NODE)),
    };

    let designs = number_node(
        NUMBER_OF_DESIGNS_NODE,
        NumericField::BaseDesigns,
        "How many base designs would you like to generate?",
        config.designs,
        NUMBER_OF_VARIATIONS_NODE,
    );

    let variations = number_node(
        NUMBER_OF_VARIATIONS_NODE,
        NumericField::VariationsPerBase,
        "How many variations would you like for each base design?",
        config.variations,
        RESULT_NODE,
    );

    let result = ScriptNode {
        id: RESULT_NODE.to_string(),
        kind: NodeKind::Table,
        message: MessageSpec::Computed(MessageFn::SelectionSummary),
        options: vec![
            ScriptOption::action(SilentAction::Generate, NextId::to(DESIGN_COMPLETE_NODE)),
            ScriptOption::action(SilentAction::StartNewSearch, NextId::to(ROOT_NODE)),
            ScriptOption::back(
                "Back to Number of Variations",
                NextId::to(NUMBER_OF_VARIATIONS_NODE),
            ),
            ScriptOption::new(
                "Change Catalog Filters",
                NextId::Computed(RouteFn::SubDepartmentForSelection),
            ),
        ],
        next: None,
    };

    let mut complete = ScriptNode::choice(DESIGN_COMPLETE_NODE, "What would you like to do next?");
    complete.options = vec![
        ScriptOption::action(SilentAction::PublishOne, NextId::to(DESIGN_COMPLETE_NODE)),
        ScriptOption::action(SilentAction::PublishMany, NextId::to(DESIGN_COMPLETE_NODE)),
        ScriptOption::action(SilentAction::StartNewSearch, NextId::to(ROOT_NODE)),
    ];

    let mut error = ScriptNode::choice(DESIGN_ERROR_NODE, "Would you like to try again?");
    error.options = vec![
        ScriptOption::action(SilentAction::GenerateAgain, NextId::to(DESIGN_COMPLETE_NODE)),
        ScriptOption::action(SilentAction::StartNewSearch, NextId::to(ROOT_NODE)),
    ];

    vec![datepicker, designs, variations, result, complete, error]
}

#[cfg(test)]
mod tests {
    use super::*;
    use design_service_types::CatalogRecord;
    use pretty_assertions::assert_eq;

    fn texts(graph: &ScriptGraph, id: &str) -> Vec<String> {
        graph
            .get(id)
            .unwrap_or_else(|| panic!("missing node {}", id))
            .options
            .iter()
            .map(|o| o.text.clone())
            .collect()
    }

    fn sample_graph() -> ScriptGraph {
        let index = CatalogIndex::from_records(&[
            CatalogRecord::new("Nike", "T-Shirt", "Men", "Casual"),
            CatalogRecord::new("Zara", "Dress", "Ladies", "Formal"),
        ]);
        ScriptGraph::generate(&index, &ScriptConfig::default()).unwrap()
    }

    #[test]
    fn test_root_lists_brands_then_skip() {
        let graph = sample_graph();
        assert_eq!(texts(&graph, "brand"), vec!["Nike", "Zara", "Skip (Any Brand)"]);
        let root = graph.get(graph.root()).unwrap();
        assert_eq!(
            root.message,
            MessageSpec::Static(
                "Hello! I'm your DeeDee assistant. Please select a brand to start:".into()
            )
        );
    }

    #[test]
    fn test_specific_category_node() {
        let graph = sample_graph();
        assert_eq!(
            texts(&graph, "category/Nike"),
            vec!["T-Shirt", "Skip (Any Category)", "Back to brands"]
        );
        let node = graph.get("category/Nike").unwrap();
        assert_eq!(node.options[0].next, NextId::to("department/Nike/T-Shirt"));
        assert_eq!(node.options[1].next, NextId::to("department/Nike/any"));
        assert_eq!(node.options[2].next, NextId::to("brand"));
        assert!(node.options[2].effect.is_none());
    }

    #[test]
    fn test_merge_nodes_union_children() {
        let graph = sample_graph();
        assert_eq!(
            texts(&graph, "category/any"),
            vec!["T-Shirt", "Dress", "Skip (Any Category)", "Back to brands"]
        );
        assert_eq!(
            texts(&graph, "department/any/Dress"),
            vec!["Ladies", "Skip (Any Department)", "Back to categories"]
        );
        assert_eq!(
            texts(&graph, "subdepartment/any/any/any"),
            vec!["Casual", "Formal", "Skip (Any Sub-Department)", "Back to departments"]
        );
    }

    #[test]
    fn test_sub_department_routes_to_datepicker() {
        let graph = sample_graph();
        let node = graph.get("subdepartment/Nike/T-Shirt/Men").unwrap();
        assert!(node
            .options
            .iter()
            .filter(|o| !o.is_back())
            .all(|o| o.next == NextId::to(DATEPICKER_NODE)));
        assert_eq!(
            node.options.last().unwrap().next,
            NextId::to("department/Nike/T-Shirt")
        );
    }

    #[test]
    fn test_empty_catalog_keeps_root_skip() {
        let graph = ScriptGraph::generate(&CatalogIndex::default(), &ScriptConfig::default())
            .unwrap();
        assert_eq!(texts(&graph, "brand"), vec!["Skip (Any Brand)"]);
        assert_eq!(texts(&graph, "category/any"), vec!["Back to brands"]);
        assert!(graph.get("department/any/any").is_none());
    }

    #[test]
    fn test_missing_level_keeps_skip() {
        let index = CatalogIndex::from_records(&[CatalogRecord {
            sub_department: None,
            ..CatalogRecord::new("Nike", "T-Shirt", "Men", "")
        }]);
        let graph = ScriptGraph::generate(&index, &ScriptConfig::default()).unwrap();

        assert_eq!(
            texts(&graph, "subdepartment/Nike/T-Shirt/Men"),
            vec!["Skip (Any Sub-Department)", "Back to departments"]
        );
        let node = graph.get("subdepartment/Nike/T-Shirt/Men").unwrap();
        assert_eq!(node.options[0].next, NextId::to(DATEPICKER_NODE));
        assert_eq!(
            node.message,
            MessageSpec::Static(
                "No sub-departments are listed for this selection. Skip to continue or go back:"
                    .into()
            )
        );
    }

    #[test]
    fn test_number_nodes_follow_config() {
        let mut config = ScriptConfig::default();
        config.designs = NumberBounds {
            min: 2,
            max: 8,
            default: 4,
        };
        let graph = ScriptGraph::generate(&CatalogIndex::default(), &config).unwrap();
        let node = graph.get(NUMBER_OF_DESIGNS_NODE).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::NumberInput {
                field: NumericField::BaseDesigns,
                min: 2,
                max: 8,
                default: 4
            }
        );
        assert_eq!(
            node.message,
            MessageSpec::Static(
                "How many base designs would you like to generate? (Enter a number between 2 and 8)"
                    .into()
            )
        );
    }

    #[test]
    fn test_name_equal_to_placeholder_does_not_collide() {
        let index = CatalogIndex::from_records(&[
            CatalogRecord::new("any", "Hat", "Men", "Casual"),
            CatalogRecord::new("Zara", "Dress", "Ladies", "Formal"),
        ]);
        let graph = ScriptGraph::generate(&index, &ScriptConfig::default()).unwrap();

        assert_eq!(texts(&graph, "category/%any"), vec!["Hat", "Skip (Any Category)", "Back to brands"]);
        assert_eq!(
            texts(&graph, "category/any"),
            vec!["Hat", "Dress", "Skip (Any Category)", "Back to brands"]
        );
    }

    #[test]
    fn test_validate_rejects_dangling_route() {
        let mut graph = sample_graph();
        let node = graph.nodes.get_mut("design_error").unwrap();
        node.options[1].next = NextId::to("nowhere");
        assert_eq!(
            graph.validate(),
            Err(ScriptError::DanglingNext {
                node: "design_error".into(),
                target: "nowhere".into()
            })
        );
    }

    #[test]
    fn test_validate_rejects_back_with_effect() {
        let mut graph = sample_graph();
        let node = graph.nodes.get_mut("category/Nike").unwrap();
        let back = node.options.last_mut().unwrap();
        back.effect = Some(FieldEffect {
            dimension: Dimension::Brand,
            value: DimensionValue::Any,
        });
        assert!(matches!(
            graph.validate(),
            Err(ScriptError::BackWithEffect { .. })
        ));
    }

    #[test]
    fn test_graph_serializes() {
        let graph = sample_graph();
        let json = serde_json::to_string(&graph).unwrap();
        let back: ScriptGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
    }
}
