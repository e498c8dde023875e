//! Dialog graph nodes
//!
//! Everything that varies with the live selection is expressed as data:
//! messages and routes are either `Static` or a `Computed` tag naming a
//! pure function of the `Selection`. This keeps the graph serializable and
//! lets the engine evaluate it without closures.

use serde::{Deserialize, Serialize};

use crate::conversation::{ActionFamily, Dimension, DimensionValue, NumericField, Selection};

/// Placeholder id segment for a skipped dimension.
pub const ANY_SEGMENT: &str = "any";

// ---------------------------------------------------------------------------
// Node ids
// ---------------------------------------------------------------------------

pub const ROOT_NODE: &str = "brand";
pub const DATEPICKER_NODE: &str = "datepicker";
pub const NUMBER_OF_DESIGNS_NODE: &str = "number_of_designs";
pub const NUMBER_OF_VARIATIONS_NODE: &str = "number_of_variations";
pub const RESULT_NODE: &str = "result";
pub const DESIGN_COMPLETE_NODE: &str = "design_complete";
pub const DESIGN_ERROR_NODE: &str = "design_error";

/// Escape a catalog name for use as an id segment.
///
/// `%` and `/` are percent-encoded and a name spelled exactly like the
/// placeholder is prefixed with `%`, so no name collides with either.
pub fn escape_segment(name: &str) -> String {
    if name == ANY_SEGMENT {
        return format!("%{}", ANY_SEGMENT);
    }
    name.replace('%', "%25").replace('/', "%2F")
}

/// Id of the node that chooses the dimension below `scope`.
///
/// `scope[i]` is the value fixed for dimension `i`, `None` when skipped.
/// An empty scope is the root; a scope of three levels is a
/// sub-department node.
pub fn scope_node_id(scope: &[Option<&str>]) -> String {
    let prefix = match scope.len() {
        0 => return ROOT_NODE.to_string(),
        1 => "category",
        2 => "department",
        _ => "subdepartment",
    };
    let mut id = prefix.to_string();
    for segment in scope {
        id.push('/');
        match segment {
            Some(name) => id.push_str(&escape_segment(name)),
            None => id.push_str(ANY_SEGMENT),
        }
    }
    id
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Choice,
    DatePick,
    NumberInput {
        field: NumericField,
        min: u32,
        max: u32,
        default: u32,
    },
    Table,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Choice => "choice",
            NodeKind::DatePick => "date_pick",
            NodeKind::NumberInput { .. } => "number_input",
            NodeKind::Table => "table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFn {
    /// Seven-row table of the accumulated selection
    SelectionSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageSpec {
    Static(String),
    Computed(MessageFn),
}

impl MessageSpec {
    /// Evaluate against a selection.
    pub fn render(&self, selection: &Selection) -> RenderedMessage {
        match self {
            MessageSpec::Static(text) => RenderedMessage::Text(text.clone()),
            MessageSpec::Computed(MessageFn::SelectionSummary) => {
                RenderedMessage::Table(SummaryTable::for_selection(selection))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteFn {
    /// Sub-department node of the selection's brand/category/department
    SubDepartmentForSelection,
}

impl RouteFn {
    pub fn resolve(self, selection: &Selection) -> String {
        match self {
            RouteFn::SubDepartmentForSelection => {
                let scope: Vec<Option<&str>> = [
                    Dimension::Brand,
                    Dimension::Category,
                    Dimension::Department,
                ]
                .into_iter()
                .map(|d| selection.dimension(d).and_then(DimensionValue::as_specific))
                .collect();
                scope_node_id(&scope)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NextId {
    Static(String),
    Computed(RouteFn),
}

impl NextId {
    pub fn to(id: impl Into<String>) -> Self {
        NextId::Static(id.into())
    }

    pub fn resolve(&self, selection: &Selection) -> String {
        match self {
            NextId::Static(id) => id.clone(),
            NextId::Computed(route) => route.resolve(selection),
        }
    }
}

/// Selection update applied when an option is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEffect {
    pub dimension: Dimension,
    pub value: DimensionValue,
}

/// Options that record no history and hand control to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilentAction {
    Generate,
    GenerateAgain,
    PublishOne,
    PublishMany,
    StartNewSearch,
}

impl SilentAction {
    pub const ALL: [SilentAction; 5] = [
        SilentAction::Generate,
        SilentAction::GenerateAgain,
        SilentAction::PublishOne,
        SilentAction::PublishMany,
        SilentAction::StartNewSearch,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SilentAction::Generate => "Generate Design",
            SilentAction::GenerateAgain => "Generate Design Again",
            SilentAction::PublishOne => "Add to Lark",
            SilentAction::PublishMany => "Add All Variations to Lark",
            SilentAction::StartNewSearch => "Start New Search",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.label() == label)
    }

    /// Action family, `None` for the purely local reset.
    pub fn family(self) -> Option<ActionFamily> {
        match self {
            SilentAction::Generate | SilentAction::GenerateAgain => Some(ActionFamily::Generate),
            SilentAction::PublishOne | SilentAction::PublishMany => Some(ActionFamily::Publish),
            SilentAction::StartNewSearch => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOption {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<FieldEffect>,
    pub next: NextId,
    /// "Back ..." navigation; never mutates the selection
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub back: bool,
    /// Set on options that trigger an action instead of navigating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<SilentAction>,
}

impl ScriptOption {
    pub fn new(text: impl Into<String>, next: NextId) -> Self {
        Self {
            text: text.into(),
            effect: None,
            next,
            back: false,
            action: None,
        }
    }

    /// Option dispatching `action`. `next` is only used for validation;
    /// the action's outcome decides where the conversation goes.
    pub fn action(action: SilentAction, next: NextId) -> Self {
        Self {
            action: Some(action),
            ..Self::new(action.label(), next)
        }
    }

    pub fn back(text: impl Into<String>, next: NextId) -> Self {
        Self {
            back: true,
            ..Self::new(text, next)
        }
    }

    pub fn with_effect(mut self, dimension: Dimension, value: DimensionValue) -> Self {
        self.effect = Some(FieldEffect { dimension, value });
        self
    }

    pub fn is_back(&self) -> bool {
        self.back
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptNode {
    pub id: String,
    pub kind: NodeKind,
    pub message: MessageSpec,
    #[serde(default)]
    pub options: Vec<ScriptOption>,
    /// Fixed successor of date and number steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextId>,
}

impl ScriptNode {
    pub fn choice(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Choice,
            message: MessageSpec::Static(message.into()),
            options: Vec::new(),
            next: None,
        }
    }

    pub fn option(&self, text: &str) -> Option<&ScriptOption> {
        self.options.iter().find(|o| o.text == text)
    }

    pub fn has_back(&self) -> bool {
        self.options.iter().any(ScriptOption::is_back)
    }
}

// ---------------------------------------------------------------------------
// Rendered messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RenderedMessage {
    Text(String),
    Table(SummaryTable),
}

impl RenderedMessage {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderedMessage::Text(text) => Some(text),
            RenderedMessage::Table(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub rows: Vec<TableRow>,
    pub prompt: String,
}

impl SummaryTable {
    pub fn for_selection(selection: &Selection) -> Self {
        let row = |label: &str, value: String| TableRow {
            label: label.to_string(),
            value,
        };
        let number = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_default();

        let mut rows = vec![
            row(
                "Target Release Date",
                selection
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
            row("Number of Base Designs", number(selection.num_base_designs)),
            row("Variations per Base", number(selection.num_variations_per_base)),
        ];
        rows.extend(
            Dimension::ALL
                .into_iter()
                .map(|d| row(d.label(), selection.dimension_label(d).to_string())),
        );

        Self {
            rows,
            prompt: "What would you like to do next?".to_string(),
        }
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scope_node_ids() {
        assert_eq!(scope_node_id(&[]), "brand");
        assert_eq!(scope_node_id(&[Some("Nike")]), "category/Nike");
        assert_eq!(scope_node_id(&[None, Some("Dress")]), "department/any/Dress");
        assert_eq!(
            scope_node_id(&[Some("Nike"), None, None]),
            "subdepartment/Nike/any/any"
        );
    }

    #[test]
    fn test_escaping_keeps_placeholder_unique() {
        assert_ne!(scope_node_id(&[Some("any")]), scope_node_id(&[None]));
        assert_eq!(escape_segment("any"), "%any");
        assert_eq!(escape_segment("Any"), "Any");
        assert_eq!(escape_segment("Tops/Tees"), "Tops%2FTees");
        assert_eq!(escape_segment("100%"), "100%25");
        assert_ne!(escape_segment("%any"), escape_segment("any"));
    }

    #[test]
    fn test_summary_table_rows() {
        let mut selection = Selection::new();
        selection.date = NaiveDate::from_ymd_opt(2030, 5, 1);
        selection.set_dimension(Dimension::Brand, DimensionValue::value("Nike"));
        selection.set_dimension(Dimension::Category, DimensionValue::Any);
        selection.num_base_designs = Some(3);
        selection.num_variations_per_base = Some(2);

        let table = SummaryTable::for_selection(&selection);
        let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Target Release Date",
                "Number of Base Designs",
                "Variations per Base",
                "Brand",
                "Category",
                "Department",
                "Sub-Department",
            ]
        );
        assert_eq!(table.value("Target Release Date"), Some("2030-05-01"));
        assert_eq!(table.value("Variations per Base"), Some("2"));
        assert_eq!(table.value("Category"), Some("Any"));
        assert_eq!(table.value("Department"), Some("Any"));
    }

    #[test]
    fn test_route_for_selection() {
        let mut selection = Selection::new();
        selection.set_dimension(Dimension::Brand, DimensionValue::Any);
        selection.set_dimension(Dimension::Category, DimensionValue::value("Dress"));
        selection.set_dimension(Dimension::Department, DimensionValue::value("Ladies"));

        assert_eq!(
            RouteFn::SubDepartmentForSelection.resolve(&selection),
            "subdepartment/any/Dress/Ladies"
        );
    }

    #[test]
    fn test_back_detection() {
        assert!(ScriptOption::back("Back to brands", NextId::to("brand")).is_back());
        // A catalog value that happens to start with "Back" is a regular option
        let backpacks = ScriptOption::new("Backpacks", NextId::to("department/Nike/Backpacks"))
            .with_effect(Dimension::Category, DimensionValue::value("Backpacks"));
        assert!(!backpacks.is_back());
        assert!(backpacks.action.is_none());
    }

    #[test]
    fn test_silent_action_labels() {
        for action in SilentAction::ALL {
            assert_eq!(SilentAction::from_label(action.label()), Some(action));
        }
        assert_eq!(SilentAction::from_label("Back to brands"), None);
        assert_eq!(SilentAction::StartNewSearch.family(), None);
    }
}
