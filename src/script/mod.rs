//! Dialog graph
//!
//! The graph is a pure function of a catalog snapshot: it is regenerated on
//! every catalog load and never mutated afterwards.

mod graph;
mod node;

pub use graph::{ScriptError, ScriptGraph};
pub use node::{
    escape_segment, scope_node_id, FieldEffect, MessageFn, MessageSpec, NextId, NodeKind,
    RenderedMessage, RouteFn, ScriptNode, ScriptOption, SilentAction, SummaryTable, TableRow,
    ANY_SEGMENT, DATEPICKER_NODE, DESIGN_COMPLETE_NODE, DESIGN_ERROR_NODE,
    NUMBER_OF_DESIGNS_NODE, NUMBER_OF_VARIATIONS_NODE, RESULT_NODE, ROOT_NODE,
};
