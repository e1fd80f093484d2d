//! Diagnostic messages emitted by the engine.
//!
//! The original prints through the solver's message handler; here the
//! orchestrator owns a [`MessageHandler`] instead so the engine does not need
//! a handler on the solver interface. [`PrintingHandler`] reproduces the
//! stdout behaviour, [`SilentHandler`] discards everything.

use derive_more::Display;

use crate::{E, I};

/// One diagnostic event. Formatting lives in the `Display` derive so handlers
/// can either print the rendered text or match on the variant.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum PresolveMessage {
    /// An integer column's snapped bounds crossed.
    #[display("presolve: integer column {col} is infeasible with bounds [{lower}, {upper}]")]
    ColumnInfeasible { col: I, lower: E, upper: E },

    /// Integer bounds were tightened and pushed back to the original model.
    #[display("presolve: {count} integer bound changes")]
    IntegerModifications { count: usize },

    /// Summary after a successful presolve. Deltas are negative when the
    /// problem shrank.
    #[display(
        "presolve: {rows} rows ({row_delta}), {cols} columns ({col_delta}), {elements} elements ({element_delta})"
    )]
    Statistics {
        rows: I,
        row_delta: i64,
        cols: I,
        col_delta: i64,
        elements: I,
        element_delta: i64,
    },

    /// The problem was proven primal infeasible.
    #[display("presolve: problem infeasible (feasibility tolerance {tolerance:e})")]
    Infeasible { tolerance: E },

    /// The problem was proven unbounded.
    #[display("presolve: problem unbounded")]
    Unbounded,

    /// Dual infeasibility without a primal certificate.
    #[display("presolve: problem infeasible or unbounded")]
    InfeasibleOrUnbounded,

    /// Postsolve was fed a reduced problem that is not proven optimal.
    #[display("postsolve: reduced problem is not proven optimal")]
    NonOptimal,
}

/// Sink for engine diagnostics, in the spirit of the solver callbacks used
/// elsewhere in this stack.
pub trait MessageHandler {
    fn message(&mut self, message: &PresolveMessage);
}

/// Prints each diagnostic to stdout.
#[derive(Debug, Default)]
pub struct PrintingHandler;

impl MessageHandler for PrintingHandler {
    fn message(&mut self, message: &PresolveMessage) {
        println!("{}", message);
    }
}

/// Discards all diagnostics.
#[derive(Debug, Default)]
pub struct SilentHandler;

impl MessageHandler for SilentHandler {
    fn message(&mut self, _message: &PresolveMessage) {}
}

/// Records diagnostics for later inspection; used by tests.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub messages: Vec<PresolveMessage>,
}

impl MessageHandler for RecordingHandler {
    fn message(&mut self, message: &PresolveMessage) {
        self.messages.push(message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_formatting() {
        let msg = PresolveMessage::ColumnInfeasible {
            col: 3,
            lower: 2.0,
            upper: 1.0,
        };
        assert_eq!(
            msg.to_string(),
            "presolve: integer column 3 is infeasible with bounds [2, 1]"
        );

        let msg = PresolveMessage::Statistics {
            rows: 10,
            row_delta: -2,
            cols: 8,
            col_delta: -4,
            elements: 30,
            element_delta: -11,
        };
        assert_eq!(
            msg.to_string(),
            "presolve: 10 rows (-2), 8 columns (-4), 30 elements (-11)"
        );
    }

    #[test]
    fn recording_handler_keeps_order() {
        let mut handler = RecordingHandler::default();
        handler.message(&PresolveMessage::Unbounded);
        handler.message(&PresolveMessage::IntegerModifications { count: 2 });
        assert_eq!(handler.messages.len(), 2);
        assert_eq!(handler.messages[0], PresolveMessage::Unbounded);
    }
}
