//! Static table of every calculator control.
//!
//! The view iterates [`OPERATIONS`] to build its controls and resolves key
//! presses through [`find_by_shortcut`]. The table holds no state.

use crate::calculator::{Action, BinaryKey};
use crate::eval::{BinaryOperator, UnaryOperation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub id: &'static str,
    pub label: &'static str,
    pub shortcuts: &'static [&'static str],
    pub action: Action,
}

const fn binary(operator: BinaryOperator) -> Action {
    Action::Binary(BinaryKey::Operator(operator))
}

const fn digit(
    id: &'static str,
    label: &'static str,
    shortcuts: &'static [&'static str],
    symbol: char,
) -> Operation {
    Operation {
        id,
        label,
        shortcuts,
        action: Action::Append(symbol),
    }
}

pub const OPERATIONS: &[Operation] = &[
    Operation {
        id: "plus",
        label: "+",
        shortcuts: &["+"],
        action: binary(BinaryOperator::Add),
    },
    Operation {
        id: "minus",
        label: "−",
        shortcuts: &["-"],
        action: binary(BinaryOperator::Subtract),
    },
    Operation {
        id: "divide",
        label: "÷",
        shortcuts: &["/"],
        action: binary(BinaryOperator::Divide),
    },
    Operation {
        id: "multiplication",
        label: "×",
        shortcuts: &["*"],
        action: binary(BinaryOperator::Multiply),
    },
    Operation {
        id: "decimal-separator",
        label: ".",
        shortcuts: &[".", ","],
        action: Action::Append('.'),
    },
    Operation {
        id: "opposite",
        label: "+/−",
        shortcuts: &["F9"],
        action: Action::ToggleSign,
    },
    Operation {
        id: "equals",
        label: "=",
        shortcuts: &["Enter", "="],
        action: Action::Binary(BinaryKey::Equals),
    },
    Operation {
        id: "clear",
        label: "C",
        shortcuts: &["Escape"],
        action: Action::ClearAll,
    },
    Operation {
        id: "clear-entry",
        label: "CE",
        shortcuts: &["Delete"],
        action: Action::ClearEntry,
    },
    Operation {
        id: "backspace",
        label: "←",
        shortcuts: &["Backspace"],
        action: Action::Backspace,
    },
    Operation {
        id: "reciprocal",
        label: "1/x",
        shortcuts: &["r", "R"],
        action: Action::Unary(UnaryOperation::Reciprocal),
    },
    Operation {
        id: "power-2",
        label: "x²",
        shortcuts: &["q", "Q"],
        action: Action::Unary(UnaryOperation::Square),
    },
    Operation {
        id: "power-3",
        label: "x³",
        shortcuts: &["#"],
        action: Action::Unary(UnaryOperation::Cube),
    },
    Operation {
        id: "square-root",
        label: "√x",
        shortcuts: &["@"],
        action: Action::Unary(UnaryOperation::SquareRoot),
    },
    digit("digit-0", "0", &["0"], '0'),
    digit("digit-1", "1", &["1"], '1'),
    digit("digit-2", "2", &["2"], '2'),
    digit("digit-3", "3", &["3"], '3'),
    digit("digit-4", "4", &["4"], '4'),
    digit("digit-5", "5", &["5"], '5'),
    digit("digit-6", "6", &["6"], '6'),
    digit("digit-7", "7", &["7"], '7'),
    digit("digit-8", "8", &["8"], '8'),
    digit("digit-9", "9", &["9"], '9'),
];

/// Button grid, one operation id per cell.
pub const BUTTONS_LAYOUT: [[&str; 4]; 6] = [
    ["reciprocal", "clear-entry", "clear", "backspace"],
    ["power-2", "power-3", "square-root", "divide"],
    ["digit-7", "digit-8", "digit-9", "multiplication"],
    ["digit-4", "digit-5", "digit-6", "minus"],
    ["digit-1", "digit-2", "digit-3", "plus"],
    ["opposite", "digit-0", "decimal-separator", "equals"],
];

pub fn find_by_id(id: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|operation| operation.id == id)
}

/// Resolves a key name such as `Enter` or `7` to its operation.
pub fn find_by_shortcut(key: &str) -> Option<&'static Operation> {
    OPERATIONS
        .iter()
        .find(|operation| operation.shortcuts.iter().any(|shortcut| *shortcut == key))
}
