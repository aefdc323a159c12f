pub mod calculator;
pub mod eval;
pub mod format;
pub mod registry;
pub mod view;

pub use calculator::{Action, BinaryKey, Calculator, DEFAULT_ENTRY, ERROR_MESSAGE};
pub use eval::{eval, evaluate, BinaryOperator, EvalError, UnaryOperation};
