//! The calculator's input state machine.
//!
//! A [`Calculator`] owns the entry being typed, the pending left operand
//! and operator of a binary computation, and the flag telling whether the
//! user has typed into the current entry since the last commit. Every
//! mutation goes through [`Calculator::dispatch`] or one of the methods it
//! forwards to. Invalid key presses are ignored and failed evaluations put
//! the calculator into an error state that only the clear actions leave.

use crate::eval::{self, format_binary, format_unary, BinaryOperator, EvalError, UnaryOperation};
use crate::format::{
    count_digits, group_digits, is_number_ok, remove_last_symbol, DECIMAL_SEPARATOR,
    MAX_DIGITS_IN_INPUT, MINUS,
};
use bigdecimal::{BigDecimal, Zero};
use tracing::{debug, warn};

pub const DEFAULT_ENTRY: &str = "0";
pub const ERROR_MESSAGE: &str = "Error";

/// Operator key handed to [`Calculator::apply_binary`]. `Equals` commits
/// the pending computation and is never stored as the pending operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKey {
    Operator(BinaryOperator),
    Equals,
}

/// Everything a control can ask the calculator to do, with its bound
/// parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Binary(BinaryKey),
    Unary(UnaryOperation),
    Append(char),
    ToggleSign,
    Backspace,
    ClearEntry,
    ClearAll,
}

impl Action {
    pub fn is_clear(self) -> bool {
        matches!(self, Action::ClearEntry | Action::ClearAll)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calculator {
    /// Canonical entry text without grouping separators, or [`ERROR_MESSAGE`].
    entry: String,
    pending_operator: Option<BinaryOperator>,
    pending_left: Option<String>,
    /// Right operand of the last `=` commit, reused by repeated `=`.
    repeat_operand: Option<String>,
    has_new_input: bool,
}

impl Default for Calculator {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY.to_string(),
            pending_operator: None,
            pending_left: None,
            repeat_operand: None,
            has_new_input: false,
        }
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: Action) {
        debug!(?action, "dispatch");
        match action {
            Action::Binary(key) => self.apply_binary(key),
            Action::Unary(operation) => self.apply_unary(operation),
            Action::Append(symbol) => self.append_symbol(symbol),
            Action::ToggleSign => self.toggle_sign(),
            Action::Backspace => self.backspace(),
            Action::ClearEntry => self.clear_entry(),
            Action::ClearAll => self.clear_all(),
        }
    }

    /// The unformatted entry, e.g. `-1234.5`.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// The entry as the view shows it, with grouping separators.
    pub fn display(&self) -> String {
        group_digits(&self.entry)
    }

    pub fn pending_operator(&self) -> Option<BinaryOperator> {
        self.pending_operator
    }

    pub fn pending_left(&self) -> Option<&str> {
        self.pending_left.as_deref()
    }

    pub fn has_new_input(&self) -> bool {
        self.has_new_input
    }

    pub fn is_error(&self) -> bool {
        self.entry == ERROR_MESSAGE
    }

    /// True while every control except the two clear actions must be disabled.
    pub fn controls_disabled(&self) -> bool {
        self.is_error()
    }

    pub fn is_enabled(&self, action: Action) -> bool {
        !self.controls_disabled() || action.is_clear()
    }

    fn is_entry_default(&self) -> bool {
        self.entry == DEFAULT_ENTRY
    }

    fn is_entry_finite(&self) -> bool {
        is_number_ok(&self.entry)
    }

    fn set_error(&mut self, err: EvalError) {
        warn!(error = %err, entry = %self.entry, "evaluation failed");
        self.entry = ERROR_MESSAGE.to_string();
    }

    fn reset_entry(&mut self) {
        self.entry = DEFAULT_ENTRY.to_string();
    }

    pub fn apply_unary(&mut self, operation: UnaryOperation) {
        if self.is_error() {
            debug!(?operation, "ignored while in error state");
            return;
        }
        match eval::evaluate(&format_unary(operation, &self.entry)) {
            Ok(result) => {
                self.entry = result;
                self.repeat_operand = None;
            }
            Err(err) => self.set_error(err),
        }
    }

    pub fn apply_binary(&mut self, key: BinaryKey) {
        if self.is_error() {
            debug!(?key, "ignored while in error state");
            return;
        }
        let operator = match key {
            BinaryKey::Operator(operator) => Some(operator),
            BinaryKey::Equals => None,
        };

        if operator.is_none() && (self.pending_operator.is_none() || self.pending_left.is_none()) {
            debug!("nothing pending to commit");
            return;
        }

        let left = match self.pending_left.clone() {
            Some(left) => left,
            None => {
                match eval::evaluate(&self.entry) {
                    Ok(left) => self.pending_left = Some(left),
                    Err(err) => return self.set_error(err),
                }
                if operator.is_some() {
                    self.pending_operator = operator;
                }
                self.repeat_operand = None;
                self.has_new_input = false;
                return;
            }
        };

        if !self.has_new_input {
            if let Some(operator) = operator {
                debug!(?operator, "replacing pending operator");
                self.pending_operator = Some(operator);
                self.repeat_operand = None;
                return;
            }
        }

        let pending = match self.pending_operator {
            Some(pending) => pending,
            None => {
                self.pending_operator = operator;
                self.has_new_input = false;
                return;
            }
        };

        let right = match (&self.repeat_operand, operator, self.has_new_input) {
            (Some(repeat), None, false) => repeat.clone(),
            _ => self.entry.clone(),
        };

        match eval::evaluate(&format_binary(&left, pending, &right)) {
            Ok(result) => {
                debug!(%left, operator = ?pending, %right, %result, "committed");
                self.entry = result.clone();
                self.pending_left = Some(result);
                self.has_new_input = false;
                match operator {
                    Some(operator) => {
                        self.pending_operator = Some(operator);
                        self.repeat_operand = None;
                    }
                    None => self.repeat_operand = Some(right),
                }
            }
            Err(err) => self.set_error(err),
        }
    }

    /// Appends a digit or the decimal separator. The digit budget counts
    /// every digit of the entry, so it bounds typed numbers only: results
    /// are already rounded to the same number of significant digits, and
    /// the first keystroke after a result starts a fresh entry.
    pub fn append_symbol(&mut self, symbol: char) {
        if !self.is_entry_finite() {
            debug!(%symbol, "ignored while entry is not a number");
            return;
        }

        if !self.has_new_input {
            self.has_new_input = true;
            if !self.is_entry_default() {
                self.reset_entry();
            }
        }

        if count_digits(&self.entry) >= MAX_DIGITS_IN_INPUT {
            debug!(%symbol, "digit budget exhausted");
            return;
        }
        if symbol == DECIMAL_SEPARATOR && self.entry.contains(DECIMAL_SEPARATOR) {
            debug!("entry already has a decimal separator");
            return;
        }

        if self.is_entry_default() && symbol != DECIMAL_SEPARATOR {
            self.entry.clear();
        }
        self.entry.push(symbol);
    }

    pub fn backspace(&mut self) {
        if self.is_entry_default() || !self.has_new_input || !self.is_entry_finite() {
            return;
        }

        if count_digits(&self.entry) == 1 {
            self.reset_entry();
            return;
        }

        let shortened = remove_last_symbol(&self.entry).len();
        self.entry.truncate(shortened);
    }

    pub fn toggle_sign(&mut self) {
        if self.is_entry_default() || self.is_error() {
            return;
        }

        self.has_new_input = true;

        let value = match eval::eval(&self.entry) {
            Ok(value) => value,
            Err(err) => return self.set_error(err),
        };
        let zero = BigDecimal::zero();
        let negative = self.entry.starts_with(MINUS);
        let zero_with_separator = value == zero && self.entry.contains(DECIMAL_SEPARATOR);

        if value > zero || (zero_with_separator && !negative) {
            self.entry.insert(0, MINUS);
        } else if value < zero || (zero_with_separator && negative) {
            self.entry.remove(0);
        }
    }

    /// Clears the entry and leaves any pending computation in place.
    pub fn clear_entry(&mut self) {
        if self.is_error() {
            debug!("leaving error state");
        }
        self.reset_entry();
        self.has_new_input = false;
        self.repeat_operand = None;
    }

    pub fn clear_all(&mut self) {
        if self.is_error() {
            debug!("leaving error state");
        }
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(calculator: &mut Calculator, keys: &str) {
        for key in keys.chars() {
            let action = match key {
                '0'..='9' | '.' => Action::Append(key),
                '+' => Action::Binary(BinaryKey::Operator(BinaryOperator::Add)),
                '-' => Action::Binary(BinaryKey::Operator(BinaryOperator::Subtract)),
                '*' => Action::Binary(BinaryKey::Operator(BinaryOperator::Multiply)),
                '/' => Action::Binary(BinaryKey::Operator(BinaryOperator::Divide)),
                '=' => Action::Binary(BinaryKey::Equals),
                'n' => Action::ToggleSign,
                '<' => Action::Backspace,
                ' ' => continue,
                other => panic!("no test key for {:?}", other),
            };
            calculator.dispatch(action);
        }
    }

    fn calculator_after(keys: &str) -> Calculator {
        let mut calculator = Calculator::new();
        press(&mut calculator, keys);
        calculator
    }

    #[test]
    fn starts_at_default() {
        let calculator = Calculator::new();
        assert_eq!("0", calculator.entry());
        assert_eq!("0", calculator.display());
        assert!(!calculator.is_error());
        assert_eq!(None, calculator.pending_operator());
        assert_eq!(None, calculator.pending_left());
    }

    #[test]
    fn typing_fifteen_digits_then_rejecting_more() {
        let digits = "123456789012345";
        let mut calculator = calculator_after(digits);
        assert_eq!(digits, calculator.entry());
        press(&mut calculator, "6");
        assert_eq!(digits, calculator.entry());
        assert_eq!("123,456,789,012,345", calculator.display());
    }

    #[test]
    fn every_prefix_of_a_digit_sequence_is_shown() {
        let digits = "987654321098765";
        let mut calculator = Calculator::new();
        for end in 1..=digits.len() {
            press(&mut calculator, &digits[end - 1..end]);
            assert_eq!(&digits[..end], calculator.entry());
        }
    }

    #[test]
    fn leading_zero_is_replaced() {
        assert_eq!("7", calculator_after("007").entry());
    }

    #[test]
    fn decimal_separator_appends_to_default() {
        assert_eq!("0.5", calculator_after(".5").entry());
    }

    #[test]
    fn second_decimal_separator_is_rejected() {
        assert_eq!("1.25", calculator_after("1.2.5").entry());
    }

    #[test]
    fn decimal_separator_does_not_count_against_digit_budget() {
        let calculator = calculator_after("12345678901234.5");
        assert_eq!("12345678901234.5", calculator.entry());
    }

    #[test]
    fn simple_addition() {
        let calculator = calculator_after("3+4=");
        assert_eq!("7", calculator.entry());
        assert_eq!(Some("7"), calculator.pending_left());
        assert_eq!(Some(BinaryOperator::Add), calculator.pending_operator());
        assert!(!calculator.has_new_input());
    }

    #[test]
    fn first_operator_captures_left_operand_without_evaluating() {
        let calculator = calculator_after("12*");
        assert_eq!("12", calculator.entry());
        assert_eq!(Some("12"), calculator.pending_left());
        assert_eq!(Some(BinaryOperator::Multiply), calculator.pending_operator());
        assert!(!calculator.has_new_input());
    }

    #[test]
    fn captured_left_operand_is_normalized() {
        assert_eq!(Some("5"), calculator_after("5.+").pending_left());
    }

    #[test]
    fn repeated_operator_substitutes() {
        let mut calculator = calculator_after("3+");
        press(&mut calculator, "+");
        assert_eq!("3", calculator.entry());
        assert_eq!(Some("3"), calculator.pending_left());
        assert_eq!(Some(BinaryOperator::Add), calculator.pending_operator());

        press(&mut calculator, "*");
        assert_eq!("3", calculator.entry());
        assert_eq!(Some(BinaryOperator::Multiply), calculator.pending_operator());

        press(&mut calculator, "5=");
        assert_eq!("15", calculator.entry());
    }

    #[test]
    fn operator_chains_evaluate_left_to_right() {
        let calculator = calculator_after("2+3*4=");
        assert_eq!("20", calculator.entry());
    }

    #[test]
    fn operator_after_operand_commits_and_continues() {
        let calculator = calculator_after("8-3*");
        assert_eq!("5", calculator.entry());
        assert_eq!(Some("5"), calculator.pending_left());
        assert_eq!(Some(BinaryOperator::Multiply), calculator.pending_operator());
    }

    #[test]
    fn repeated_equals_repeats_last_operation() {
        let mut calculator = calculator_after("3+4==");
        assert_eq!("11", calculator.entry());
        press(&mut calculator, "=");
        assert_eq!("15", calculator.entry());
    }

    #[test]
    fn equals_without_right_operand_reuses_entry() {
        let calculator = calculator_after("3+=");
        assert_eq!("6", calculator.entry());
    }

    #[test]
    fn equals_with_nothing_pending_is_noop() {
        let before = calculator_after("42");
        let mut after = before.clone();
        press(&mut after, "=");
        assert_eq!(before, after);
    }

    #[test]
    fn new_number_after_result_starts_clean() {
        let mut calculator = calculator_after("3+4=");
        press(&mut calculator, "9");
        assert_eq!("9", calculator.entry());
        press(&mut calculator, "=");
        assert_eq!("16", calculator.entry());
    }

    #[test]
    fn division_by_zero_enters_error_state() {
        let mut calculator = calculator_after("5/0=");
        assert!(calculator.is_error());
        assert!(calculator.controls_disabled());
        assert_eq!(ERROR_MESSAGE, calculator.entry());
        assert_eq!(ERROR_MESSAGE, calculator.display());

        press(&mut calculator, "1");
        assert_eq!(ERROR_MESSAGE, calculator.entry());

        calculator.clear_all();
        assert_eq!("0", calculator.entry());
        assert!(!calculator.is_error());
        assert_eq!(Calculator::new(), calculator);
    }

    #[test]
    fn error_state_blocks_everything_but_clear() {
        let mut calculator = calculator_after("5/0=");
        let snapshot = calculator.clone();
        press(&mut calculator, "+=n<");
        calculator.apply_unary(UnaryOperation::Square);
        assert_eq!(snapshot, calculator);

        assert!(!calculator.is_enabled(Action::Append('1')));
        assert!(!calculator.is_enabled(Action::Binary(BinaryKey::Equals)));
        assert!(calculator.is_enabled(Action::ClearEntry));
        assert!(calculator.is_enabled(Action::ClearAll));
    }

    #[test]
    fn clear_entry_leaves_error_state_and_keeps_pending() {
        let mut calculator = calculator_after("5/0=");
        calculator.clear_entry();
        assert!(!calculator.is_error());
        assert_eq!("0", calculator.entry());
        assert_eq!(Some("5"), calculator.pending_left());
        assert_eq!(Some(BinaryOperator::Divide), calculator.pending_operator());

        press(&mut calculator, "2=");
        assert_eq!("2.5", calculator.entry());
    }

    #[test]
    fn clear_entry_is_idempotent() {
        let mut once = calculator_after("12+34");
        once.clear_entry();
        let mut twice = once.clone();
        twice.clear_entry();
        assert_eq!(once, twice);
        assert_eq!("0", twice.entry());
        assert_eq!(Some("12"), twice.pending_left());
    }

    #[test]
    fn toggle_sign() {
        let mut calculator = Calculator::new();
        calculator.toggle_sign();
        assert_eq!(Calculator::new(), calculator);

        assert_eq!("-0.", calculator_after("0.n").entry());
        assert_eq!("0.", calculator_after("0.nn").entry());
        assert_eq!("-5", calculator_after("5n").entry());
        assert_eq!("5", calculator_after("5nn").entry());
        assert_eq!("-0.5", calculator_after(".n5").entry());
    }

    #[test]
    fn toggle_sign_on_result_continues_entry() {
        let mut calculator = calculator_after("3+4=n");
        assert_eq!("-7", calculator.entry());
        assert!(calculator.has_new_input());
        press(&mut calculator, "1");
        assert_eq!("-71", calculator.entry());
    }

    #[test]
    fn backspace() {
        assert_eq!("12", calculator_after("123<").entry());
        assert_eq!("0", calculator_after("5<").entry());
        assert_eq!("0", calculator_after("5n<").entry());
        assert_eq!("0", calculator_after("1.<").entry());
        assert_eq!("12", calculator_after("12.<").entry());
        assert_eq!("0", calculator_after("<").entry());
    }

    #[test]
    fn backspace_does_not_edit_results() {
        let calculator = calculator_after("12+34=<");
        assert_eq!("46", calculator.entry());
    }

    #[test]
    fn square_root_of_negative_keeps_pending_chain() {
        let mut calculator = calculator_after("2+1n");
        calculator.apply_unary(UnaryOperation::SquareRoot);
        assert!(calculator.is_error());
        assert_eq!(Some("2"), calculator.pending_left());
        assert_eq!(Some(BinaryOperator::Add), calculator.pending_operator());
    }

    #[test]
    fn unary_mid_chain() {
        let mut calculator = calculator_after("10+9");
        calculator.apply_unary(UnaryOperation::SquareRoot);
        assert_eq!("3", calculator.entry());
        assert!(calculator.has_new_input());
        press(&mut calculator, "=");
        assert_eq!("13", calculator.entry());
    }

    #[test]
    fn unary_operations() {
        let mut calculator = calculator_after("3");
        calculator.apply_unary(UnaryOperation::Reciprocal);
        assert_eq!("0.333333333333333", calculator.entry());

        let mut calculator = calculator_after("12");
        calculator.apply_unary(UnaryOperation::Square);
        assert_eq!("144", calculator.entry());
        calculator.apply_unary(UnaryOperation::Cube);
        assert_eq!("2985984", calculator.entry());
        assert_eq!("2,985,984", calculator.display());
    }

    #[test]
    fn reciprocal_of_zero_is_error() {
        let mut calculator = calculator_after("0.");
        calculator.apply_unary(UnaryOperation::Reciprocal);
        assert!(calculator.is_error());
    }

    #[test]
    fn equals_after_unary_uses_displayed_entry() {
        let mut calculator = calculator_after("3+4=");
        calculator.apply_unary(UnaryOperation::Square);
        assert_eq!("49", calculator.entry());
        press(&mut calculator, "=");
        assert_eq!("56", calculator.entry());
        press(&mut calculator, "=");
        assert_eq!("105", calculator.entry());
    }

    #[test]
    fn equals_after_clear_entry_uses_displayed_entry() {
        let mut calculator = calculator_after("3+4=");
        calculator.clear_entry();
        press(&mut calculator, "=");
        assert_eq!("7", calculator.entry());
    }

    #[test]
    fn toggle_sign_keeps_negative_exponent() {
        let mut calculator = calculator_after("3");
        calculator.apply_unary(UnaryOperation::Reciprocal);
        for _ in 0..6 {
            calculator.apply_unary(UnaryOperation::Square);
        }
        let magnitude = calculator.entry().to_string();
        assert!(magnitude.contains("e-"), "{}", magnitude);

        calculator.toggle_sign();
        assert_eq!(format!("-{}", magnitude), calculator.entry());
        calculator.toggle_sign();
        assert_eq!(magnitude, calculator.entry());
    }

    #[test]
    fn repeated_squaring_ends_in_error() {
        let mut calculator = calculator_after("10");
        let mut squares = 0;
        while !calculator.is_error() {
            assert!(squares < 20, "no overflow after {} squares", squares);
            calculator.apply_unary(UnaryOperation::Square);
            squares += 1;
        }
        assert_eq!(9, squares);
        assert_eq!(ERROR_MESSAGE, calculator.display());

        calculator.clear_all();
        press(&mut calculator, "10");
        for _ in 0..8 {
            calculator.apply_unary(UnaryOperation::Square);
        }
        assert_eq!("1e+256", calculator.entry());
    }

    #[test]
    fn digit_budget_applies_to_typed_entry_after_result() {
        let mut calculator = calculator_after("1/3=");
        assert_eq!("0.333333333333333", calculator.entry());
        press(&mut calculator, "1234567890123456");
        assert_eq!("123456789012345", calculator.entry());
    }

    #[test]
    fn large_results_use_scientific_notation() {
        let mut calculator = calculator_after("100000000*100000000=");
        assert_eq!("1e+16", calculator.entry());
        press(&mut calculator, "*2=");
        assert_eq!("2e+16", calculator.entry());
    }
}
