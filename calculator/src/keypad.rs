/*
 * Copyright (c) 2022-2023, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

//! The keypad state machine.
//!
//! [`State`] is a plain value. [`State::reduce`] consumes it together with
//! one [`Action`] and returns the next state without any side effects;
//! persistence and rate fetching happen outside (see [`crate::Calculator`]).

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum::EnumIter;
use tracing::debug;

use crate::common::*;
use crate::engine::{evaluate, Operator};
use crate::environment::currencies::Currencies;
use crate::environment::functions::{AngleMode, Constant, ScientificFunction};
use crate::environment::units::{convert, Category};
use crate::settings::ParseOptionError;

/// Maximum number of history entries, newest first
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(ParseOptionError(&["light", "dark"])),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIter, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Scientific,
    Converter,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Scientific => write!(f, "scientific"),
            Self::Converter => write!(f, "converter"),
        }
    }
}

impl FromStr for Mode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "scientific" | "sci" => Ok(Self::Scientific),
            "converter" | "conv" => Ok(Self::Converter),
            _ => Err(ParseOptionError(&["normal", "scientific", "converter"])),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Accumulating,
    OperatorPending,
    ResultDisplayed,
    /// Absorbing until a digit is entered or the keypad is cleared
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    Clear,
    Recall,
    Add,
    Subtract,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `'0'..='9'` or `'.'`
    Digit(char),
    Operator(Operator),
    Equals,
    AllClear,
    ClearEntry,
    Backspace,
    ToggleSign,
    Percent,
    Memory(MemoryOp),
    Constant(Constant),
    Function(ScientificFunction),
    ToggleShift,
    ToggleAngleMode,
    SetMode(Mode),
    ToggleTheme,
    ClearHistory,
    /// Reuses the result of the history entry at this index
    RecallHistory(usize),
    ConverterDigit(char),
    ConverterClear,
    ConverterBackspace,
    SetCategory(Category),
    SetFromUnit(String),
    SetToUnit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConverterState {
    pub category: Category,
    pub from_unit: String,
    pub to_unit: String,
    pub input: String,
}

impl ConverterState {
    pub fn new(category: Category) -> ConverterState {
        let (from_unit, to_unit) = category.default_units();
        ConverterState {
            category,
            from_unit: from_unit.to_owned(),
            to_unit: to_unit.to_owned(),
            input: "1".to_owned(),
        }
    }

    /// The converted input, or `None` while the input is incomplete (e.g. `"3."`)
    pub fn output(&self, currencies: &Currencies) -> Result<Option<String>> {
        let input = &self.input;
        if input.is_empty() || input.ends_with('.') { return Ok(None); }
        let Ok(amount) = parse_operand(input) else { return Ok(None); };
        if self.from_unit == self.to_unit { return Ok(Some(input.clone())); }

        let result = convert(self.category, &self.from_unit, &self.to_unit, amount, currencies)?;
        Ok(Some(format_number(result)))
    }
}

impl Default for ConverterState {
    fn default() -> Self { ConverterState::new(Category::default()) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub current_operand: String,
    pub previous_operand: Option<String>,
    pub operator: Option<Operator>,
    /// The next digit replaces the current operand instead of appending to it
    pub overwrite: bool,
    pub phase: Phase,
    pub error: Option<ErrorType>,
    pub history: Vec<String>,
    pub memory: f64,
    pub shift: bool,
    pub angle_mode: AngleMode,
    pub mode: Mode,
    pub theme: Theme,
    pub converter: ConverterState,
}

impl Default for State {
    fn default() -> Self {
        State {
            current_operand: "0".to_owned(),
            previous_operand: None,
            operator: None,
            overwrite: true,
            phase: Phase::Idle,
            error: None,
            history: Vec::new(),
            memory: 0.0,
            shift: false,
            angle_mode: AngleMode::default(),
            mode: Mode::default(),
            theme: Theme::default(),
            converter: ConverterState::default(),
        }
    }
}

/// The operand, digit-appending rules shared by the calculator and converter keypads
fn append_digit(operand: &str, digit: char) -> Option<String> {
    if digit == '.' && operand.contains('.') { return None; }
    if operand == "0" && digit != '.' { return Some(digit.to_string()); }

    let mut operand = operand.to_owned();
    operand.push(digit);
    operand.truncate(MAX_OPERAND_LEN);
    Some(operand)
}

fn fresh_operand(digit: char) -> String {
    if digit == '.' { "0.".to_owned() } else { digit.to_string() }
}

fn is_digit(c: char) -> bool { c.is_ascii_digit() || c == '.' }

impl State {
    pub fn is_error(&self) -> bool { self.error.is_some() }

    /// The text shown in the main display: the error message or the current operand
    pub fn display_value(&self) -> String {
        match &self.error {
            Some(e) => e.to_string(),
            None => self.current_operand.clone(),
        }
    }

    /// The pending operation line above the display, e.g. `"12 +"`
    pub fn display_operation(&self) -> String {
        let previous = self.previous_operand.as_deref().unwrap_or("");
        let operator = self.operator.map(|op| op.to_string()).unwrap_or_default();
        format!("{previous} {operator}").trim().to_owned()
    }

    pub fn reduce(self, action: &Action) -> State {
        debug!(?action, "reduce");
        match action {
            Action::Digit(c) => self.digit(*c),
            Action::Operator(op) => self.operator(*op),
            Action::Equals => self.equals(),
            Action::AllClear => self.all_clear(),
            Action::ClearEntry => self.clear_entry(),
            Action::Backspace => self.backspace(),
            Action::ToggleSign => self.map_operand(|n| n * -1.0),
            Action::Percent => self.map_operand(|n| n / 100.0),
            Action::Memory(op) => self.memory(*op),
            Action::Constant(constant) => self.constant(*constant),
            Action::Function(f) => self.function(*f),
            Action::ToggleShift => State { shift: !self.shift, ..self },
            Action::ToggleAngleMode => State { angle_mode: self.angle_mode.toggled(), ..self },
            Action::SetMode(mode) => State { mode: *mode, ..self },
            Action::ToggleTheme => State { theme: self.theme.toggled(), ..self },
            Action::ClearHistory => State { history: Vec::new(), ..self },
            Action::RecallHistory(index) => self.recall_history(*index),
            Action::ConverterDigit(c) => self.converter_digit(*c),
            Action::ConverterClear => self.with_converter_input("0".to_owned()),
            Action::ConverterBackspace => self.converter_backspace(),
            Action::SetCategory(category) => State { converter: ConverterState::new(*category), ..self },
            Action::SetFromUnit(unit) => self.set_unit(unit, true),
            Action::SetToUnit(unit) => self.set_unit(unit, false),
        }
    }

    fn fail(self, error: ErrorType) -> State {
        debug!("keypad error: {error}");
        State {
            error: Some(error),
            overwrite: true,
            phase: Phase::Error,
            ..self
        }
    }

    /// The phase to return to when the operand is reset without computing anything
    fn resting_phase(&self) -> Phase {
        if self.operator.is_some() { Phase::OperatorPending } else { Phase::Idle }
    }

    fn digit(self, c: char) -> State {
        if !is_digit(c) { return self; }

        if self.is_error() || self.overwrite {
            return State {
                current_operand: fresh_operand(c),
                error: None,
                overwrite: false,
                phase: Phase::Accumulating,
                ..self
            };
        }

        match append_digit(&self.current_operand, c) {
            Some(current_operand) => State { current_operand, phase: Phase::Accumulating, ..self },
            None => self,
        }
    }

    fn operator(self, op: Operator) -> State {
        if self.is_error() { return self; }

        let (current_operand, previous_operand) = if self.previous_operand.is_some() && !self.overwrite {
            match evaluate(self.previous_operand.as_deref(), self.operator, &self.current_operand) {
                Ok(result) => (result.clone(), result),
                Err(e) => return self.fail(e),
            }
        } else {
            (self.current_operand.clone(), self.current_operand.clone())
        };

        State {
            current_operand,
            previous_operand: Some(previous_operand),
            operator: Some(op),
            overwrite: true,
            phase: Phase::OperatorPending,
            ..self
        }
    }

    fn equals(self) -> State {
        if self.is_error() { return self; }
        let (Some(previous), Some(operator)) = (&self.previous_operand, self.operator) else { return self; };

        let result = match evaluate(Some(previous.as_str()), Some(operator), &self.current_operand) {
            Ok(result) => result,
            Err(e) => return self.fail(e),
        };

        let entry = format!("{previous} {operator} {} = {result}", self.current_operand);
        let mut history = Vec::with_capacity(HISTORY_LIMIT);
        history.push(entry);
        history.extend(self.history.iter().take(HISTORY_LIMIT - 1).cloned());

        State {
            current_operand: result,
            previous_operand: None,
            operator: None,
            overwrite: true,
            phase: Phase::ResultDisplayed,
            history,
            ..self
        }
    }

    fn all_clear(self) -> State {
        State {
            current_operand: "0".to_owned(),
            previous_operand: None,
            operator: None,
            overwrite: true,
            phase: Phase::Idle,
            error: None,
            ..self
        }
    }

    fn clear_entry(self) -> State {
        State {
            current_operand: "0".to_owned(),
            overwrite: true,
            phase: self.resting_phase(),
            error: None,
            ..self
        }
    }

    fn backspace(self) -> State {
        if self.is_error() || self.overwrite { return self.all_clear(); }

        let mut operand = self.current_operand.clone();
        operand.pop();
        if operand.is_empty() || operand == "-" {
            return State {
                current_operand: "0".to_owned(),
                overwrite: true,
                phase: self.resting_phase(),
                ..self
            };
        }

        State { current_operand: operand, ..self }
    }

    fn map_operand(self, f: impl Fn(f64) -> f64) -> State {
        if self.is_error() { return self; }

        match parse_operand(&self.current_operand) {
            Ok(n) => State { current_operand: format_number(f(n)), ..self },
            Err(e) => self.fail(e),
        }
    }

    fn memory(self, op: MemoryOp) -> State {
        if self.is_error() { return self; }

        match op {
            MemoryOp::Clear => State { memory: 0.0, ..self },
            MemoryOp::Recall => State {
                current_operand: format_number(self.memory),
                overwrite: true,
                phase: Phase::ResultDisplayed,
                ..self
            },
            MemoryOp::Add | MemoryOp::Subtract => {
                let value = match parse_operand(&self.current_operand) {
                    Ok(value) => value,
                    Err(e) => return self.fail(e),
                };
                let memory = if op == MemoryOp::Add { self.memory + value } else { self.memory - value };
                if !memory.is_finite() { return self.fail(ErrorType::CalculationError); }

                State {
                    memory,
                    overwrite: true,
                    phase: Phase::ResultDisplayed,
                    ..self
                }
            }
        }
    }

    fn constant(self, constant: Constant) -> State {
        State {
            current_operand: format_number(constant.value()),
            error: None,
            overwrite: true,
            phase: Phase::ResultDisplayed,
            ..self
        }
    }

    fn function(self, f: ScientificFunction) -> State {
        if self.is_error() { return self; }

        let result = parse_operand(&self.current_operand)
            .and_then(|value| f.apply(value, self.angle_mode));

        match result {
            Ok(result) => State {
                current_operand: format_number(result),
                overwrite: true,
                phase: Phase::ResultDisplayed,
                ..self
            },
            Err(e) => self.fail(e),
        }
    }

    fn recall_history(self, index: usize) -> State {
        let Some(entry) = self.history.get(index) else { return self; };
        let result = entry.rsplit('=').next().unwrap_or_default().trim();
        if result.is_empty() || result == "Error" { return self; }

        State {
            current_operand: result.to_owned(),
            error: None,
            overwrite: true,
            phase: Phase::ResultDisplayed,
            ..self
        }
    }

    fn with_converter_input(self, input: String) -> State {
        State {
            converter: ConverterState { input, ..self.converter },
            ..self
        }
    }

    fn converter_digit(self, c: char) -> State {
        if !is_digit(c) || self.converter.input.len() >= MAX_OPERAND_LEN { return self; }

        match append_digit(&self.converter.input, c) {
            Some(input) => self.with_converter_input(input),
            None => self,
        }
    }

    fn converter_backspace(self) -> State {
        let mut input = self.converter.input.clone();
        input.pop();
        if input.is_empty() { input.push('0'); }
        self.with_converter_input(input)
    }

    fn set_unit(self, unit: &str, from: bool) -> State {
        if !self.converter.category.contains(unit) {
            debug!("ignoring unknown {} unit {unit}", self.converter.category);
            return self;
        }

        let mut converter = self.converter.clone();
        if from { converter.from_unit = unit.to_owned(); } else { converter.to_unit = unit.to_owned(); }
        State { converter, ..self }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn press(state: State, keys: &str) -> State {
        keys.split_whitespace().fold(state, |state, key| {
            let action = match key {
                "=" => Action::Equals,
                "ac" => Action::AllClear,
                "ce" => Action::ClearEntry,
                "del" => Action::Backspace,
                "neg" => Action::ToggleSign,
                "%" => Action::Percent,
                "mc" => Action::Memory(MemoryOp::Clear),
                "mr" => Action::Memory(MemoryOp::Recall),
                "m+" => Action::Memory(MemoryOp::Add),
                "m-" => Action::Memory(MemoryOp::Subtract),
                "pi" => Action::Constant(Constant::Pi),
                "2nd" => Action::ToggleShift,
                "angle" => Action::ToggleAngleMode,
                key => match (key.parse::<Operator>(), key.parse::<ScientificFunction>()) {
                    (Ok(op), _) => Action::Operator(op),
                    (_, Ok(f)) => Action::Function(f),
                    _ => {
                        let mut state = state;
                        for c in key.chars() { state = state.reduce(&Action::Digit(c)); }
                        return state;
                    }
                },
            };
            state.reduce(&action)
        })
    }

    macro_rules! expect {
        ($keys:expr, $display:expr) => {
            assert_eq!(press(State::default(), $keys).display_value(), $display)
        };
    }

    #[test]
    fn digit_entry() {
        expect!("1 2 3", "123");
        expect!("0 0 7", "7");
        expect!(". 5", "0.5");
        expect!("1 . . 5", "1.5");
        expect!("1234567890 1234567890", "1234567890123456");
    }

    #[test]
    fn arithmetic() {
        expect!("10 / 4 =", "2.5");
        expect!("0.1 + 0.2 =", "0.3");
        expect!("2 + 3 * 4 =", "20");
        expect!("7 - 10 =", "-3");
    }

    #[test]
    fn chained_operator_shows_intermediate_result() {
        let state = press(State::default(), "2 + 3 *");
        assert_eq!(state.current_operand, "5");
        assert_eq!(state.display_operation(), "5 *");
        assert_eq!(state.phase, Phase::OperatorPending);
    }

    #[test]
    fn changing_the_operator() {
        let state = press(State::default(), "6 + -");
        assert_eq!(state.operator, Some(Operator::Minus));
        assert_eq!(press(state, "2 =").display_value(), "4");
    }

    #[test]
    fn equals_without_operator_does_nothing() {
        let state = press(State::default(), "42");
        assert_eq!(state.clone().reduce(&Action::Equals), state);
    }

    #[test]
    fn divide_by_zero_is_absorbing() {
        let state = press(State::default(), "5 / 0 =");
        assert_eq!(state.phase, Phase::Error);
        assert_eq!(state.display_value(), "Cannot divide by zero");

        let unchanged = press(state.clone(), "+ = neg % m+ sqrt");
        assert_eq!(unchanged, state);

        let recovered = press(state, "7");
        assert_eq!(recovered.error, None);
        assert_eq!(recovered.display_value(), "7");
        assert_eq!(recovered.phase, Phase::Accumulating);
    }

    #[test]
    fn error_from_chained_operator() {
        let state = press(State::default(), "1 / 0 +");
        assert_eq!(state.error, Some(ErrorType::DivideByZero));
        assert_eq!(press(state, "ac").phase, Phase::Idle);
    }

    #[test]
    fn backspace() {
        expect!("1 2 3 del", "12");
        expect!("5 del", "0");
        expect!("5 neg del", "0");
        // after a result, backspace clears everything
        let state = press(State::default(), "2 + 2 = del");
        assert_eq!(state, State { history: state.history.clone(), ..State::default() });
    }

    #[test]
    fn clear_entry_keeps_pending_operation() {
        let state = press(State::default(), "8 * 3 ce");
        assert_eq!(state.current_operand, "0");
        assert_eq!(state.display_operation(), "8 *");
        assert_eq!(press(state, "2 =").display_value(), "16");
    }

    #[test]
    fn sign_and_percent() {
        expect!("5 neg", "-5");
        expect!("0 neg", "0");
        expect!("50 %", "0.5");
    }

    #[test]
    fn memory() {
        let state = press(State::default(), "5 m+ 3 m- 10 m+");
        assert_eq!(state.memory, 12.0);
        let state = press(state, "ac mr");
        assert_eq!(state.display_value(), "12");
        assert_eq!(press(state, "mc").memory, 0.0);
    }

    #[test]
    fn memory_rejects_non_numeric_operand() {
        // -1e-7 shown in exponent form, then cut to "-1e-"
        let state = press(State::default(), "5 m+ 0.0000001 neg del");
        assert_eq!(state.current_operand, "-1e-");

        for key in ["m+", "m-"] {
            let failed = press(state.clone(), key);
            assert_eq!(failed.error, Some(ErrorType::InvalidInput));
            assert_eq!(failed.phase, Phase::Error);
            assert_eq!(failed.memory, 5.0);

            let recovered = press(failed, "4");
            assert_eq!(recovered.error, None);
            assert_eq!(recovered.display_value(), "4");
            assert_eq!(recovered.phase, Phase::Accumulating);
        }
    }

    #[test]
    fn mode_names() {
        for mode in Mode::iter() {
            assert_eq!(mode.to_string().parse::<Mode>(), Ok(mode));
        }
        assert_eq!(Mode::Scientific.to_string(), "scientific");
        assert_eq!("conv".parse::<Mode>(), Ok(Mode::Converter));
    }

    #[test]
    fn scientific_functions() {
        expect!("90 sin", "1");
        expect!("angle 0 cos", "1");
        expect!("5 factorial", "120");
        expect!("2.5 factorial", "Invalid input for factorial");
        expect!("4 neg sqrt", "Invalid input for sqrt");
        expect!("1 asin", "90");
    }

    #[test]
    fn function_result_is_overwritten_by_digits() {
        let state = press(State::default(), "9 sqrt");
        assert_eq!(state.phase, Phase::ResultDisplayed);
        assert_eq!(press(state, "4").display_value(), "4");
    }

    #[test]
    fn constants_clear_errors() {
        let state = press(State::default(), "1 / 0 = pi");
        assert_eq!(state.error, None);
        assert_eq!(state.display_value(), "3.141592653589793");
    }

    #[test]
    fn mode_toggles_work_in_error_state() {
        let state = press(State::default(), "1 / 0 = 2nd angle");
        assert!(state.shift);
        assert_eq!(state.angle_mode, AngleMode::Rad);
        assert!(state.is_error());
    }

    #[test]
    fn history_is_newest_first_and_bounded() {
        let mut state = State::default();
        for i in 1..=HISTORY_LIMIT + 1 {
            state = press(state, &format!("{i} + 1 ="));
        }

        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(state.history[0], "21 + 1 = 22");
        assert_eq!(state.history[HISTORY_LIMIT - 1], "2 + 1 = 3");
        assert!(!state.history.contains(&"1 + 1 = 2".to_owned()));
    }

    #[test]
    fn history_recall() {
        let state = press(State::default(), "10 / 4 = ac");
        let state = state.reduce(&Action::RecallHistory(0));
        assert_eq!(state.display_value(), "2.5");
        assert!(state.overwrite);

        // out of range indices are ignored
        assert_eq!(state.clone().reduce(&Action::RecallHistory(3)), state);
        assert!(state.reduce(&Action::ClearHistory).history.is_empty());
    }

    #[test]
    fn history_recall_ignores_error_entries() {
        let state = State { history: vec!["1 / 0 = Error".to_owned()], ..State::default() };
        assert_eq!(state.clone().reduce(&Action::RecallHistory(0)), state);
    }

    #[test]
    fn converter_keypad() {
        let state = State::default().reduce(&Action::SetCategory(Category::Length));
        assert_eq!(state.converter.from_unit, "Meter");
        assert_eq!(state.converter.to_unit, "Kilometer");
        assert_eq!(state.converter.input, "1");

        let state = [Action::ConverterDigit('2'), Action::ConverterDigit('.'), Action::ConverterDigit('.')]
            .iter()
            .fold(state, |state, action| state.reduce(action));
        assert_eq!(state.converter.input, "12.");

        let state = state.reduce(&Action::ConverterBackspace).reduce(&Action::ConverterBackspace);
        assert_eq!(state.converter.input, "1");
        let state = state.reduce(&Action::ConverterBackspace);
        assert_eq!(state.converter.input, "0");
        let state = state.reduce(&Action::ConverterDigit('7'));
        assert_eq!(state.converter.input, "7");
    }

    #[test]
    fn converter_input_is_bounded() {
        let state = (0..20).fold(State::default(), |state, _| state.reduce(&Action::ConverterDigit('9')));
        assert_eq!(state.converter.input.len(), MAX_OPERAND_LEN);
    }

    #[test]
    fn converter_output() -> Result<()> {
        let currencies = Currencies::none();
        let state = State::default()
            .reduce(&Action::SetCategory(Category::Temperature))
            .reduce(&Action::ConverterClear)
            .reduce(&Action::SetToUnit("Kelvin".to_owned()));
        assert_eq!(state.converter.output(&currencies)?, Some("273.15".to_owned()));

        let pending = state.clone().reduce(&Action::ConverterDigit('.'));
        assert_eq!(pending.converter.output(&currencies)?, None);

        let same = state.reduce(&Action::SetToUnit("Celsius".to_owned()));
        assert_eq!(same.converter.output(&currencies)?, Some("0".to_owned()));
        Ok(())
    }

    #[test]
    fn unknown_units_are_ignored() {
        let state = State::default();
        assert_eq!(state.clone().reduce(&Action::SetFromUnit("Parsec".to_owned())), state);
    }

    #[test]
    fn currency_defaults() -> Result<()> {
        let state = State::default();
        assert_eq!(state.converter.category, Category::Currency);
        assert_eq!(state.converter.output(&Currencies::none())?, Some("0.93".to_owned()));
        Ok(())
    }
}
