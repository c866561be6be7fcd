//! Arithmetic evaluator state machine.
//!
//! Models a pocket-calculator entry flow: digits accumulate into a display
//! string, selecting an operator latches the current value as the pending
//! left operand, and evaluation applies `pending OP accumulator`. Chained
//! operators resolve left to right. Unary scientific functions replace the
//! accumulator in place and, like completed binary operations, append to a
//! bounded history log.
//!
//! Domain violations (divide by zero, log/sqrt of invalid input, non-integer
//! factorial) surface as a transient error display that reverts to a zeroed
//! accumulator after [`ERROR_CLEAR_MS`]; the evaluator itself stays usable.
//! All time-dependent behavior takes an injected `now` so hosts drive the
//! clock and tests stay deterministic.

use crate::error::{EvalError, Result};
use crate::schedule::Delayed;
use crate::types::{Constant, Function, HistoryEntry, Operator};
use chrono::{DateTime, Duration, Utc};

/// Maximum number of retained history entries, newest first.
pub const HISTORY_LIMIT: usize = 20;

/// How long a domain error stays on the display before the accumulator
/// reverts to "0", in milliseconds.
pub const ERROR_CLEAR_MS: i64 = 2000;

/// Decimal precision of rounded results: 8 places.
const ROUND_SCALE: f64 = 1e8;

/// Round to 8 decimal places, half away from zero, with a machine-epsilon
/// bias countering binary floating-point drift. The exact constant matters
/// for output compatibility (it turns sin(30°) into 0.5, not 0.49999999).
pub fn round_result(value: f64) -> f64 {
    ((value + f64::EPSILON) * ROUND_SCALE).round() / ROUND_SCALE
}

fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// Left operand latched together with its operator. Holding both in one
/// option keeps the "operator set implies pending parses" invariant
/// structural.
#[derive(Debug, Clone)]
struct PendingOp {
    text: String,
    value: f64,
    op: Operator,
}

/// Calculator state machine.
#[derive(Debug)]
pub struct Evaluator {
    accumulator: String,
    pending: Option<PendingOp>,
    awaiting_fresh_input: bool,
    history: Vec<HistoryEntry>,
    error: Option<EvalError>,
    error_clear: Delayed<()>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            accumulator: "0".to_string(),
            pending: None,
            awaiting_fresh_input: false,
            history: Vec::new(),
            error: None,
            error_clear: Delayed::new(),
        }
    }

    /// The string to render: the transient error message while one is
    /// showing, the accumulator otherwise.
    pub fn display(&self) -> String {
        match &self.error {
            Some(err) => err.to_string(),
            None => self.accumulator.clone(),
        }
    }

    pub fn accumulator(&self) -> &str {
        &self.accumulator
    }

    /// History entries, newest first, at most [`HISTORY_LIMIT`].
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The latched left operand rendered as "5 +", for the secondary display
    /// line. None when no operator is pending.
    pub fn pending_expression(&self) -> Option<String> {
        self.pending
            .as_ref()
            .map(|p| format!("{} {}", p.text, p.op.symbol()))
    }

    /// Append a digit or decimal point to the accumulator.
    ///
    /// A second decimal point is a no-op, a digit typed over a lone leading
    /// zero replaces it, and the first digit after an operator or result
    /// starts a fresh number. Anything other than `0-9` and `.` is ignored
    /// (input gating). Typing dismisses a showing error.
    pub fn input_digit(&mut self, ch: char) {
        if !ch.is_ascii_digit() && ch != '.' {
            return;
        }
        self.dismiss_error();

        if self.awaiting_fresh_input {
            self.accumulator.clear();
            self.awaiting_fresh_input = false;
        }

        if ch == '.' {
            if self.accumulator.contains('.') {
                return;
            }
            if self.accumulator.is_empty() {
                // "0." keeps the accumulator parseable at every step.
                self.accumulator.push('0');
            }
            self.accumulator.push(ch);
            return;
        }

        if self.accumulator == "0" {
            self.accumulator.clear();
        }
        self.accumulator.push(ch);
    }

    /// Latch the accumulator as the pending left operand for `op`.
    ///
    /// If an operator is already pending and the right operand has been
    /// entered, the pending computation resolves first (left-to-right
    /// chaining). A failing resolution leaves state untouched and does not
    /// record the new operator.
    pub fn set_operator(&mut self, op: Operator, now: DateTime<Utc>) -> Result<()> {
        self.dismiss_error();

        if self.pending.is_some() && !self.awaiting_fresh_input {
            self.evaluate(now)?;
        }

        let value = match self.parse_accumulator() {
            Ok(value) => value,
            Err(err) => return Err(self.raise(err, now)),
        };
        self.pending = Some(PendingOp {
            text: self.accumulator.clone(),
            value,
            op,
        });
        self.awaiting_fresh_input = true;
        Ok(())
    }

    /// Apply `pending OP accumulator` and store the rounded result as the
    /// new accumulator. No-op when no operator is pending.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.dismiss_error();
        let Some(pending) = self.pending.clone() else {
            return Ok(());
        };
        let rhs = match self.parse_accumulator() {
            Ok(value) => value,
            Err(err) => return Err(self.raise(err, now)),
        };

        let raw = match pending.op {
            Operator::Add => pending.value + rhs,
            Operator::Subtract => pending.value - rhs,
            Operator::Multiply => pending.value * rhs,
            Operator::Divide => {
                if rhs == 0.0 {
                    return Err(self.raise(EvalError::DivisionByZero, now));
                }
                pending.value / rhs
            }
            Operator::Power => pending.value.powf(rhs),
        };

        let expression = format!(
            "{} {} {}",
            pending.text,
            pending.op.symbol(),
            self.accumulator
        );
        let result = round_result(raw);
        self.push_history(expression, result, now);

        self.accumulator = format_number(result);
        self.pending = None;
        self.awaiting_fresh_input = true;
        Ok(())
    }

    /// Apply a unary scientific function to the accumulator.
    pub fn apply(&mut self, function: Function, now: DateTime<Utc>) -> Result<()> {
        self.dismiss_error();
        let value = match self.parse_accumulator() {
            Ok(value) => value,
            Err(err) => return Err(self.raise(err, now)),
        };
        let shown = format_number(value);

        let (raw, expression) = match function {
            Function::Sin => (value.to_radians().sin(), format!("sin({shown}°)")),
            Function::Cos => (value.to_radians().cos(), format!("cos({shown}°)")),
            Function::Tan => (value.to_radians().tan(), format!("tan({shown}°)")),
            Function::Log => {
                if value <= 0.0 {
                    return Err(self.raise(EvalError::Domain { op: "log", value }, now));
                }
                (value.log10(), format!("log({shown})"))
            }
            Function::Sqrt => {
                if value < 0.0 {
                    return Err(self.raise(EvalError::Domain { op: "sqrt", value }, now));
                }
                (value.sqrt(), format!("√{shown}"))
            }
            Function::Square => (value * value, format!("{shown}²")),
            Function::Cube => (value * value * value, format!("{shown}³")),
            Function::Factorial => {
                if value < 0.0 || value.fract() != 0.0 {
                    return Err(self.raise(EvalError::Domain { op: "factorial", value }, now));
                }
                (factorial(value), format!("{shown}!"))
            }
            Function::Reciprocal => {
                if value == 0.0 {
                    return Err(self.raise(EvalError::DivisionByZero, now));
                }
                (1.0 / value, format!("1/{shown}"))
            }
        };

        let result = round_result(raw);
        self.push_history(expression, result, now);
        self.accumulator = format_number(result);
        self.awaiting_fresh_input = true;
        Ok(())
    }

    /// Replace the accumulator with a mathematical constant.
    pub fn insert_constant(&mut self, constant: Constant, now: DateTime<Utc>) {
        self.dismiss_error();
        let result = round_result(constant.value());
        self.push_history(constant.symbol().to_string(), result, now);
        self.accumulator = format_number(result);
        self.awaiting_fresh_input = true;
    }

    /// Divide the accumulator by 100 in place. Not logged to history.
    pub fn percent(&mut self) -> Result<()> {
        self.dismiss_error();
        let value = self.parse_accumulator()?;
        self.accumulator = format_number(value / 100.0);
        Ok(())
    }

    /// Reset entry state to initial. History is kept.
    pub fn clear(&mut self) {
        self.accumulator = "0".to_string();
        self.pending = None;
        self.awaiting_fresh_input = false;
        self.error = None;
        self.error_clear.cancel();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Remove the last entered character, reverting to "0" when only one
    /// character remains.
    pub fn delete_last(&mut self) {
        self.dismiss_error();
        if self.accumulator.chars().count() <= 1 {
            self.accumulator = "0".to_string();
        } else {
            self.accumulator.pop();
        }
    }

    /// Advance time-driven behavior: fires the error auto-clear once its
    /// delay has elapsed, reverting the accumulator to "0".
    pub fn poll(&mut self, now: DateTime<Utc>) {
        if self.error_clear.take_due(now).is_some() {
            self.error = None;
            self.accumulator = "0".to_string();
            self.awaiting_fresh_input = false;
        }
    }

    fn parse_accumulator(&self) -> Result<f64> {
        self.accumulator
            .parse::<f64>()
            .map_err(|_| EvalError::Parse {
                text: self.accumulator.clone(),
            })
    }

    /// Record a transient error: shown on the display, auto-cleared after
    /// [`ERROR_CLEAR_MS`] milliseconds. The next digit starts a fresh number.
    fn raise(&mut self, error: EvalError, now: DateTime<Utc>) -> EvalError {
        tracing::debug!(%error, "evaluator error");
        self.error = Some(error.clone());
        self.error_clear.arm(now, Duration::milliseconds(ERROR_CLEAR_MS), ());
        self.awaiting_fresh_input = true;
        error
    }

    fn dismiss_error(&mut self) {
        if self.error.take().is_some() {
            self.error_clear.cancel();
        }
    }

    fn push_history(&mut self, expression: String, result: f64, now: DateTime<Utc>) {
        self.history.insert(
            0,
            HistoryEntry {
                expression,
                result,
                timestamp: now,
            },
        );
        self.history.truncate(HISTORY_LIMIT);
    }
}

fn factorial(n: f64) -> f64 {
    let mut result = 1.0;
    let mut i = 2.0;
    while i <= n {
        result *= i;
        // Saturated at 171!; stop before `i + 1.0` loses precision and the
        // counter stalls on inputs >= 2^53.
        if result.is_infinite() {
            break;
        }
        i += 1.0;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn type_str(eval: &mut Evaluator, s: &str) {
        for ch in s.chars() {
            eval.input_digit(ch);
        }
    }

    #[test]
    fn digits_replace_leading_zero() {
        let mut eval = Evaluator::new();
        eval.input_digit('0');
        assert_eq!(eval.accumulator(), "0");
        eval.input_digit('7');
        assert_eq!(eval.accumulator(), "7");
    }

    #[test]
    fn second_decimal_point_is_ignored() {
        let mut eval = Evaluator::new();
        type_str(&mut eval, "1.2.3");
        assert_eq!(eval.accumulator(), "1.23");
        assert!(eval.accumulator().parse::<f64>().is_ok());
    }

    #[test]
    fn leading_decimal_point_stays_parseable() {
        let mut eval = Evaluator::new();
        eval.set_operator(Operator::Add, now()).unwrap();
        eval.input_digit('.');
        eval.input_digit('5');
        assert_eq!(eval.accumulator(), "0.5");
    }

    #[test]
    fn non_digit_input_is_gated() {
        let mut eval = Evaluator::new();
        eval.input_digit('x');
        eval.input_digit('-');
        assert_eq!(eval.accumulator(), "0");
    }

    #[test]
    fn addition_with_drift_rounds_clean() {
        let mut eval = Evaluator::new();
        type_str(&mut eval, "0.1");
        eval.set_operator(Operator::Add, now()).unwrap();
        type_str(&mut eval, "0.2");
        eval.evaluate(now()).unwrap();
        assert_eq!(eval.accumulator(), "0.3");
    }

    #[test]
    fn chained_operators_resolve_left_to_right() {
        // 2 + 3 * 4 resolves as (2 + 3) * 4 = 20.
        let mut eval = Evaluator::new();
        eval.input_digit('2');
        eval.set_operator(Operator::Add, now()).unwrap();
        eval.input_digit('3');
        eval.set_operator(Operator::Multiply, now()).unwrap();
        assert_eq!(eval.accumulator(), "5");
        eval.input_digit('4');
        eval.evaluate(now()).unwrap();
        assert_eq!(eval.accumulator(), "20");
    }

    #[test]
    fn operator_without_fresh_input_does_not_resolve() {
        // Switching operators before entering the right operand re-latches
        // instead of evaluating.
        let mut eval = Evaluator::new();
        eval.input_digit('6');
        eval.set_operator(Operator::Add, now()).unwrap();
        eval.set_operator(Operator::Multiply, now()).unwrap();
        assert_eq!(eval.accumulator(), "6");
        assert_eq!(eval.pending_expression().unwrap(), "6 ×");
    }

    #[test]
    fn dividing_by_zero_raises_and_recovers() {
        let mut eval = Evaluator::new();
        eval.input_digit('8');
        eval.set_operator(Operator::Divide, now()).unwrap();
        eval.input_digit('0');
        assert_eq!(eval.evaluate(now()), Err(EvalError::DivisionByZero));
        assert_eq!(eval.display(), "cannot divide by zero");

        // Before the delay nothing changes; after it the accumulator zeroes.
        eval.poll(now() + Duration::milliseconds(1999));
        assert_eq!(eval.display(), "cannot divide by zero");
        eval.poll(now() + Duration::milliseconds(ERROR_CLEAR_MS));
        assert_eq!(eval.display(), "0");
    }

    #[test]
    fn function_after_error_dismisses_it_and_disarms_the_auto_clear() {
        let mut eval = Evaluator::new();
        eval.input_digit('8');
        eval.set_operator(Operator::Divide, now()).unwrap();
        eval.input_digit('0');
        assert_eq!(eval.evaluate(now()), Err(EvalError::DivisionByZero));

        // cos(0) = 1 replaces both the display and the pending auto-clear.
        eval.apply(Function::Cos, now()).unwrap();
        assert_eq!(eval.display(), "1");
        eval.poll(now() + Duration::milliseconds(ERROR_CLEAR_MS));
        assert_eq!(eval.display(), "1");
    }

    #[test]
    fn percent_after_error_dismisses_it_and_disarms_the_auto_clear() {
        let mut eval = Evaluator::new();
        type_str(&mut eval, "2.5");
        assert!(eval.apply(Function::Factorial, now()).is_err());
        eval.percent().unwrap();
        assert_eq!(eval.display(), "0.025");
        eval.poll(now() + Duration::milliseconds(ERROR_CLEAR_MS));
        assert_eq!(eval.display(), "0.025");
    }

    #[test]
    fn evaluate_after_error_dismisses_it_and_disarms_the_auto_clear() {
        let mut eval = Evaluator::new();
        eval.input_digit('4');
        eval.set_operator(Operator::Add, now()).unwrap();
        eval.input_digit('0');
        assert!(eval.apply(Function::Log, now()).is_err());

        eval.evaluate(now()).unwrap();
        assert_eq!(eval.display(), "4");
        eval.poll(now() + Duration::milliseconds(ERROR_CLEAR_MS));
        assert_eq!(eval.display(), "4");
    }

    #[test]
    fn typing_dismisses_a_showing_error() {
        let mut eval = Evaluator::new();
        eval.input_digit('1');
        eval.set_operator(Operator::Divide, now()).unwrap();
        eval.input_digit('0');
        let _ = eval.evaluate(now());
        eval.input_digit('4');
        assert_eq!(eval.display(), "4");
        // The stale auto-clear must not fire later.
        eval.poll(now() + Duration::seconds(10));
        assert_eq!(eval.display(), "4");
    }

    #[test]
    fn dividing_nonzero_by_itself_yields_one() {
        for text in ["3", "0.7", "123456.789"] {
            let mut eval = Evaluator::new();
            type_str(&mut eval, text);
            eval.set_operator(Operator::Divide, now()).unwrap();
            type_str(&mut eval, text);
            eval.evaluate(now()).unwrap();
            assert_eq!(eval.accumulator(), "1", "{text} / {text}");
        }
    }

    #[test]
    fn power_operator() {
        let mut eval = Evaluator::new();
        eval.input_digit('2');
        eval.set_operator(Operator::Power, now()).unwrap();
        type_str(&mut eval, "10");
        eval.evaluate(now()).unwrap();
        assert_eq!(eval.accumulator(), "1024");
    }

    #[test]
    fn rounding_is_idempotent() {
        for value in [0.3, 1.0, -2.71828182, 123456.12345678, 0.0] {
            let once = round_result(value);
            assert_eq!(round_result(once), once);
        }
    }

    #[test]
    fn epsilon_bias_cleans_trig_results() {
        let mut eval = Evaluator::new();
        type_str(&mut eval, "30");
        eval.apply(Function::Sin, now()).unwrap();
        assert_eq!(eval.accumulator(), "0.5");

        let mut eval = Evaluator::new();
        type_str(&mut eval, "45");
        eval.apply(Function::Tan, now()).unwrap();
        assert_eq!(eval.accumulator(), "1");
    }

    #[test]
    fn factorial_table() {
        let mut eval = Evaluator::new();
        eval.input_digit('0');
        eval.apply(Function::Factorial, now()).unwrap();
        assert_eq!(eval.accumulator(), "1");

        let mut eval = Evaluator::new();
        eval.input_digit('5');
        eval.apply(Function::Factorial, now()).unwrap();
        assert_eq!(eval.accumulator(), "120");
    }

    #[test]
    fn factorial_saturates_on_huge_integer_input() {
        // Integer-valued inputs at or beyond 2^53 pass the domain gate; the
        // loop must terminate with an infinite result instead of stalling.
        let mut eval = Evaluator::new();
        type_str(&mut eval, "9999999999999999999");
        eval.apply(Function::Factorial, now()).unwrap();
        assert!(eval.accumulator().parse::<f64>().unwrap().is_infinite());

        // Large but representable inputs still come out finite.
        let mut eval = Evaluator::new();
        type_str(&mut eval, "100");
        eval.apply(Function::Factorial, now()).unwrap();
        assert!(eval.accumulator().parse::<f64>().unwrap().is_finite());
    }

    #[test]
    fn factorial_rejects_negative_and_fractional() {
        let mut eval = Evaluator::new();
        type_str(&mut eval, "2.5");
        assert!(matches!(
            eval.apply(Function::Factorial, now()),
            Err(EvalError::Domain { op: "factorial", .. })
        ));

        // -1 via 0 - 1.
        let mut eval = Evaluator::new();
        eval.input_digit('0');
        eval.set_operator(Operator::Subtract, now()).unwrap();
        eval.input_digit('1');
        eval.evaluate(now()).unwrap();
        assert_eq!(eval.accumulator(), "-1");
        assert!(matches!(
            eval.apply(Function::Factorial, now()),
            Err(EvalError::Domain { op: "factorial", .. })
        ));
    }

    #[test]
    fn log_and_sqrt_domain_checks() {
        let mut eval = Evaluator::new();
        eval.input_digit('0');
        assert!(matches!(
            eval.apply(Function::Log, now()),
            Err(EvalError::Domain { op: "log", .. })
        ));

        let mut eval = Evaluator::new();
        type_str(&mut eval, "100");
        eval.apply(Function::Log, now()).unwrap();
        assert_eq!(eval.accumulator(), "2");

        let mut eval = Evaluator::new();
        type_str(&mut eval, "144");
        eval.apply(Function::Sqrt, now()).unwrap();
        assert_eq!(eval.accumulator(), "12");
    }

    #[test]
    fn reciprocal_of_zero_is_division_by_zero() {
        let mut eval = Evaluator::new();
        eval.input_digit('0');
        assert_eq!(
            eval.apply(Function::Reciprocal, now()),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn square_and_cube() {
        let mut eval = Evaluator::new();
        eval.input_digit('9');
        eval.apply(Function::Square, now()).unwrap();
        assert_eq!(eval.accumulator(), "81");
        eval.apply(Function::Cube, now()).unwrap();
        assert_eq!(eval.accumulator(), "531441");
    }

    #[test]
    fn history_is_newest_first_and_bounded() {
        let mut eval = Evaluator::new();
        for i in 0..25 {
            eval.clear();
            type_str(&mut eval, &i.to_string());
            eval.set_operator(Operator::Add, now()).unwrap();
            eval.input_digit('1');
            eval.evaluate(now() + Duration::seconds(i)).unwrap();
        }
        assert_eq!(eval.history().len(), HISTORY_LIMIT);
        assert_eq!(eval.history()[0].expression, "24 + 1");
        assert_eq!(eval.history()[0].result, 25.0);
        assert_eq!(eval.history().last().unwrap().expression, "5 + 1");
    }

    #[test]
    fn constants_and_percent() {
        let mut eval = Evaluator::new();
        eval.insert_constant(Constant::Pi, now());
        assert_eq!(eval.accumulator(), "3.14159265");
        assert_eq!(eval.history()[0].expression, "π");

        let mut eval = Evaluator::new();
        type_str(&mut eval, "50");
        eval.percent().unwrap();
        assert_eq!(eval.accumulator(), "0.5");
        assert!(eval.history().is_empty());
    }

    #[test]
    fn clear_resets_entry_but_keeps_history() {
        let mut eval = Evaluator::new();
        eval.input_digit('4');
        eval.set_operator(Operator::Add, now()).unwrap();
        eval.input_digit('4');
        eval.evaluate(now()).unwrap();
        eval.clear();
        assert_eq!(eval.accumulator(), "0");
        assert!(eval.pending_expression().is_none());
        assert_eq!(eval.history().len(), 1);
        eval.clear_history();
        assert!(eval.history().is_empty());
    }

    #[test]
    fn delete_last_truncates_to_zero() {
        let mut eval = Evaluator::new();
        type_str(&mut eval, "12.5");
        eval.delete_last();
        assert_eq!(eval.accumulator(), "12.");
        eval.delete_last();
        eval.delete_last();
        assert_eq!(eval.accumulator(), "1");
        eval.delete_last();
        assert_eq!(eval.accumulator(), "0");
        eval.delete_last();
        assert_eq!(eval.accumulator(), "0");
    }
}
