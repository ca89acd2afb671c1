//! Implied-decimal parsing, rendering, and arithmetic
//!
//! Fixed numeric elements ("Nn") omit the decimal point on the wire; the
//! schema-declared precision fixes its place. All arithmetic is exact
//! decimal arithmetic; binary floats never appear.

use super::{ElementValue, State};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use x12_schema::ElementKind;

/// Parse wire characters with an implied decimal point.
///
/// `"1234"` under precision 2 denotes `12.34`. Only an optional leading
/// sign followed by digits is accepted.
pub(crate) fn parse_implied(raw: &str, precision: u8) -> Option<Decimal> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mantissa: i128 = raw.parse().ok()?;
    Decimal::try_from_i128_with_scale(mantissa, u32::from(precision)).ok()
}

/// The magnitude of `round(number * 10^precision)`.
pub(crate) fn implied_mantissa(number: Decimal, precision: u8) -> u128 {
    implied_mantissa_signed(number, precision).unsigned_abs()
}

fn implied_mantissa_signed(number: Decimal, precision: u8) -> i128 {
    let mut scaled = number;
    scaled.rescale(u32::from(precision));
    scaled.mantissa()
}

/// Number of decimal digits in a magnitude (`0` counts as one digit).
pub(crate) fn digit_count(magnitude: u128) -> usize {
    magnitude.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// Render an implied-decimal value to wire characters.
pub(crate) fn render_implied(
    number: Decimal,
    precision: u8,
    min_length: usize,
    max_length: usize,
    truncate: bool,
) -> String {
    let mantissa = implied_mantissa_signed(number, precision);
    let negative = mantissa < 0;
    let mut digits = mantissa.unsigned_abs().to_string();
    if truncate && digits.len() > max_length {
        digits.truncate(max_length);
    }
    if digits.len() < min_length {
        digits.insert_str(0, &"0".repeat(min_length - digits.len()));
    }
    if negative {
        digits.insert(0, '-');
    }
    digits
}

/// Render a real-decimal ("R") value to wire characters.
///
/// Fractional digits are shed to satisfy `max_length` when truncating; an
/// oversized integer part is emitted whole regardless.
pub(crate) fn render_real(
    number: Decimal,
    min_length: usize,
    max_length: usize,
    truncate: bool,
) -> String {
    let mut value = number.normalize();
    let mut out = value.to_string();
    while truncate && wire_width(&out) > max_length && value.scale() > 0 {
        value.rescale(value.scale() - 1);
        value = value.normalize();
        out = value.to_string();
    }
    let width = wire_width(&out);
    if width < min_length {
        let at = usize::from(out.starts_with('-'));
        out.insert_str(at, &"0".repeat(min_length - width));
    }
    out
}

fn wire_width(rendered: &str) -> usize {
    rendered.len() - usize::from(rendered.starts_with('-'))
}

/// Lift an operand into the decimal domain of an element kind.
///
/// Strings are read the way element input is read (implied precision for
/// `Nn`, explicit point for `R`); numbers pass through verbatim. Operands
/// that cannot be lifted make the surrounding operation `Invalid`.
pub trait ToDecimal {
    /// The decimal representation under `kind`, if one exists.
    fn to_decimal(&self, kind: &ElementKind) -> Option<Decimal>;
}

impl ToDecimal for Decimal {
    fn to_decimal(&self, _kind: &ElementKind) -> Option<Decimal> {
        Some(*self)
    }
}

impl ToDecimal for i64 {
    fn to_decimal(&self, _kind: &ElementKind) -> Option<Decimal> {
        Some(Decimal::from(*self))
    }
}

impl ToDecimal for i32 {
    fn to_decimal(&self, _kind: &ElementKind) -> Option<Decimal> {
        Some(Decimal::from(*self))
    }
}

impl ToDecimal for str {
    fn to_decimal(&self, kind: &ElementKind) -> Option<Decimal> {
        match kind {
            ElementKind::Numeric { precision } => parse_implied(self, *precision),
            _ => self.parse().ok(),
        }
    }
}

impl ToDecimal for ElementValue {
    fn to_decimal(&self, _kind: &ElementKind) -> Option<Decimal> {
        self.as_decimal()
    }
}

impl<T: ToDecimal + ?Sized> ToDecimal for &T {
    fn to_decimal(&self, kind: &ElementKind) -> Option<Decimal> {
        (**self).to_decimal(kind)
    }
}

impl ElementValue {
    /// Absolute value; `Empty` and `Invalid` propagate unchanged.
    #[must_use]
    pub fn abs(self) -> Self {
        self.map(|d| Decimal::abs(&d))
    }

    fn binary<T: ToDecimal>(
        &self,
        rhs: T,
        op: impl FnOnce(Decimal, Decimal) -> Option<Decimal>,
    ) -> ElementValue {
        match self.state() {
            State::Invalid(_) => self.clone(),
            State::Number(lhs) => {
                let kind = self.usage().definition.kind;
                match rhs.to_decimal(&kind).and_then(|rhs| op(*lhs, rhs)) {
                    Some(result) => self.with_state(State::Number(result)),
                    None => self.with_state(State::Invalid(String::new())),
                }
            }
            _ => self.with_state(State::Invalid(String::new())),
        }
    }
}

macro_rules! value_binary_op {
    ($trait:ident, $method:ident, $checked:ident) => {
        impl<T: ToDecimal> $trait<T> for &ElementValue {
            type Output = ElementValue;

            fn $method(self, rhs: T) -> ElementValue {
                self.binary(rhs, |a, b| a.$checked(b))
            }
        }

        impl<T: ToDecimal> $trait<T> for ElementValue {
            type Output = ElementValue;

            fn $method(self, rhs: T) -> ElementValue {
                (&self).$method(rhs)
            }
        }
    };
}

value_binary_op!(Add, add, checked_add);
value_binary_op!(Sub, sub, checked_sub);
value_binary_op!(Mul, mul, checked_mul);
value_binary_op!(Div, div, checked_div);
value_binary_op!(Rem, rem, checked_rem);

impl Neg for &ElementValue {
    type Output = ElementValue;

    fn neg(self) -> ElementValue {
        match self.state() {
            State::Number(number) => self.with_state(State::Number(-number)),
            State::Invalid(_) => self.clone(),
            _ => self.with_state(State::Invalid(String::new())),
        }
    }
}

impl Neg for ElementValue {
    type Output = ElementValue;

    fn neg(self) -> ElementValue {
        -&self
    }
}

impl PartialOrd for ElementValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.state(), other.state()) {
            (State::Number(a), State::Number(b)) => a.partial_cmp(b),
            (State::Id(a), State::Id(b)) | (State::Text(a), State::Text(b)) => a.partial_cmp(b),
            (State::Date(a), State::Date(b)) => a.date.partial_cmp(&b.date),
            (State::Time(a), State::Time(b)) => a.time.partial_cmp(&b.time),
            (State::Empty, State::Empty) => self
                .usage()
                .same_definition(other.usage())
                .then_some(Ordering::Equal),
            (State::Invalid(a), State::Invalid(b)) => (a == b).then_some(Ordering::Equal),
            _ => None,
        }
    }
}

impl PartialOrd<Decimal> for ElementValue {
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        self.as_decimal().and_then(|lhs| lhs.partial_cmp(other))
    }
}

impl PartialOrd<i64> for ElementValue {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        self.as_decimal()
            .and_then(|lhs| lhs.partial_cmp(&Decimal::from(*other)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use x12_schema::{ElementDef, Requirement, Usage};

    fn numeric_usage(precision: u8) -> Usage {
        Usage::new(
            Arc::new(
                ElementDef::new("380", "Quantity", ElementKind::Numeric { precision })
                    .length(1, 15),
            ),
            Requirement::Optional,
        )
    }

    fn read(raw: &str, precision: u8) -> ElementValue {
        ElementValue::value(raw, numeric_usage(precision), Position::new(0, 1))
    }

    #[test]
    fn test_parse_implied() {
        assert_eq!(parse_implied("1234", 2), Some(dec!(12.34)));
        assert_eq!(parse_implied("1234", 0), Some(dec!(1234)));
        assert_eq!(parse_implied("-50", 1), Some(dec!(-5.0)));
        assert_eq!(parse_implied("+7", 0), Some(dec!(7)));
        assert_eq!(parse_implied("12.4", 1), None);
        assert_eq!(parse_implied("12A4", 2), None);
        assert_eq!(parse_implied("-", 0), None);
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(12345), 5);
    }

    #[test]
    fn test_render_implied_pads_and_truncates() {
        assert_eq!(render_implied(dec!(12.34), 2, 1, 10, true), "1234");
        assert_eq!(render_implied(dec!(0.12), 2, 4, 10, true), "0012");
        assert_eq!(render_implied(dec!(-1.5), 1, 4, 10, true), "-0015");
        assert_eq!(render_implied(dec!(123456), 0, 1, 4, true), "1234");
        assert_eq!(render_implied(dec!(123456), 0, 1, 4, false), "123456");
    }

    #[test]
    fn test_render_real_sheds_fraction_to_fit() {
        assert_eq!(render_real(dec!(12.344), 1, 6, true), "12.344");
        assert_eq!(render_real(dec!(12.344), 1, 5, true), "12.34");
        assert_eq!(render_real(dec!(12.344), 1, 4, true), "12.3");
        assert_eq!(render_real(dec!(12.344), 1, 2, true), "12");
        assert_eq!(render_real(dec!(-1.5), 4, 10, true), "-001.5");
    }

    #[test]
    fn test_addition_is_exact() {
        let a = read("010", 1); // 1.0
        let b = read("002", 1); // 0.2
        let sum = &a + &b;
        assert!(sum.is_valid());
        assert_eq!(sum.as_decimal(), Some(dec!(1.2)));
    }

    #[test]
    fn test_result_inherits_left_operand_context() {
        let a = ElementValue::value("100", numeric_usage(2), Position::new(40, 3).at_element(2));
        let b = read("50", 2);
        let sum = &a + &b;
        assert_eq!(sum.position(), Position::new(40, 3).at_element(2));
        assert_eq!(sum.usage().definition.id, "380");
    }

    #[test]
    fn test_operand_coercion() {
        let a = read("1234", 2); // 12.34
        assert_eq!((&a + dec!(0.66)).as_decimal(), Some(dec!(13.00)));
        assert_eq!((&a - 2_i64).as_decimal(), Some(dec!(10.34)));
        // "100" is read with the left operand's implied precision: 1.00
        assert_eq!((&a * "100").as_decimal(), Some(dec!(12.34)));
        assert_eq!((&a % 5_i64).as_decimal(), Some(dec!(2.34)));
    }

    #[test]
    fn test_uncoercible_operand_is_invalid() {
        let a = read("1234", 2);
        let result = &a + "12A";
        assert!(!result.is_valid());
    }

    #[test]
    fn test_arithmetic_on_empty_or_invalid_is_invalid() {
        let empty = ElementValue::empty(numeric_usage(2), Position::new(0, 1));
        assert!(!(&empty + 1_i64).is_valid());

        let invalid = read("xx", 2);
        let result = &invalid + 1_i64;
        assert!(!result.is_valid());
        assert_eq!(result.raw(), Some("xx"));
    }

    #[test]
    fn test_division_by_zero_is_invalid() {
        let a = read("100", 0);
        assert!(!(&a / 0_i64).is_valid());
        assert!(!(&a % 0_i64).is_valid());
    }

    #[test]
    fn test_negation_and_abs() {
        let a = read("150", 2);
        assert_eq!((-&a).as_decimal(), Some(dec!(-1.50)));
        assert_eq!((-&a).abs().as_decimal(), Some(dec!(1.50)));

        let empty = ElementValue::empty(numeric_usage(2), Position::new(0, 1));
        assert!(!(-&empty).is_valid());
    }

    #[test]
    fn test_ordering() {
        let a = read("100", 2); // 1.00
        let b = read("250", 2); // 2.50
        assert!(a < b);
        assert!(b > a);
        assert!(a < dec!(1.5));
        assert!(a > 0_i64);

        let invalid = read("xx", 2);
        assert_eq!(a.partial_cmp(&invalid), None);
    }

    #[test]
    fn test_arithmetic_closure_matches_decimal_arithmetic() {
        let cases = [("1", "2"), ("999999", "1"), ("-500", "250"), ("0", "0")];
        for (left, right) in cases {
            let a = read(left, 3);
            let b = read(right, 3);
            let sum = &a + &b;
            assert!(sum.is_valid());
            assert_eq!(
                sum.as_decimal().unwrap(),
                a.as_decimal().unwrap() + b.as_decimal().unwrap()
            );
        }
    }
}
