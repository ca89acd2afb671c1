//! Typed element values
//!
//! Every element value is in one of three states: `Empty` (present
//! syntactically, no characters), `Invalid` (characters present but
//! unparseable under the declared kind, original text retained), or a
//! present payload parsed per the element kind. The states are not
//! constructable from outside this module; `empty`, `invalid`, and `value`
//! are the only factories. Values are immutable; every "modification"
//! returns a new value.

mod numeric;
mod temporal;

pub use numeric::ToDecimal;
pub use temporal::{DateValue, TimeValue};

use crate::position::Position;
use numeric::{digit_count, parse_implied};
use rust_decimal::Decimal;
use x12_schema::{ElementKind, Usage};

/// A typed element value with its schema context and source position
#[derive(Debug, Clone)]
pub struct ElementValue {
    usage: Usage,
    position: Position,
    state: State,
}

#[derive(Debug, Clone)]
pub(crate) enum State {
    Empty,
    Invalid(String),
    Id(String),
    Text(String),
    Number(Decimal),
    Date(DateValue),
    Time(TimeValue),
}

impl ElementValue {
    /// An empty value.
    pub fn empty(usage: Usage, position: Position) -> Self {
        Self {
            usage,
            position,
            state: State::Empty,
        }
    }

    /// An invalid value retaining the original characters.
    pub fn invalid(raw: impl Into<String>, usage: Usage, position: Position) -> Self {
        Self {
            usage,
            position,
            state: State::Invalid(raw.into()),
        }
    }

    /// Parse raw characters under the usage's element kind.
    ///
    /// Blank input yields `Empty`; unparseable input yields `Invalid` with
    /// the raw characters retained.
    pub fn value(raw: &str, usage: Usage, position: Position) -> Self {
        if raw.is_empty() {
            return Self::empty(usage, position);
        }

        let state = match usage.definition.kind {
            ElementKind::Id => {
                let accepted = match &usage.definition.code_list {
                    Some(list) => list.contains(raw),
                    None => true,
                };
                if accepted {
                    Some(State::Id(raw.to_string()))
                } else {
                    None
                }
            }
            ElementKind::Text => Some(State::Text(raw.to_string())),
            ElementKind::Numeric { precision } => {
                parse_implied(raw, precision).map(State::Number)
            }
            ElementKind::Decimal => raw.parse::<Decimal>().ok().map(State::Number),
            ElementKind::Date => DateValue::parse(raw).map(State::Date),
            ElementKind::Time => TimeValue::parse(raw).map(State::Time),
        };

        match state {
            Some(state) => Self {
                usage,
                position,
                state,
            },
            None => Self::invalid(raw, usage, position),
        }
    }

    /// Store an already-numeric input verbatim (no implied-decimal scaling).
    pub fn from_decimal(number: Decimal, usage: Usage, position: Position) -> Self {
        if usage.definition.kind.is_numeric() {
            Self {
                usage,
                position,
                state: State::Number(number),
            }
        } else {
            Self::invalid(number.to_string(), usage, position)
        }
    }

    /// Store an integer input verbatim.
    pub fn from_i64(number: i64, usage: Usage, position: Position) -> Self {
        Self::from_decimal(Decimal::from(number), usage, position)
    }

    /// Schema context of this value.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Source position of this value.
    pub fn position(&self) -> Position {
        self.position
    }

    /// True when the value is syntactically present but blank.
    pub fn is_empty(&self) -> bool {
        matches!(self.state, State::Empty)
    }

    /// True unless the value failed to parse.
    pub fn is_valid(&self) -> bool {
        !matches!(self.state, State::Invalid(_))
    }

    /// True when a parsed payload is present.
    pub fn is_present(&self) -> bool {
        !matches!(self.state, State::Empty | State::Invalid(_))
    }

    /// The retained characters of an invalid value.
    pub fn raw(&self) -> Option<&str> {
        match &self.state {
            State::Invalid(raw) => Some(raw),
            _ => None,
        }
    }

    /// The decimal payload of a present numeric value.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match &self.state {
            State::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// The string payload of a present identifier or text value.
    pub fn as_str(&self) -> Option<&str> {
        match &self.state {
            State::Id(text) | State::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The date payload of a present date value.
    pub fn as_date(&self) -> Option<&DateValue> {
        match &self.state {
            State::Date(date) => Some(date),
            _ => None,
        }
    }

    /// The time payload of a present time value.
    pub fn as_time(&self) -> Option<&TimeValue> {
        match &self.state {
            State::Time(time) => Some(time),
            _ => None,
        }
    }

    /// Whether the rendered value cannot fit in `max_length`.
    ///
    /// For numeric values this is exact: the magnitude's digit count (sign
    /// excluded) against `max_length`. Empty and invalid values are never
    /// too long.
    pub fn too_long(&self) -> bool {
        let def = &self.usage.definition;
        match &self.state {
            State::Empty | State::Invalid(_) => false,
            State::Id(text) | State::Text(text) => text.chars().count() > def.max_length,
            State::Number(number) => match def.kind {
                ElementKind::Numeric { precision } => {
                    digit_count(numeric::implied_mantissa(*number, precision)) > def.max_length
                }
                _ => number.abs().normalize().to_string().len() > def.max_length,
            },
            State::Date(date) => date.rendered_width() > def.max_length,
            State::Time(time) => usize::from(time.width) > def.max_length,
        }
    }

    /// Whether the rendered value cannot reach `min_length`.
    ///
    /// Always false for numeric and string kinds, whose renderings pad.
    pub fn too_short(&self) -> bool {
        let def = &self.usage.definition;
        match &self.state {
            State::Empty | State::Invalid(_) => false,
            State::Id(_) | State::Text(_) | State::Number(_) => false,
            State::Date(date) => date.rendered_width() < def.min_length,
            State::Time(time) => usize::from(time.width) < def.min_length,
        }
    }

    /// Render wire characters under the declared kind and lengths.
    ///
    /// Empty and invalid values render as the empty string. With
    /// `truncate`, output is cut to `max_length`; without it, an oversized
    /// magnitude is emitted in full and `too_long` reports the condition.
    pub fn to_wire(&self, truncate: bool) -> String {
        let def = &self.usage.definition;
        match &self.state {
            State::Empty | State::Invalid(_) => String::new(),
            State::Id(text) | State::Text(text) => {
                let mut out = text.clone();
                if truncate && out.chars().count() > def.max_length {
                    out = out.chars().take(def.max_length).collect();
                }
                while out.chars().count() < def.min_length {
                    out.push(' ');
                }
                out
            }
            State::Number(number) => match def.kind {
                ElementKind::Numeric { precision } => numeric::render_implied(
                    *number,
                    precision,
                    def.min_length,
                    def.max_length,
                    truncate,
                ),
                _ => numeric::render_real(*number, def.min_length, def.max_length, truncate),
            },
            State::Date(date) => date.render(def.max_length, truncate),
            State::Time(time) => time.render(def.max_length, truncate),
        }
    }

    /// Apply a function to a present numeric payload; `Empty` and
    /// `Invalid` propagate unchanged.
    #[must_use]
    pub fn map(self, f: impl FnOnce(Decimal) -> Decimal) -> Self {
        match self.state {
            State::Number(number) => Self {
                usage: self.usage,
                position: self.position,
                state: State::Number(f(number)),
            },
            _ => self,
        }
    }

    /// Copy with a different position.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub(crate) fn state(&self) -> &State {
        &self.state
    }

    pub(crate) fn with_state(&self, state: State) -> Self {
        Self {
            usage: self.usage.clone(),
            position: self.position,
            state,
        }
    }
}

impl PartialEq for ElementValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (State::Empty, State::Empty) => self.usage.same_definition(&other.usage),
            (State::Invalid(a), State::Invalid(b)) => a == b,
            (State::Id(a), State::Id(b)) | (State::Text(a), State::Text(b)) => a == b,
            (State::Number(a), State::Number(b)) => a == b,
            (State::Date(a), State::Date(b)) => a == b,
            (State::Time(a), State::Time(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq<&str> for ElementValue {
    fn eq(&self, other: &&str) -> bool {
        let coerced = ElementValue::value(other, self.usage.clone(), self.position);
        *self == coerced
    }
}

impl PartialEq<Decimal> for ElementValue {
    fn eq(&self, other: &Decimal) -> bool {
        self.as_decimal() == Some(*other)
    }
}

impl PartialEq<i64> for ElementValue {
    fn eq(&self, other: &i64) -> bool {
        self.as_decimal() == Some(Decimal::from(*other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use x12_schema::{CodeList, ElementDef, Requirement};

    fn usage_of(def: ElementDef) -> Usage {
        Usage::new(Arc::new(def), Requirement::Optional)
    }

    fn numeric_usage(precision: u8, min: usize, max: usize) -> Usage {
        usage_of(
            ElementDef::new("380", "Quantity", ElementKind::Numeric { precision })
                .length(min, max),
        )
    }

    fn pos() -> Position {
        Position::new(0, 1)
    }

    #[test]
    fn test_blank_input_is_empty() {
        let v = ElementValue::value("", numeric_usage(2, 1, 10), pos());
        assert!(v.is_empty());
        assert!(v.is_valid());
        assert_eq!(v.to_wire(true), "");
    }

    #[test]
    fn test_implied_decimal_parse() {
        let v = ElementValue::value("1234", numeric_usage(2, 1, 10), pos());
        assert_eq!(v.as_decimal(), Some(dec!(12.34)));
        assert_eq!(v.to_wire(true), "1234");
    }

    #[test]
    fn test_implied_decimal_zero_precision() {
        let v = ElementValue::value("1234", numeric_usage(0, 1, 10), pos());
        assert_eq!(v.as_decimal(), Some(dec!(1234)));
    }

    #[test]
    fn test_invalid_numeric_retains_raw() {
        let v = ElementValue::value("12A4", numeric_usage(2, 1, 10), pos());
        assert!(!v.is_valid());
        assert_eq!(v.raw(), Some("12A4"));
        assert_eq!(v.to_wire(true), "");
        assert_eq!(v.to_wire(false), "");
    }

    #[test]
    fn test_numeric_min_length_zero_pads() {
        let v = ElementValue::value("12", numeric_usage(0, 4, 10), pos());
        assert_eq!(v.to_wire(true), "0012");
    }

    #[test]
    fn test_negative_numeric_sign_outside_padding() {
        let v = ElementValue::value("-12", numeric_usage(0, 4, 10), pos());
        assert_eq!(v.as_decimal(), Some(dec!(-12)));
        assert_eq!(v.to_wire(true), "-0012");
    }

    #[test]
    fn test_numeric_from_decimal_is_verbatim() {
        let v = ElementValue::from_decimal(dec!(12.34), numeric_usage(2, 1, 10), pos());
        assert_eq!(v.as_decimal(), Some(dec!(12.34)));
        assert_eq!(v.to_wire(true), "1234");
    }

    #[test]
    fn test_too_long_counts_digits_not_sign() {
        let v = ElementValue::from_decimal(dec!(-123.45), numeric_usage(2, 1, 5), pos());
        assert!(!v.too_long());
        let v = ElementValue::from_decimal(dec!(-1234.56), numeric_usage(2, 1, 5), pos());
        assert!(v.too_long());
        assert!(!v.too_short());
    }

    #[test]
    fn test_to_wire_untruncated_overflows() {
        let v = ElementValue::value("123456", numeric_usage(0, 1, 4), pos());
        assert_eq!(v.to_wire(false), "123456");
        assert_eq!(v.to_wire(true), "1234");
        assert!(v.too_long());
    }

    #[test]
    fn test_text_pads_and_truncates() {
        let usage = usage_of(ElementDef::new("I06", "Sender ID", ElementKind::Text).length(4, 6));
        let v = ElementValue::value("AB", usage.clone(), pos());
        assert_eq!(v.to_wire(true), "AB  ");

        let v = ElementValue::value("ABCDEFGH", usage, pos());
        assert!(v.too_long());
        assert_eq!(v.to_wire(true), "ABCDEF");
        assert_eq!(v.to_wire(false), "ABCDEFGH");
    }

    #[test]
    fn test_id_with_code_list() {
        let list = Arc::new(CodeList::with_codes("units", vec!["EA", "CA"]));
        let usage = usage_of(
            ElementDef::new("355", "Unit Code", ElementKind::Id)
                .length(2, 2)
                .with_code_list(list),
        );
        let ok = ElementValue::value("EA", usage.clone(), pos());
        assert!(ok.is_present());
        assert_eq!(ok.as_str(), Some("EA"));

        let bad = ElementValue::value("XX", usage, pos());
        assert!(!bad.is_valid());
        assert_eq!(bad.raw(), Some("XX"));
    }

    #[test]
    fn test_real_decimal_parse_and_render() {
        let usage = usage_of(ElementDef::new("782", "Amount", ElementKind::Decimal).length(1, 10));
        let v = ElementValue::value("12.5", usage.clone(), pos());
        assert_eq!(v.as_decimal(), Some(dec!(12.5)));
        assert_eq!(v.to_wire(true), "12.5");

        let bad = ElementValue::value("12..5", usage, pos());
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_date_parse_and_render() {
        let usage = usage_of(ElementDef::new("373", "Date", ElementKind::Date).length(8, 8));
        let v = ElementValue::value("20240115", usage, pos());
        assert!(v.is_present());
        assert_eq!(v.to_wire(true), "20240115");

        let short = usage_of(ElementDef::new("I08", "Date", ElementKind::Date).length(6, 6));
        let v = ElementValue::value("240115", short.clone(), pos());
        assert_eq!(v.to_wire(true), "240115");

        let bad = ElementValue::value("20241315", short, pos());
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_time_parse_and_render() {
        let usage = usage_of(ElementDef::new("I09", "Time", ElementKind::Time).length(4, 4));
        let v = ElementValue::value("1230", usage, pos());
        assert_eq!(v.to_wire(true), "1230");

        let wide = usage_of(ElementDef::new("337", "Time", ElementKind::Time).length(4, 8));
        let v = ElementValue::value("123045", wide.clone(), pos());
        assert_eq!(v.to_wire(true), "123045");

        let bad = ElementValue::value("2561", wide, pos());
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_equality_empty_requires_same_definition() {
        let a = ElementValue::empty(numeric_usage(2, 1, 10), pos());
        let b = ElementValue::empty(numeric_usage(2, 1, 10), pos());
        assert_eq!(a, b);

        let other = usage_of(ElementDef::new("781", "Other", ElementKind::Numeric {
            precision: 2,
        }));
        let c = ElementValue::empty(other, pos());
        assert_ne!(a, c);
    }

    #[test]
    fn test_equality_coerces_strings_and_numbers() {
        let v = ElementValue::value("1234", numeric_usage(2, 1, 10), pos());
        assert_eq!(v, "1234");
        assert_eq!(v, dec!(12.34));
        assert_ne!(v, 1234_i64);

        let whole = ElementValue::value("7", numeric_usage(0, 1, 10), pos());
        assert_eq!(whole, 7_i64);
    }

    #[test]
    fn test_equality_invalid() {
        let a = ElementValue::value("12A4", numeric_usage(2, 1, 10), pos());
        let b = ElementValue::value("12A4", numeric_usage(2, 1, 10), pos());
        let c = ElementValue::value("99X", numeric_usage(2, 1, 10), pos());
        assert_eq!(a, b);
        assert_ne!(a, c);

        // A present value never equals an invalid one.
        let present = ElementValue::value("1234", numeric_usage(2, 1, 10), pos());
        assert_ne!(present, a);
    }

    #[test]
    fn test_map_propagates_empty_and_invalid() {
        let empty = ElementValue::empty(numeric_usage(2, 1, 10), pos());
        assert!(empty.map(|d| d + dec!(1)).is_empty());

        let invalid = ElementValue::value("xx", numeric_usage(2, 1, 10), pos());
        let mapped = invalid.map(|d| d + dec!(1));
        assert_eq!(mapped.raw(), Some("xx"));

        let v = ElementValue::value("100", numeric_usage(2, 1, 10), pos());
        assert_eq!(v.map(|d| d * dec!(2)).as_decimal(), Some(dec!(2.00)));
    }
}
