//! Validators run on a flag's coerced value before it is stored.
//!
//! A validator is any `Fn(&Value) -> Result<(), String>`; the error string
//! is surfaced to the user unchanged. The factories here cover the common
//! checks and fail closed when handed a value of a type they cannot inspect.

use std::fmt::Debug;

use crate::value::{FlagValue, Value};

pub type Validator = Box<dyn Fn(&Value) -> Result<(), String>>;

/// Run validators in order, stopping at the first failure.
pub fn apply(validators: &[Validator], value: &Value) -> Result<(), String> {
    validators.iter().try_for_each(|check| check(value))
}

fn expect<T: FlagValue>(value: &Value) -> Result<&T, String> {
    T::peek(value).ok_or_else(|| format!("validator cannot check a {} value", value.type_name()))
}

/// Accept only values equal to one of `choices`.
pub fn one_of<T>(
    choices: impl IntoIterator<Item = impl Into<T>>,
) -> impl Fn(&Value) -> Result<(), String>
where
    T: FlagValue + PartialEq + Debug,
{
    let choices: Vec<T> = choices.into_iter().map(Into::into).collect();
    move |value| {
        let value = expect::<T>(value)?;
        if choices.contains(value) {
            Ok(())
        } else {
            Err(format!("{value:?} is not one of {choices:?}"))
        }
    }
}

/// Minimum length in characters, for string values.
pub fn min_len(min: usize) -> impl Fn(&Value) -> Result<(), String> {
    move |value| {
        let len = expect::<String>(value)?.chars().count();
        if len < min {
            return Err(format!("must be at least {min} characters long, got {len}"));
        }
        Ok(())
    }
}

/// Maximum length in characters, for string values.
pub fn max_len(max: usize) -> impl Fn(&Value) -> Result<(), String> {
    move |value| {
        let len = expect::<String>(value)?.chars().count();
        if len > max {
            return Err(format!("must be at most {max} characters long, got {len}"));
        }
        Ok(())
    }
}

pub fn min<T>(min: T) -> impl Fn(&Value) -> Result<(), String>
where
    T: FlagValue + PartialOrd + Debug,
{
    move |value| {
        let value = expect::<T>(value)?;
        if *value < min {
            return Err(format!("{value:?} is less than the minimum {min:?}"));
        }
        Ok(())
    }
}

pub fn max<T>(max: T) -> impl Fn(&Value) -> Result<(), String>
where
    T: FlagValue + PartialOrd + Debug,
{
    move |value| {
        let value = expect::<T>(value)?;
        if *value > max {
            return Err(format!("{value:?} is greater than the maximum {max:?}"));
        }
        Ok(())
    }
}

/// Inclusive range check; both bounds are valid values.
pub fn range<T>(low: T, high: T) -> impl Fn(&Value) -> Result<(), String>
where
    T: FlagValue + PartialOrd + Debug,
{
    move |value| {
        let value = expect::<T>(value)?;
        if *value < low || *value > high {
            return Err(format!("{value:?} is not between {low:?} and {high:?}"));
        }
        Ok(())
    }
}
