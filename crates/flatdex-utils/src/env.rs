use std::{env, iter::Peekable, str::Chars};

use crate::error::{EnvError, EnvResult};

/// Expands `${VAR}` and `${VAR:fallback}` references in a string against the
/// process environment.
///
/// A `${VAR}` reference fails if the variable is unset; `${VAR:fallback}`
/// substitutes the fallback text instead, and the fallback may itself contain
/// further references. A `$` that is not followed by `{` is passed through
/// verbatim.
///
/// # Errors
///
/// * [`EnvError::UnclosedReference`] if a reference is not terminated by `}`.
/// * [`EnvError::ExpectedVariableName`] if `${` is not followed by a name.
/// * [`EnvError::MissingVariable`] if a variable without fallback is unset.
pub fn substitute_env_vars(input: &str) -> EnvResult<String> {
    let mut chars = input.chars().peekable();
    expand_segment(&mut chars, input, true)
}

fn expand_segment(chars: &mut Peekable<Chars>, input: &str, outer: bool) -> EnvResult<String> {
    let mut result = String::new();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            result.push_str(&expand_reference(chars, input)?);
        } else if c == '}' && !outer {
            return Ok(result);
        } else {
            result.push(c);
        }
    }

    if outer {
        Ok(result)
    } else {
        Err(EnvError::UnclosedReference {
            input: input.to_string(),
        })
    }
}

fn expand_reference(chars: &mut Peekable<Chars>, input: &str) -> EnvResult<String> {
    let var = consume_var_name(chars);
    if var.is_empty() {
        return Err(EnvError::ExpectedVariableName {
            input: input.to_string(),
        });
    }

    match chars.next() {
        Some('}') => env::var(&var).map_err(|_| EnvError::MissingVariable {
            var,
            input: input.to_string(),
        }),
        Some(':') => {
            let fallback = expand_segment(chars, input, false)?;
            Ok(env::var(&var).unwrap_or(fallback))
        }
        Some(_) => Err(EnvError::ExpectedSeparator {
            input: input.to_string(),
        }),
        None => Err(EnvError::UnclosedReference {
            input: input.to_string(),
        }),
    }
}

fn consume_var_name(chars: &mut Peekable<Chars>) -> String {
    let mut var = String::new();

    while let Some(&c) = chars.peek() {
        let valid = if var.is_empty() {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };

        if valid {
            var.push(c);
            chars.next();
        } else {
            break;
        }
    }

    var
}
