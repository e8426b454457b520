//! `@property(...)` expression evaluation.
//!
//! Grammar: identifiers, parenthesized groups, `&&`, `||` and a unary `!`
//! in front of an identifier or a group. An identifier is true when the
//! property it names is non-zero.
//!
//! Operators inside one group are folded strictly left to right, starting
//! from `true` in AND mode. Each operator switches the mode for the terms
//! that follow it:
//!
//! ```text
//! A || B && C   ==   (A || B) && C
//! A && B || C   ==   (A && B) || C
//! ```
//!
//! There is no AND-over-OR precedence. Existing shader assets rely on this,
//! so use explicit parentheses when mixing operators.

use crate::errors::SyntaxErrorKind;
use crate::resources::ShaderProperties;
use crate::utils::ShaderPropertyId;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term<'a> {
    Variable { name: &'a str, negated: bool },
    Group { terms: Vec<Term<'a>>, negated: bool },
    And,
    Or,
}

fn invalid(reason: impl Into<String>) -> SyntaxErrorKind {
    SyntaxErrorKind::InvalidExpression(reason.into())
}

/// Splits the expression into a tree of groups.
fn parse(expression: &str) -> Result<Vec<Term<'_>>, SyntaxErrorKind> {
    let bytes = expression.as_bytes();
    // Stack of open groups; the bottom entry is the implicit outer group.
    let mut stack: Vec<(Vec<Term<'_>>, bool)> = vec![(Vec::new(), false)];
    let mut negate_next = false;
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'(' => {
                stack.push((Vec::new(), negate_next));
                negate_next = false;
                pos += 1;
            }
            b')' => {
                if negate_next {
                    return Err(invalid("'!' must precede an identifier or a group"));
                }
                if stack.len() == 1 {
                    return Err(invalid("unbalanced ')'"));
                }
                if let Some((terms, negated)) = stack.pop()
                    && let Some((parent, _)) = stack.last_mut()
                {
                    parent.push(Term::Group { terms, negated });
                }
                pos += 1;
            }
            b'!' if bytes.get(pos + 1) != Some(&b'=') => {
                negate_next = !negate_next;
                pos += 1;
            }
            b'&' | b'|' => {
                if bytes.get(pos + 1) != Some(&c) {
                    return Err(invalid(format!("single '{}'", c as char)));
                }
                if negate_next {
                    return Err(invalid("'!' cannot negate an operator"));
                }
                if let Some((terms, _)) = stack.last_mut() {
                    terms.push(if c == b'&' { Term::And } else { Term::Or });
                }
                pos += 2;
            }
            _ => {
                let start = pos;
                while pos < bytes.len() {
                    let b = bytes[pos];
                    let is_negation = b == b'!' && bytes.get(pos + 1) != Some(&b'=');
                    if matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b'&' | b'|')
                        || is_negation
                    {
                        break;
                    }
                    // Keep "!=" inside the identifier.
                    pos += if b == b'!' { 2 } else { 1 };
                }
                let end = pos.min(bytes.len());
                if let Some((terms, _)) = stack.last_mut() {
                    terms.push(Term::Variable {
                        name: &expression[start..end],
                        negated: negate_next,
                    });
                }
                negate_next = false;
            }
        }
    }

    if negate_next {
        return Err(invalid("dangling '!'"));
    }
    if stack.len() != 1 {
        return Err(invalid("unbalanced '('"));
    }
    Ok(stack.pop().map(|(terms, _)| terms).unwrap_or_default())
}

/// Checks operand/operator alternation for one group.
fn validate(terms: &[Term<'_>]) -> Result<(), SyntaxErrorKind> {
    if terms.is_empty() {
        return Err(invalid("empty expression"));
    }
    let mut expect_operand = true;
    for term in terms {
        let is_operator = matches!(term, Term::And | Term::Or);
        if is_operator == expect_operand {
            return Err(invalid(if is_operator {
                "operator without left operand"
            } else {
                "missing operator between operands"
            }));
        }
        if let Term::Group { terms, .. } = term {
            validate(terms)?;
        }
        expect_operand = is_operator;
    }
    if expect_operand {
        return Err(invalid("operator without right operand"));
    }
    Ok(())
}

fn evaluate_terms(terms: &[Term<'_>], properties: &ShaderProperties) -> bool {
    let mut result = true;
    let mut and_mode = true;
    for term in terms {
        let value = match term {
            Term::And => {
                and_mode = true;
                continue;
            }
            Term::Or => {
                and_mode = false;
                continue;
            }
            Term::Variable { name, negated } => {
                let id = ShaderPropertyId::from_name(name);
                (properties.get_property_value_or(id, 0) != 0) != *negated
            }
            Term::Group { terms, negated } => evaluate_terms(terms, properties) != *negated,
        };
        result = if and_mode { result && value } else { result || value };
    }
    result
}

/// Evaluates a `@property` expression against `properties`.
pub(crate) fn evaluate(
    expression: &str,
    properties: &ShaderProperties,
) -> Result<bool, SyntaxErrorKind> {
    let terms = parse(expression)?;
    validate(&terms)?;
    Ok(evaluate_terms(&terms, properties))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(values: &[(&str, i32)]) -> ShaderProperties {
        ShaderProperties::from(values)
    }

    #[test]
    fn test_single_identifier() {
        let p = props(&[("FOO", 1), ("BAR", 0), ("BAZ", 7)]);
        assert_eq!(evaluate("FOO", &p), Ok(true));
        assert_eq!(evaluate("BAR", &p), Ok(false));
        assert_eq!(evaluate("BAZ", &p), Ok(true));
        assert_eq!(evaluate("MISSING", &p), Ok(false));
        assert_eq!(evaluate("!MISSING", &p), Ok(true));
    }

    #[test]
    fn test_groups_and_negation() {
        let p = props(&[("A", 1), ("B", 0)]);
        assert_eq!(evaluate("A && !B", &p), Ok(true));
        assert_eq!(evaluate("!(A && B)", &p), Ok(true));
        assert_eq!(evaluate("(A||B)&&(!B)", &p), Ok(true));
        assert_eq!(evaluate("!(A || B)", &p), Ok(false));
    }

    #[test]
    fn test_left_to_right_fold() {
        // With conventional precedence this would be A || (B && C) == true.
        let p = props(&[("A", 1), ("B", 0), ("C", 0)]);
        assert_eq!(evaluate("A || B && C", &p), Ok(false));

        // (A && B) || C
        let p = props(&[("A", 0), ("B", 1), ("C", 1)]);
        assert_eq!(evaluate("A && B || C", &p), Ok(true));
    }

    #[test]
    fn test_not_equal_is_not_negation() {
        let p = props(&[("A", 1)]);
        // "A!=B" is a single (unknown) identifier, not "A" and "!B".
        assert_eq!(evaluate("A!=B", &p), Ok(false));
    }

    #[test]
    fn test_syntax_errors() {
        let p = ShaderProperties::new();
        assert!(evaluate("", &p).is_err());
        assert!(evaluate("A &&", &p).is_err());
        assert!(evaluate("&& A", &p).is_err());
        assert!(evaluate("A B", &p).is_err());
        assert!(evaluate("A & B", &p).is_err());
        assert!(evaluate("(A", &p).is_err());
        assert!(evaluate("A)", &p).is_err());
        assert!(evaluate("!&& A", &p).is_err());
        assert!(evaluate("A && !", &p).is_err());
    }
}
