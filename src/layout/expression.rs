//! Binding expression detection and validation

/// How an attribute value takes part in data binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingValue<'a> {
    /// Ordinary attribute value
    Plain,
    /// `@{expr}`
    OneWay(&'a str),
    /// `@={expr}`
    TwoWay(&'a str),
}

impl<'a> BindingValue<'a> {
    pub fn expression(&self) -> Option<&'a str> {
        match self {
            BindingValue::Plain => None,
            BindingValue::OneWay(expr) | BindingValue::TwoWay(expr) => Some(expr),
        }
    }

    pub fn is_two_way(&self) -> bool {
        matches!(self, BindingValue::TwoWay(_))
    }
}

/// Classify an attribute value, validating any binding expression it holds
pub fn classify(value: &str) -> Result<BindingValue<'_>, String> {
    let (body, two_way) = if let Some(rest) = value.strip_prefix("@={") {
        (rest, true)
    } else if let Some(rest) = value.strip_prefix("@{") {
        (rest, false)
    } else {
        return Ok(BindingValue::Plain);
    };

    let expr = body
        .strip_suffix('}')
        .ok_or_else(|| format!("expression `{}` is missing its closing '}}'", value))?
        .trim();

    if expr.is_empty() {
        return Err("empty binding expression".to_string());
    }

    check_balanced(expr)?;

    Ok(if two_way {
        BindingValue::TwoWay(expr)
    } else {
        BindingValue::OneWay(expr)
    })
}

/// Brackets must nest and string literals must be closed
fn check_balanced(expr: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in expr.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("unbalanced '{}' in `{}`", c, expr));
                }
            }
            _ => {}
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {} literal in `{}`", q, expr));
    }
    if let Some(open) = stack.pop() {
        return Err(format!("unclosed '{}' in `{}`", open, expr));
    }

    Ok(())
}
