use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Literal {
    Int(i32),
    Real(f64),
    Str(String),
}

/// Format a real so that it always carries a decimal point (`120.0`, not
/// `120`), keeping the text re-lexable as a real literal.
pub fn format_real(value: f64) -> String {
    if value.is_finite() && value == value.trunc() {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Real(value) => f.write_str(&format_real(*value)),
            Literal::Str(value) => write!(f, "\"{value}\""),
        }
    }
}
