use crate::types::SqlValue;

/// Bound values for one statement.
///
/// Positional values fill `?` placeholders in order. Named values are keyed by
/// the placeholder exactly as written in the SQL text, sigil included
/// (`":id"`, `"@id"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<SqlValue>),
    Named(Vec<(String, SqlValue)>),
}

impl Params {
    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(values) => values.is_empty(),
            Params::Named(values) => values.is_empty(),
        }
    }
}

impl std::fmt::Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Params::None => Ok(()),
            Params::Positional(values) => {
                f.write_str("(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            Params::Named(values) => {
                f.write_str("{")?;
                for (i, (k, v)) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<Vec<SqlValue>> for Params {
    fn from(values: Vec<SqlValue>) -> Self {
        Params::Positional(values)
    }
}

impl From<Vec<(String, SqlValue)>> for Params {
    fn from(values: Vec<(String, SqlValue)>) -> Self {
        Params::Named(values)
    }
}

/// Builds [`Params::Positional`] from a list of values convertible to [`SqlValue`].
///
/// ```
/// let params = dbirs::params![1, "npnt", 2.5];
/// assert_eq!(params.to_string(), "(1, npnt, 2.5)");
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::types::Params::None
    };
    ($($value:expr),+ $(,)?) => {
        $crate::types::Params::Positional(vec![$($crate::types::SqlValue::from($value)),+])
    };
}
