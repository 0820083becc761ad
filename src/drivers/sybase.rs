use std::iter::Peekable;
use std::path::Path;
use std::str::CharIndices;

use crate::config::ConnectOptions;
use crate::credentials::{self, CredentialKey};
use crate::error::{DbiError, Result};
use crate::sqsh::{parse_csv, Sqsh, SqshAuth};
use crate::traits::{BackendKind, BindShape, DatabaseDriver};
use crate::types::{Params, RawQueryResult, SqlValue};

/// The Sybase backend, reached through the `sqsh` client.
#[derive(Debug, Clone, Copy, Default)]
pub struct SybaseBackend;

impl BackendKind for SybaseBackend {
    fn name(&self) -> &'static str {
        "sybase"
    }

    /// A password is required: the explicit one, or the account's password file.
    fn connect(&self, options: &ConnectOptions) -> Result<Box<dyn DatabaseDriver>> {
        let password = match &options.password {
            Some(password) => password.clone(),
            None => {
                let key = CredentialKey::new(
                    options.server.as_deref().unwrap_or_default(),
                    options.database.as_deref().unwrap_or_default(),
                    options.user.as_deref().unwrap_or_default(),
                );
                let found = credentials::resolve_required(&options.auth_dir, &key)?;
                if options.verbose {
                    println!("{}", password_source_line(&found.path));
                }
                found.secret
            }
        };

        let sqsh = Sqsh::with_auth(options, SqshAuth::Password(password))?;
        Ok(Box::new(SybaseDriver::new(sqsh)))
    }

    fn placeholder(&self, column: &str) -> String {
        format!("@{column}")
    }

    fn supports_replace(&self) -> bool {
        false
    }

    fn bind_shape(&self) -> BindShape {
        BindShape::Named
    }

    fn default_server(&self) -> Option<&'static str> {
        Some("sqlsao")
    }

    fn default_user(&self) -> Option<&'static str> {
        Some("aca_ops")
    }

    fn default_database(&self) -> Option<&'static str> {
        Some("axafapstat")
    }
}

fn password_source_line(path: &Path) -> String {
    format!("Using password from {}", path.display())
}

/// Runs each statement as one `sqsh` invocation.
///
/// `sqsh` cannot bind parameters, so bound values are rendered into the
/// statement as literals. Every invocation is its own session and commits
/// when it exits, which makes [`DatabaseDriver::commit`] a no-op.
pub struct SybaseDriver {
    sqsh: Sqsh,
}

impl SybaseDriver {
    pub fn new(sqsh: Sqsh) -> Self {
        Self { sqsh }
    }
}

impl DatabaseDriver for SybaseDriver {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<RawQueryResult> {
        let sql = interpolate(sql, params)?;
        let lines = self.sqsh.fetch_lines(&sql)?;
        parse_csv(&lines)
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Substitute bound values for `?` (positional) or `@name` (named)
/// placeholders outside quoted strings and `--` comments.
///
/// Unmatched `@name` tokens are left alone since they may be T-SQL variables.
fn interpolate(sql: &str, params: &Params) -> Result<String> {
    if params.is_empty() {
        return Ok(sql.to_string());
    }

    let mut out = String::with_capacity(sql.len() + 16);
    let mut positional = match params {
        Params::Positional(values) => values.as_slice(),
        _ => &[],
    }
    .iter();
    let mut chars = sql.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((start, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match (c, params) {
            ('\'' | '"', _) => {
                quote = Some(c);
                out.push(c);
            }
            ('-', _) if chars.peek().is_some_and(|&(_, next)| next == '-') => {
                let end = sql[start..].find('\n').map_or(sql.len(), |i| start + i);
                out.push_str(&sql[start..end]);
                while chars.next_if(|&(i, _)| i < end).is_some() {}
            }
            ('?', Params::Positional(values)) => {
                let value = positional.next().ok_or_else(|| {
                    DbiError::Binding(format!(
                        "statement has more placeholders than the {} values supplied",
                        values.len()
                    ))
                })?;
                out.push_str(&literal(value)?);
            }
            ('@', Params::Named(values)) => {
                let len = identifier_len(&mut chars);
                let name = &sql[start..start + 1 + len];
                match values.iter().find(|(key, _)| key == name) {
                    Some((_, value)) => out.push_str(&literal(value)?),
                    None => out.push_str(name),
                }
            }
            _ => out.push(c),
        }
    }

    if let Params::Positional(values) = params {
        if positional.next().is_some() {
            return Err(DbiError::Binding(format!(
                "{} values supplied for fewer placeholders",
                values.len()
            )));
        }
    }

    Ok(out)
}

/// Consume identifier characters, returning their byte length.
fn identifier_len(chars: &mut Peekable<CharIndices<'_>>) -> usize {
    let mut len = 0;
    while let Some((_, c)) = chars.next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_') {
        len += c.len_utf8();
    }
    len
}

fn literal(value: &SqlValue) -> Result<String> {
    Ok(match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Float(f) if f.is_finite() => format!("{f:?}"),
        SqlValue::Float(f) => {
            return Err(DbiError::Binding(format!("{f} has no SQL literal form")));
        }
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlValue::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            format!("0x{hex}")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    fn named(pairs: &[(&str, SqlValue)]) -> Params {
        Params::Named(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_positional_interpolation() {
        let sql = interpolate(
            "select * from t where id = ? and mode = ? and note = '?'",
            &params![3, "it's"],
        )
        .unwrap();
        assert_eq!(
            sql,
            "select * from t where id = 3 and mode = 'it''s' and note = '?'"
        );
    }

    #[test]
    fn test_named_interpolation_leaves_unknown_variables() {
        let sql = interpolate(
            "INSERT INTO t (id,tstart) VALUES (@id,@tstart) select @@rowcount",
            &named(&[("@id", 1.into()), ("@tstart", 2.0.into())]),
        )
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO t (id,tstart) VALUES (1,2.0) select @@rowcount"
        );
    }

    #[test]
    fn test_line_comments_are_copied_verbatim() {
        let sql = interpolate(
            "select * from t -- don't match obsid = ?\nwhere id = ? and x = 1-2",
            &params![3],
        )
        .unwrap();
        assert_eq!(
            sql,
            "select * from t -- don't match obsid = ?\nwhere id = 3 and x = 1-2"
        );

        let sql = interpolate(
            "INSERT INTO t (id) VALUES (@id) -- trailing @id",
            &named(&[("@id", 1.into())]),
        )
        .unwrap();
        assert_eq!(sql, "INSERT INTO t (id) VALUES (1) -- trailing @id");
    }

    #[test]
    fn test_placeholder_count_mismatch() {
        assert!(matches!(
            interpolate("values (?, ?)", &params![1]),
            Err(DbiError::Binding(_))
        ));
        assert!(matches!(
            interpolate("values (?)", &params![1, 2]),
            Err(DbiError::Binding(_))
        ));
    }

    #[test]
    fn test_no_params_passes_through() {
        assert_eq!(interpolate("select '?' , ?", &Params::None).unwrap(), "select '?' , ?");
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal(&SqlValue::Null).unwrap(), "NULL");
        assert_eq!(literal(&SqlValue::Float(1e-7)).unwrap(), "1e-7");
        assert_eq!(literal(&SqlValue::Blob(vec![0xde, 0xad])).unwrap(), "0xdead");
        assert!(literal(&SqlValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_password_source_line() {
        assert_eq!(
            password_source_line(Path::new("/auth/sqlsao-axafapstat-aca_ops")),
            "Using password from /auth/sqlsao-axafapstat-aca_ops"
        );
    }

    #[test]
    fn test_capabilities() {
        let backend = SybaseBackend;
        assert_eq!(backend.placeholder("obsid"), "@obsid");
        assert!(!backend.supports_replace());
        assert_eq!(backend.bind_shape(), BindShape::Named);
    }
}
