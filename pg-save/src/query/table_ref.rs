//! Référence de table `schema.table` avec les règles de casse PostgreSQL

use std::fmt;
use std::str::FromStr;

use super::QueryError;

pub const DEFAULT_SCHEMA: &str = "public";

/// Table éventuellement qualifiée par son schéma
///
/// Les identifiants non quotés sont mis en minuscules, les identifiants
/// entre guillemets gardent leur casse (`""` pour un guillemet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Schéma effectif pour les requêtes de catalogue
    pub fn schema_or_default(&self) -> &str {
        self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }

    /// Forme SQL quotée, utilisable dans une clause FROM
    pub fn sql(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for TableRef {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QueryError::InvalidTableName(s.to_string());

        let mut parts: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut was_quoted = false;
        let mut chars = s.trim().chars().peekable();

        while let Some(c) = chars.next() {
            match (c, quoted) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                ('"', true) => quoted = false,
                ('"', false) if current.is_empty() && !was_quoted => {
                    quoted = true;
                    was_quoted = true;
                }
                ('.', false) => {
                    parts.push(finish_part(&mut current, was_quoted).ok_or_else(invalid)?);
                    was_quoted = false;
                }
                (c, true) => current.push(c),
                (c, false) if was_quoted || c == '"' || c.is_whitespace() => return Err(invalid()),
                (c, false) => current.push(c),
            }
        }
        if quoted {
            return Err(invalid());
        }
        parts.push(finish_part(&mut current, was_quoted).ok_or_else(invalid)?);

        match parts.len() {
            1 => Ok(Self {
                schema: None,
                name: parts.remove(0),
            }),
            2 => {
                let name = parts.remove(1);
                Ok(Self {
                    schema: Some(parts.remove(0)),
                    name,
                })
            }
            _ => Err(invalid()),
        }
    }
}

fn finish_part(current: &mut String, was_quoted: bool) -> Option<String> {
    let part = std::mem::take(current);
    if part.is_empty() {
        None
    } else if was_quoted {
        Some(part)
    } else {
        Some(part.to_lowercase())
    }
}

/// Quote un identifiant SQL
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> TableRef {
        s.parse().unwrap()
    }

    #[test]
    fn test_unqualified_is_lowercased() {
        assert_eq!(parse("Parcelles"), TableRef::new(None, "parcelles"));
        assert_eq!(parse("Parcelles").schema_or_default(), "public");
    }

    #[test]
    fn test_qualified_and_quoted() {
        assert_eq!(parse("cadastre.parcelles"), TableRef::new(Some("cadastre"), "parcelles"));
        assert_eq!(parse(r#""My Schema"."Odd""Name""#), TableRef::new(Some("My Schema"), r#"Odd"Name"#));
        assert_eq!(parse(r#""a.b""#), TableRef::new(None, "a.b"));
    }

    #[test]
    fn test_sql_is_quoted() {
        assert_eq!(parse("cadastre.parcelles").sql(), r#""cadastre"."parcelles""#);
        assert_eq!(parse(r#""Odd""Name""#).sql(), r#""Odd""Name""#);
    }

    #[test]
    fn test_invalid_names() {
        for s in ["", "a.b.c", ".t", "t.", "\"open", "a b", "\"x\"y", "t; drop"] {
            assert!(
                matches!(s.parse::<TableRef>(), Err(QueryError::InvalidTableName(_))),
                "{s:?} should be rejected"
            );
        }
    }
}
