//! Filtre textuel des requêtes de modification

use super::QueryError;

/// Phrases interdites, testées dans cet ordre sur la requête en minuscules
pub const STOP_PHRASES: [&str; 12] = [
    "update ",
    "drop ",
    "insert ",
    "create ",
    ";",
    "alter ",
    "deallocate ",
    "copy ",
    "move ",
    "import ",
    "reassign ",
    "grant ",
];

/// Vérifie la requête et la renvoie nettoyée (espaces et `;` finaux retirés)
///
/// Simple recherche de sous-chaînes: `select backdrop from t` est refusée,
/// `truncate t` passe. La transaction en lecture seule reste le vrai garde-fou.
pub fn check_query(query: &str) -> Result<&str, QueryError> {
    let stripped = strip_query(query);
    let lowered = stripped.to_lowercase();

    match STOP_PHRASES.iter().find(|phrase| lowered.contains(*phrase)) {
        Some(phrase) => Err(QueryError::UnsafeQuery((*phrase).to_string())),
        None => Ok(stripped),
    }
}

fn strip_query(query: &str) -> &str {
    query.trim().trim_end_matches(';').trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(query: &str) -> Option<String> {
        match check_query(query) {
            Err(QueryError::UnsafeQuery(phrase)) => Some(phrase),
            _ => None,
        }
    }

    #[test]
    fn test_select_with_trailing_semicolon_is_accepted() {
        assert_eq!(check_query("  select * from t ;; \n").unwrap(), "select * from t");
        assert_eq!(check_query("SELECT 1;").unwrap(), "SELECT 1");
    }

    #[test]
    fn test_stacked_statement_is_rejected() {
        assert_eq!(rejected("SELECT 1; DROP TABLE users").as_deref(), Some("drop "));
        assert_eq!(rejected("select 1; select 2").as_deref(), Some(";"));
    }

    #[test]
    fn test_modification_statements_are_rejected() {
        assert_eq!(rejected("UPDATE t SET a = 1").as_deref(), Some("update "));
        assert_eq!(rejected("insert into t values (1)").as_deref(), Some("insert "));
        assert_eq!(rejected("Create Table x (a int)").as_deref(), Some("create "));
        assert_eq!(rejected("GRANT all ON t TO bob").as_deref(), Some("grant "));
        assert_eq!(rejected("copy t to '/tmp/x'").as_deref(), Some("copy "));
    }

    #[test]
    fn test_heuristic_false_positive_and_negative() {
        assert_eq!(rejected("select drop_id from t").as_deref(), None);
        assert_eq!(rejected("select backdrop from t").as_deref(), Some("drop "));
        assert_eq!(rejected("select 'drop me' from t").as_deref(), Some("drop "));
        assert!(check_query("truncate t").is_ok());
    }

    #[test]
    fn test_first_phrase_in_list_order_wins() {
        assert_eq!(rejected("drop table t; update t set a=1").as_deref(), Some("update "));
    }
}
