pub mod mysql;
pub mod postgres;
pub mod table;
pub mod traits;

/// Double quotes an identifier for PostgreSQL.
pub fn quote_pg(ident: &str) -> String {
    return format!("\"{}\"", ident.replace('"', "\"\""));
}

/// Back quotes an identifier for MySQL.
pub fn quote_mysql(ident: &str) -> String {
    return format!("`{}`", ident.replace('`', "``"));
}
