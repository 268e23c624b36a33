//! SQL generation utilities.

/// Quote a MySQL identifier with backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Whether `name` is a plain identifier: ASCII letters, digits and `_`.
pub fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The select list of a resource query.
///
/// Plain columns are qualified with the table alias; computed columns are
/// sub-selects rendered as `(…) AS ALIAS`.
///
/// ```rust
/// use bitrix_query::sql::SelectBuilder;
///
/// let sql = SelectBuilder::new("b_catalog_product", "p")
///     .columns(&["ID", "QUANTITY"])
///     .computed("PRICE", "SELECT PRICE FROM b_catalog_price WHERE PRODUCT_ID = p.ID LIMIT 1")
///     .build();
/// assert_eq!(
///     sql,
///     "SELECT p.ID, p.QUANTITY, \
///      (SELECT PRICE FROM b_catalog_price WHERE PRODUCT_ID = p.ID LIMIT 1) AS PRICE \
///      FROM b_catalog_product p"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SelectBuilder<'a> {
    table: &'a str,
    alias: &'a str,
    columns: Vec<&'a str>,
    computed: Vec<(&'a str, &'a str)>,
}

impl<'a> SelectBuilder<'a> {
    /// Start a select from `table alias`.
    pub fn new(table: &'a str, alias: &'a str) -> Self {
        Self {
            table,
            alias,
            columns: Vec::new(),
            computed: Vec::new(),
        }
    }

    /// Add plain columns.
    pub fn columns(mut self, columns: &[&'a str]) -> Self {
        self.columns.extend_from_slice(columns);
        self
    }

    /// Add a sub-select column.
    pub fn computed(mut self, alias: &'a str, subquery: &'a str) -> Self {
        self.computed.push((alias, subquery));
        self
    }

    /// Render `SELECT … FROM table alias`.
    pub fn build(&self) -> String {
        let mut sql = String::with_capacity(64 + self.columns.len() * 16);
        sql.push_str("SELECT ");
        let mut first = true;
        for column in &self.columns {
            if !first {
                sql.push_str(", ");
            }
            first = false;
            sql.push_str(self.alias);
            sql.push('.');
            sql.push_str(column);
        }
        for (alias, subquery) in &self.computed {
            if !first {
                sql.push_str(", ");
            }
            first = false;
            sql.push('(');
            sql.push_str(subquery);
            sql.push_str(") AS ");
            sql.push_str(alias);
        }
        sql.push_str(" FROM ");
        sql.push_str(self.table);
        sql.push(' ');
        sql.push_str(self.alias);
        sql
    }
}
