//! Seams the validator calls out through

/// Row lookup used by `exists` and `unique`
///
/// Implementations count rows in `table` whose `column` equals `value`,
/// optionally ignoring rows where `exclude.0 == exclude.1` (the
/// `unique:table,column,ignoreId,idColumn` form).
pub trait StoreQuery: Send + Sync {
    fn count(&self, table: &str, column: &str, value: &str, exclude: Option<(&str, &str)>) -> u64;
}

impl<T: StoreQuery + ?Sized> StoreQuery for std::sync::Arc<T> {
    fn count(&self, table: &str, column: &str, value: &str, exclude: Option<(&str, &str)>) -> u64 {
        (**self).count(table, column, value, exclude)
    }
}
