//! Store-backed rules: `exists:table[,column]` and
//! `unique:table[,column[,ignoreId[,idColumn]]]`

use crate::engine::{as_text, RuleContext};
use crate::traits::StoreQuery;

fn lookup<'a>(ctx: &'a RuleContext<'a>) -> Option<(&'a dyn StoreQuery, &'a str, &'a str, String)> {
    let Some(store) = ctx.store else {
        tracing::warn!(field = ctx.field, "no store configured; store-backed rule fails");
        return None;
    };
    let table = ctx.param(0)?;
    let column = ctx
        .param(1)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| ctx.field.rsplit('.').next().unwrap_or(ctx.field));
    let value = as_text(ctx.value?)?;
    Some((store, table, column, value))
}

pub fn exists(ctx: &RuleContext<'_>) -> bool {
    lookup(ctx).is_some_and(|(store, table, column, value)| {
        store.count(table, column, &value, None) > 0
    })
}

pub fn unique(ctx: &RuleContext<'_>) -> bool {
    let Some((store, table, column, value)) = lookup(ctx) else {
        return false;
    };
    let exclude = ctx
        .param(2)
        .filter(|id| !id.is_empty() && *id != "NULL")
        .map(|id| (ctx.param(3).unwrap_or("id"), id));
    store.count(table, column, &value, exclude) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use crate::rules::RuleSpec;
    use crate::traits::memory::MemoryStore;
    use serde_json::{json, Value};
    use tracing_test::traced_test;

    fn check(store: Option<&dyn StoreQuery>, data: &Value, field: &str, token: &str) -> bool {
        let spec = RuleSpec::parse(field, token).unwrap();
        let ctx = RuleContext {
            field,
            value: path::resolve(data, field),
            params: &spec.params,
            pattern: None,
            data,
            numeric: false,
            store,
        };
        if spec.name == "exists" {
            exists(&ctx)
        } else {
            unique(&ctx)
        }
    }

    fn users() -> MemoryStore {
        MemoryStore::default()
            .with_row("users", &[("id", "1"), ("email", "ada@example.com")])
            .with_row("users", &[("id", "2"), ("email", "bob@example.com")])
    }

    #[test]
    fn test_exists_defaults_column_to_field_name() {
        let store = users();
        let data = json!({"user": {"email": "ada@example.com"}});
        assert!(check(Some(&store), &data, "user.email", "exists:users"));
        assert!(!check(Some(&store), &json!({"email": "eve@example.com"}), "email", "exists:users"));
    }

    #[test]
    fn test_exists_with_explicit_column() {
        let store = users();
        assert!(check(Some(&store), &json!({"author": 2}), "author", "exists:users,id"));
        assert!(!check(Some(&store), &json!({"author": 9}), "author", "exists:users,id"));
    }

    #[test]
    fn test_unique_with_ignored_row() {
        let store = users();
        let data = json!({"email": "ada@example.com"});
        assert!(!check(Some(&store), &data, "email", "unique:users"));
        assert!(check(Some(&store), &data, "email", "unique:users,email,1"));
        assert!(!check(Some(&store), &data, "email", "unique:users,email,2,id"));
        assert!(check(Some(&store), &json!({"email": "new@example.com"}), "email", "unique:users"));
    }

    #[traced_test]
    #[test]
    fn test_missing_store_fails_and_warns() {
        let data = json!({"email": "ada@example.com"});
        assert!(!check(None, &data, "email", "exists:users"));
        assert!(!check(None, &data, "email", "unique:users"));
        assert!(logs_contain("no store configured"));
    }
}
