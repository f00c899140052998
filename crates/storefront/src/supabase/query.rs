//! PostgREST query-string builder.
//!
//! Filters use PostgREST's `column=op.value` syntax. Values are appended with
//! `url`'s form encoder, so commas and parentheses in `select` survive intact.

use std::fmt::Display;

use url::Url;

/// A table request: target table plus query parameters.
#[derive(Debug, Clone)]
pub(crate) struct RestQuery {
    table: &'static str,
    params: Vec<(String, String)>,
}

impl RestQuery {
    pub(crate) const fn table(table: &'static str) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    /// `select=<columns>`; embedded relations use `alias:table(cols)`.
    pub(crate) fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_owned(), columns.to_owned()));
        self
    }

    /// `<column>=eq.<value>`.
    pub(crate) fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// `order=<column>.desc` or `.asc`.
    pub(crate) fn order(mut self, column: &str, descending: bool) -> Self {
        let direction = if descending { "desc" } else { "asc" };
        self.params
            .push(("order".to_owned(), format!("{column}.{direction}")));
        self
    }

    pub(crate) fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_owned(), limit.to_string()));
        self
    }

    /// `on_conflict=<columns>` for upserts.
    pub(crate) fn on_conflict(mut self, columns: &str) -> Self {
        self.params
            .push(("on_conflict".to_owned(), columns.to_owned()));
        self
    }

    pub(crate) const fn table_name(&self) -> &'static str {
        self.table
    }

    /// Resolve against the `/rest/v1/` base URL.
    pub(crate) fn to_url(&self, rest_base: &Url) -> Result<Url, url::ParseError> {
        let mut url = rest_base.join(self.table)?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

/// Parse the total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub(crate) fn parse_content_range_total(header: &str) -> Option<u64> {
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://abc.supabase.co/rest/v1/").unwrap()
    }

    #[test]
    fn test_builds_filtered_select() {
        let url = RestQuery::table("cart_items")
            .select("id,product_id,quantity,product:products(id,name)")
            .eq("user_id", "42")
            .order("created_at", true)
            .to_url(&base())
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/cart_items");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "select".to_owned(),
                    "id,product_id,quantity,product:products(id,name)".to_owned()
                ),
                ("user_id".to_owned(), "eq.42".to_owned()),
                ("order".to_owned(), "created_at.desc".to_owned()),
            ]
        );
    }

    #[test]
    fn test_no_params_no_query_string() {
        let url = RestQuery::table("products").to_url(&base()).unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/products");
    }

    #[test]
    fn test_upsert_conflict_target() {
        let url = RestQuery::table("cart_items")
            .on_conflict("user_id,product_id")
            .to_url(&base())
            .unwrap();
        assert_eq!(url.query(), Some("on_conflict=user_id%2Cproduct_id"));
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
