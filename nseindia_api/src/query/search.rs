use super::Query;

/// Symbol lookup against the autocomplete route.
#[derive(Clone, Debug, Default)]
pub struct SearchQuery {
    pub q: String,
}

impl SearchQuery {
    pub fn new(q: &str) -> Self {
        Self { q: q.to_string() }
    }
}

impl Query for SearchQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![("q", self.q.clone())]
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    #[test]
    fn test_search_query() {
        let url = Url::parse("https://example.com/api/search/autocomplete").unwrap();
        insta::assert_snapshot!(
            SearchQuery::new("TATA MOTORS").add_to_url(&url).to_string(),
            @"https://example.com/api/search/autocomplete?q=TATA+MOTORS"
        );
    }
}
