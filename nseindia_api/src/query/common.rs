//! Shared query infrastructure: the [`Query`] trait.

use url::Url;

/// Trait implemented by all query builders. A query is an ordered list of
/// the parameters that were actually set; unset optionals are left out.
pub trait Query {
    /// Query parameters in the order they are sent.
    fn pairs(&self) -> Vec<(&'static str, String)>;

    /// Appends this query's parameters to the given URL, returning the modified URL.
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        let pairs = self.pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs.iter() {
                query.append_pair(key, value);
            }
        }
        url
    }
}
