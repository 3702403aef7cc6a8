use url::form_urlencoded;

/// Encodes text for a query string, spaces as `+`
pub fn encode_query(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

/// Replaces `{key}` placeholders in a URL template
///
/// Values are inserted as given; callers encode them first where needed.
///
/// # Examples
///
/// ```
/// use customer_scout::url::{encode_query, fill_template};
///
/// let url = fill_template(
///     "https://search.test/html/?q={query}",
///     &[("query", &encode_query("\"Acme\" customers"))],
/// );
/// assert_eq!(url, "https://search.test/html/?q=%22Acme%22+customers");
/// ```
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
}
