//! RFC 8288 `Link` header pagination
//!
//! GitHub, GitLab and Forgejo return the next page URL in a `Link` header.

use super::tracker::{check_response, LIST_TIMEOUT};
use crate::Result;
use reqwest::header::{HeaderMap, LINK};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// Extract the `rel="next"` target from a `Link` header value
pub fn parse_next_link(value: &str) -> Option<String> {
    value.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = segments.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"'))
                .is_some_and(|rel| rel.split_whitespace().any(|r| r == "next"))
        });
        is_next.then(|| url.to_string())
    })
}

/// Next page URL from response headers
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(parse_next_link)
}

/// Fetch every page of a JSON array endpoint.
///
/// `follow` builds the request for a next-page URL (with authentication).
pub(crate) async fn collect_pages<T, F>(
    instance: &str,
    first: RequestBuilder,
    follow: F,
) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&str) -> RequestBuilder,
{
    let mut items = Vec::new();
    let mut request = Some(first);
    let mut pages = 0usize;

    while let Some(req) = request.take() {
        let response = check_response(instance, req.timeout(LIST_TIMEOUT).send().await?).await?;
        let current = response.url().to_string();
        let next = next_link(response.headers()).filter(|url| *url != current);

        let page: Vec<T> = response.json().await?;
        pages += 1;
        items.extend(page);

        request = next.as_deref().map(&follow);
    }

    tracing::debug!(instance = %instance, pages, items = items.len(), "Fetched paginated results");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://api.github.com/repositories/1/issues?page=2>; rel="next", <https://api.github.com/repositories/1/issues?page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/repositories/1/issues?page=2")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let header = r#"<https://gitlab.com/api/v4/projects/1/issues?page=1>; rel="first", <https://gitlab.com/api/v4/projects/1/issues?page=1>; rel="prev""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn test_unquoted_and_multi_rel() {
        assert_eq!(
            parse_next_link("<https://codeberg.org/api/v1/x?page=3>; rel=next").as_deref(),
            Some("https://codeberg.org/api/v1/x?page=3")
        );
        assert_eq!(
            parse_next_link(r#"<https://x/y?page=2>; rel="prev next""#).as_deref(),
            Some("https://x/y?page=2")
        );
    }

    #[test]
    fn test_next_link_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(r#"<https://x/y?page=2>; rel="next""#),
        );
        assert_eq!(next_link(&headers).as_deref(), Some("https://x/y?page=2"));
        assert_eq!(next_link(&HeaderMap::new()), None);
    }
}
