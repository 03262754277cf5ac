//! Search URL decomposition.

use scraper::Html;
use scraper::Selector;
use url::Url;

use crate::listing::Category;
use crate::listing::SearchQuery;
use crate::listing::error::ListingError;

const ATTR_SEPARATOR: &str = "---";
const ATTR_PREFIX: &str = "attrs_";
const PAGE_PARAM: &str = "page";

/// Parses `raw` and checks that it points at `domain` (or one of its subdomains).
pub fn parse_search_url(raw: &str, domain: &str) -> Result<Url, ListingError> {
    let unsupported = || ListingError::UnsupportedUrl {
        url: raw.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|_| unsupported())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(unsupported());
    }

    let host = url.host_str().ok_or_else(unsupported)?;
    let domain = domain.trim_start_matches("www.");
    if host == domain || host.ends_with(&format!(".{domain}")) {
        Ok(url)
    } else {
        Err(unsupported())
    }
}

/// Extracts `attrs_<key> = value` pairs from `key---value` path segments, in path order.
pub fn path_attrs(url: &Url) -> Vec<(String, String)> {
    let Some(segments) = url.path_segments() else {
        return Vec::new();
    };

    segments
        .filter(|segment| segment.contains(ATTR_SEPARATOR))
        .filter_map(|segment| {
            let mut pieces = segment.split(ATTR_SEPARATOR);
            let key = pieces.next().filter(|k| !k.is_empty())?;
            let value = pieces.next().unwrap_or_default();
            Some((format!("{ATTR_PREFIX}{key}"), value.to_string()))
        })
        .collect()
}

/// Query-string pairs of the search URL, decoded, in order.
///
/// `page` is dropped since every request names its own page.
pub fn query_filters(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .filter(|(k, _)| *k != PAGE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Reads the hidden category fields and the page count from a search page.
pub fn parse_search_page(html: &str) -> Result<(Category, u32), ListingError> {
    let document = Html::parse_document(html);

    let rubric = hidden_field(&document, "rubric")?;
    let c = hidden_field(&document, "c")?;

    let pages = selector(".page-number[data-page]")?;
    let page_count = document
        .select(&pages)
        .last()
        .and_then(|e| e.value().attr("data-page"))
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);

    Ok((Category { rubric, c }, page_count))
}

/// Combines the URL and its search page into a [`SearchQuery`].
pub fn decompose(url: &Url, search_page: &str) -> Result<SearchQuery, ListingError> {
    let (category, page_count) = parse_search_page(search_page)?;
    Ok(SearchQuery {
        category,
        page_count,
        filters: query_filters(url),
        attrs: path_attrs(url),
    })
}

fn hidden_field(document: &Html, name: &str) -> Result<String, ListingError> {
    let sel = selector(&format!("input[name=\"{name}\"]"))?;
    document
        .select(&sel)
        .next()
        .and_then(|e| e.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| ListingError::parse_failure(format!("missing hidden field `{name}`")))
}

pub(crate) fn selector(css: &str) -> Result<Selector, ListingError> {
    Selector::parse(css)
        .map_err(|e| ListingError::parse_failure(format!("invalid selector `{css}`: {e}")))
}
