//! Results page parsing.

use log::debug;
use scraper::ElementRef;
use scraper::Html;
use scraper::Selector;
use serde::Deserialize;

use crate::listing::Ad;
use crate::listing::error::ListingError;
use crate::listing::query::selector;

/// JSON envelope returned by the listings endpoint.
#[derive(Deserialize, Debug)]
struct ListingEnvelope {
    listing: String,
}

struct AdSelectors {
    node: Selector,
    name: Selector,
    price: Selector,
    image: Selector,
    date: Selector,
}

impl AdSelectors {
    fn new() -> Result<Self, ListingError> {
        Ok(Self {
            node: selector(r#"[itemtype="http://schema.org/Product"]"#)?,
            name: selector(r#"[itemprop="name"]"#)?,
            price: selector(r#"[itemprop="price"]"#)?,
            image: selector(r#"[itemprop="image"]"#)?,
            date: selector(".announcement-block__date")?,
        })
    }
}

/// Extracts the `listing` HTML fragment from the endpoint response body.
pub fn parse_envelope(body: &str) -> Result<String, ListingError> {
    let envelope: ListingEnvelope = serde_json::from_str(body)
        .map_err(|e| ListingError::parse_failure(format!("invalid listing envelope: {e}")))?;
    Ok(envelope.listing)
}

/// Parses every ad node of a listing fragment, in document order.
///
/// A node missing a required field is skipped, or fails the whole page when `strict` is set.
pub fn parse_listing(html: &str, strict: bool) -> Result<Vec<Ad>, ListingError> {
    let sels = AdSelectors::new()?;
    let fragment = Html::parse_fragment(html);

    let mut ads = Vec::new();
    for (position, node) in fragment.select(&sels.node).enumerate() {
        match parse_ad(node, &sels) {
            Ok(ad) => ads.push(ad),
            Err(field) if strict => {
                return Err(ListingError::parse_failure(format!(
                    "ad #{position} is missing `{field}`"
                )));
            }
            Err(field) => debug!("Skipping ad #{position}: missing `{field}`"),
        }
    }
    Ok(ads)
}

/// Returns the name of the first missing required field on failure.
fn parse_ad(node: ElementRef, sels: &AdSelectors) -> Result<Ad, &'static str> {
    let name_el = node.select(&sels.name).next().ok_or("name")?;
    let identity = name_el
        .value()
        .attr("href")
        .filter(|h| !h.is_empty())
        .ok_or("href")?
        .to_string();
    let name = name_el.text().collect::<String>().trim().to_string();

    let price = node
        .select(&sels.price)
        .next()
        .and_then(|e| e.value().attr("content"))
        .ok_or("price")?
        .to_string();

    let image = node
        .select(&sels.image)
        .next()
        .and_then(|e| e.value().attr("src"))
        .unwrap_or_default()
        .to_string();

    let posted_label = node
        .select(&sels.date)
        .next()
        .map(|e| posted_label(&e.text().collect::<String>()))
        .unwrap_or_default();

    Ok(Ad {
        identity,
        name,
        price,
        image,
        posted_label,
    })
}

/// Trimmed label up to the first comma, e.g. `Today 12:30, Limassol` -> `Today 12:30`.
fn posted_label(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .split(',')
        .next()
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
