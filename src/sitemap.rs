use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::error::{BotError, Result};
use crate::slug;

/// Every `<loc>` of the storefront's `sitemap.xml`.
pub async fn fetch_locations(client: &Client, base_url: &str) -> Result<Vec<String>> {
    let sitemap_url = format!("{}/sitemap.xml", base_url.trim_end_matches('/'));

    let response = client.get(&sitemap_url).send().await?;
    if !response.status().is_success() {
        return Err(BotError::HttpStatus {
            status: response.status(),
            url: sitemap_url,
        });
    }
    let body = response.text().await?;

    let urls = parse_locations(&body);
    info!(count = urls.len(), "read sitemap");
    Ok(urls)
}

pub fn parse_locations(body: &str) -> Vec<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut urls = Vec::new();
    // `&amp;` and friends arrive as separate events between text chunks
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(Event::Text(e)) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some(loc) = current.as_mut() {
                    push_reference(loc, &e);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"loc" => {
                if let Some(loc) = current.take() {
                    let loc = loc.trim();
                    if !loc.is_empty() {
                        urls.push(loc.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "stopping at malformed sitemap");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    urls
}

fn push_reference(out: &mut String, reference: &BytesRef<'_>) {
    if let Ok(Some(c)) = reference.resolve_char_ref() {
        out.push(c);
        return;
    }
    let name = String::from_utf8_lossy(reference);
    match resolve_predefined_entity(&name) {
        Some(text) => out.push_str(text),
        None => {
            out.push('&');
            out.push_str(&name);
            out.push(';');
        }
    }
}

fn page_name(loc: &str) -> Option<String> {
    let url = Url::parse(loc).ok()?;
    let last = url.path_segments()?.next_back()?;
    Some(percent_decode_str(last).decode_utf8_lossy().into_owned())
}

/// Finds the published page of a product.
///
/// An exact `{slug}.html` match wins; otherwise the first product page
/// whose name ends with the cleaned SKU is taken.
pub fn resolve_product_url(locations: &[String], slug: &str, sku: &str) -> Option<String> {
    let exact = format!("{slug}.html");
    let sku_suffix = format!("-{}.html", slug::clean_sku(sku));

    let pages: Vec<(&String, String)> = locations
        .iter()
        .filter(|loc| loc.contains("/products/"))
        .filter_map(|loc| page_name(loc).map(|name| (loc, name)))
        .collect();

    pages
        .iter()
        .find(|(_, name)| *name == exact)
        .or_else(|| {
            (sku_suffix.len() > "-.html".len())
                .then(|| pages.iter().find(|(_, name)| name.ends_with(&sku_suffix)))
                .flatten()
        })
        .map(|(loc, _)| loc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://shop.example.com/</loc></url>
  <url>
    <loc>
      https://shop.example.com/products/%D9%85%D9%8A%D8%B2%D8%A7%D9%86-%D8%A7%D9%84%D8%B7%D8%B9%D8%A7%D9%85-a001247.html
    </loc>
    <lastmod>2026-10-01</lastmod>
  </url>
  <url><loc>https://shop.example.com/products/old-name-a001147.html</loc></url>
  <url><loc>https://shop.example.com/categories/a001147.html</loc></url>
</urlset>"#;

    #[test]
    fn parses_all_locations() {
        let locs = parse_locations(SITEMAP);
        assert_eq!(locs.len(), 4);
        assert_eq!(locs[0], "https://shop.example.com/");
        assert!(locs[1].ends_with("-a001247.html"));
    }

    #[test]
    fn exact_slug_match_is_found_through_percent_encoding() {
        let locs = parse_locations(SITEMAP);
        let url = resolve_product_url(&locs, "ميزان-الطعام-a001247", "A.001247").unwrap();
        assert_eq!(url, locs[1]);
    }

    #[test]
    fn falls_back_to_sku_suffix_on_product_pages_only() {
        let locs = parse_locations(SITEMAP);
        let url = resolve_product_url(&locs, "قطاعة-a001147", "A.001147").unwrap();
        assert_eq!(url, "https://shop.example.com/products/old-name-a001147.html");
    }

    #[test]
    fn unknown_product_is_none() {
        let locs = parse_locations(SITEMAP);
        assert_eq!(resolve_product_url(&locs, "x-a999", "A.999"), None);
        assert_eq!(resolve_product_url(&locs, "x", ""), None);
    }

    #[test]
    fn entity_references_stay_inside_one_location() {
        let locs = parse_locations(
            "<urlset><url><loc>https://a.example/products/x.html?a=1&amp;b=2&#38;c=3</loc></url></urlset>",
        );
        assert_eq!(locs, ["https://a.example/products/x.html?a=1&b=2&c=3"]);
    }

    #[test]
    fn malformed_xml_keeps_what_was_read() {
        let locs = parse_locations("<urlset><url><loc>https://a.example/products/x.html</loc></url><url><loc>");
        assert_eq!(locs, vec!["https://a.example/products/x.html"]);
    }
}
