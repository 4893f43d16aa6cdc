//! Post text composition.

use crate::feed::Product;

/// Hard limit of the posting API, counted in characters.
pub const MAX_POST_CHARS: usize = 280;

const ELLIPSIS: char = '…';
const STRIKE: char = '\u{0336}';

/// Rounded discount percentage, only when `old > new > 0`.
pub fn discount_percent(price: f64, old_price: Option<f64>) -> Option<u32> {
    let old = old_price?;
    if !(old > price && price > 0.0) {
        return None;
    }
    Some(((old - price) / old * 100.0).round() as u32)
}

/// Whole amount with `,` thousands separators: `25000.0` → `25,000`.
pub fn format_price(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn strikethrough(text: &str) -> String {
    text.chars().flat_map(|c| [c, STRIKE]).collect()
}

/// Caps `text` at [`MAX_POST_CHARS`], replacing the tail with an ellipsis.
///
/// The cut is made on a character boundary but may land inside a word, a
/// hashtag or the link.
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_POST_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_POST_CHARS - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Builds the promotional post for `product`.
pub fn compose(product: &Product, url: &str, hashtags: &[String], currency: &str) -> String {
    let mut price_line = format!("💰 {} {currency}", format_price(product.price));
    if let Some(discount) = discount_percent(product.price, product.old_price) {
        let old = format_price(product.old_price.unwrap_or_default());
        price_line.push_str(&format!(" ❌ {} 🔥 خصم {discount}%", strikethrough(&old)));
    }

    let mut seen = Vec::with_capacity(hashtags.len());
    for tag in hashtags {
        if !seen.contains(&tag.as_str()) {
            seen.push(tag.as_str());
        }
    }

    let text = format!(
        "🛒 {}\n{price_line}\n\n🔗 {url}\n\n{}",
        product.title,
        seen.join(" ")
    );
    truncate(text.trim_end())
}
