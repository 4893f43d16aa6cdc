use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde_json::json;

use crate::compose::{discount_percent, format_price};
use crate::config::Config;
use crate::feed::Product;

use super::templates::{self, COMMON_CSS, Layout};
use super::Category;

/// A product together with the slug it was published under.
pub struct Entry<'a> {
    pub product: &'a Product,
    pub slug: String,
}

fn price_html(config: &Config, product: &Product) -> String {
    let current = format!("{} {}", format_price(product.price), text(&config.currency));
    match (discount_percent(product.price, product.old_price), product.old_price) {
        (Some(_), Some(old)) => format!(
            "{current} <del>{} {}</del>",
            format_price(old),
            text(&config.currency)
        ),
        _ => current,
    }
}

fn json_ld(value: &serde_json::Value) -> String {
    // `</script>` inside a string value would end the block early.
    value.to_string().replace("</", "<\\/")
}

pub fn product_schema(config: &Config, product: &Product, page_url: &str) -> serde_json::Value {
    let mut schema = json!({
        "@context": "https://schema.org/",
        "@type": "Product",
        "name": product.title,
        "description": product.description,
        "sku": product.sku,
        "brand": { "@type": "Brand", "name": config.store_name },
        "offers": {
            "@type": "Offer",
            "url": page_url,
            "priceCurrency": config.currency_code,
            "price": format!("{:.0}", product.price),
            "availability": "https://schema.org/InStock",
            "itemCondition": "https://schema.org/NewCondition",
            "seller": { "@type": "Organization", "name": config.store_name }
        }
    });
    if let Some(image) = &product.image {
        schema["image"] = json!([image]);
    }
    schema
}

pub fn product_page(config: &Config, layout: &Layout, entry: &Entry<'_>, category: &Category) -> String {
    let product = entry.product;
    let page_url = config.product_url(&entry.slug);
    let title = text(&product.title);
    let title_attr = attr(&product.title);
    let description: String = product.description.chars().take(160).collect();

    let head_extra = format!(
        "<script type=\"application/ld+json\">{}</script>\n",
        json_ld(&product_schema(config, product, &page_url))
    );

    let price_section = match (discount_percent(product.price, product.old_price), product.old_price) {
        (Some(discount), Some(old)) => format!(
            r#"<span class="price-before"><del>{} {currency}</del></span>
<span class="price-after">{} {currency}</span>
<span class="discount-badge">خصم {discount}%</span>"#,
            format_price(old),
            format_price(product.price),
            currency = text(&config.currency),
        ),
        _ => format!(
            r#"<span class="price-after">{} {}</span>"#,
            format_price(product.price),
            text(&config.currency)
        ),
    };

    let image = product.image.as_deref().unwrap_or("/assets/og-image.svg");
    let order = templates::whatsapp_link(config, product, &page_url)
        .map(|link| {
            format!(
                r#"<a href="{}" class="btn btn-whatsapp" target="_blank" rel="noopener">📱 اطلب عبر واتساب</a>"#,
                attr(&link)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"{header}
<div class="container">
<nav class="breadcrumb">
<a href="/">🏠 الرئيسية</a>
<span>›</span>
<a href="/categories.html">الفئات</a>
<span>›</span>
<a href="/categories/{category_slug}.html">{category_name}</a>
<span>›</span>
<span>{title}</span>
</nav>
<div class="product-section">
<div class="product-grid">
<div class="product-image">
<img src="{image}" alt="{title_attr}">
</div>
<div class="product-details">
<h1 class="product-title">{title}</h1>
<div class="price-section">
{price_section}
</div>
<p><strong>SKU:</strong> {sku}</p>
<p class="product-description">{product_description}</p>
{order}
</div>
</div>
</div>
</div>
{footer}"#,
        header = layout.header,
        footer = layout.footer,
        category_slug = category.slug,
        category_name = text(&category.name),
        image = attr(image),
        sku = text(&product.sku),
        product_description = text(&product.description),
    );

    templates::document(
        &format!("{} | {}", product.title, config.store_name),
        &description,
        &page_url,
        &head_extra,
        COMMON_CSS,
        &body,
    )
}

/// Product cards; cards past `visible` start hidden behind "load more".
pub fn product_cards(config: &Config, entries: &[Entry<'_>], visible: usize) -> String {
    let mut html = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let product = entry.product;
        let href = format!("/products/{}.html", entry.slug);
        let title = text(&product.title);
        let title_attr = attr(&product.title);
        let card_class = if i < visible {
            "product-card"
        } else {
            "product-card hidden product-hidden"
        };
        let image = product
            .image
            .as_deref()
            .map(|src| {
                format!(
                    r#"<a href="{href}"><img src="{}" alt="{title_attr}" class="product-image" loading="lazy"></a>"#,
                    attr(src)
                )
            })
            .unwrap_or_default();
        let whatsapp = templates::whatsapp_link(config, product, &config.product_url(&entry.slug))
            .map(|link| {
                format!(
                    r#"<a href="{}" class="btn-whatsapp" target="_blank" rel="noopener">📱 واتساب</a>"#,
                    attr(&link)
                )
            })
            .unwrap_or_default();

        html.push_str(&format!(
            r#"<div class="{card_class}">
{image}
<div class="product-info">
<h3 class="product-title"><a href="{href}">{title}</a></h3>
<div class="product-sku">SKU: {sku}</div>
<div class="product-price">{price}</div>
<div class="product-actions">
<a href="{href}" class="btn-details">شاهد التفاصيل</a>
{whatsapp}
</div>
</div>
</div>
"#,
            sku = text(&product.sku),
            price = price_html(config, product),
        ));
    }
    html
}

fn listing_page(
    config: &Config,
    layout: &Layout,
    entries: &[Entry<'_>],
    page_title: &str,
    heading: &str,
    intro: &str,
    canonical: &str,
) -> String {
    let visible = config.visible_products;
    let load_more = if entries.len() > visible {
        format!(
            "<div class=\"load-more\">\n<button class=\"load-more-btn\" onclick=\"loadMore()\">تحميل المزيد</button>\n</div>\n{}",
            templates::load_more_script(visible)
        )
    } else {
        String::new()
    };

    let body = format!(
        r#"{header}
<div class="hero-section">
<h1>{heading}</h1>
<p>{intro}</p>
</div>
<div class="products-section">
<h2 class="section-title">منتجاتنا المميزة ({count} منتج)</h2>
<div class="products-grid">
{cards}</div>
{load_more}
</div>
{footer}"#,
        header = layout.header,
        footer = layout.footer,
        heading = text(heading),
        intro = text(intro),
        count = entries.len(),
        cards = product_cards(config, entries, visible),
    );

    templates::document(page_title, intro, canonical, "", COMMON_CSS, &body)
}

pub fn index_page(config: &Config, layout: &Layout, entries: &[Entry<'_>]) -> String {
    listing_page(
        config,
        layout,
        entries,
        &format!("{} - أفضل المنتجات بأسعار منافسة | توصيل مجاني", config.store_name),
        &format!("مرحباً بك في {}", config.store_name),
        &format!("تسوق أفضل {} منتج مع توصيل مجاني لجميع المحافظات", entries.len()),
        &format!("{}/", config.base_url()),
    )
}

pub fn category_page(config: &Config, layout: &Layout, category: &Category, entries: &[Entry<'_>]) -> String {
    listing_page(
        config,
        layout,
        entries,
        &format!("{} | {}", category.name, config.store_name),
        &category.name,
        &format!("{} منتج في فئة {}", entries.len(), category.name),
        &format!("{}/categories/{}.html", config.base_url(), category.slug),
    )
}

pub fn categories_page(config: &Config, layout: &Layout, categories: &[Category]) -> String {
    let items: String = categories
        .iter()
        .map(|c| {
            format!(
                "<a class=\"product-card\" href=\"/categories/{}.html\"><div class=\"product-info\"><h3 class=\"product-title\">{}</h3><div class=\"product-sku\">{} منتج</div></div></a>\n",
                c.slug,
                text(&c.name),
                c.members.len()
            )
        })
        .collect();

    let body = format!(
        r#"{header}
<div class="products-section">
<h1 class="section-title">جميع الفئات ({count})</h1>
<div class="products-grid">
{items}</div>
</div>
{footer}"#,
        header = layout.header,
        footer = layout.footer,
        count = categories.len(),
    );

    templates::document(
        &format!("الفئات | {}", config.store_name),
        &format!("تصفح {} فئة من منتجات {}", categories.len(), config.store_name),
        &format!("{}/categories.html", config.base_url()),
        "",
        COMMON_CSS,
        &body,
    )
}
