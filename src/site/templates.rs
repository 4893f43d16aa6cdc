//! Fixed page fragments shared by every generated page.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::compose::format_price;
use crate::config::Config;
use crate::feed::Product;

use super::Category;

const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const COMMON_CSS: &str = "
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:'Segoe UI',Tahoma,sans-serif;background:#f5f5f5;color:#333;line-height:1.6;direction:rtl}
.site-header{background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);color:white;padding:15px 0;position:sticky;top:0;z-index:1000}
.header-container{max-width:1200px;margin:0 auto;padding:0 20px;display:flex;flex-direction:column;gap:12px}
.top-bar{display:flex;align-items:center;justify-content:space-between;gap:20px;flex-wrap:wrap}
.logo a{color:white;text-decoration:none;font-size:24px;font-weight:bold}
.search-form{display:flex;gap:10px}
.search-input{padding:10px 18px;border:none;border-radius:25px;font-size:15px}
.search-btn,.whatsapp-btn{background:#25d366;color:white;padding:10px 22px;border:none;border-radius:25px;font-weight:bold;text-decoration:none;cursor:pointer}
.main-nav{display:flex;gap:10px;flex-wrap:wrap;justify-content:center}
.main-nav a,.dropbtn{color:white;text-decoration:none;padding:8px 16px;border-radius:5px}
.dropdown{position:relative;display:inline-block}
.dropdown-content{display:none;position:absolute;background:white;min-width:220px;box-shadow:0 8px 16px rgba(0,0,0,0.2);border-radius:8px;z-index:1001;max-height:400px;overflow-y:auto}
.dropdown-content a{color:#2d3748;display:block;padding:10px 18px}
.dropdown:hover .dropdown-content{display:block}
.site-footer{background:#2d3748;color:white;padding:40px 0 20px;margin-top:60px}
.footer-container{max-width:1200px;margin:0 auto;padding:0 20px;display:grid;grid-template-columns:repeat(auto-fit,minmax(220px,1fr));gap:30px}
.footer-section h3{color:#667eea;margin-bottom:15px}
.footer-section ul{list-style:none}
.footer-section a{color:#e2e8f0;text-decoration:none}
.footer-bottom{text-align:center;padding-top:20px;color:#a0aec0}
.container,.products-section{max-width:1300px;margin:30px auto;padding:0 20px}
.breadcrumb{margin-bottom:20px}
.breadcrumb a{color:#667eea;text-decoration:none;margin:0 5px}
.hero-section{background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);color:white;padding:50px 20px;text-align:center}
.section-title{text-align:center;font-size:32px;color:#2d3748;margin-bottom:30px}
.products-grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(260px,1fr));gap:24px}
.product-card{background:white;border-radius:15px;overflow:hidden;box-shadow:0 5px 20px rgba(0,0,0,0.1);display:flex;flex-direction:column}
.product-card .product-image{width:100%;height:240px;object-fit:cover;background:#f5f5f5}
.product-info{padding:18px;display:flex;flex-direction:column;flex-grow:1}
.product-title{font-size:16px;font-weight:bold;color:#2d3748;margin-bottom:8px}
.product-sku{font-size:12px;color:#6b7280;margin-bottom:8px}
.product-price{font-size:22px;font-weight:bold;color:#667eea;margin-bottom:12px}
.product-price del,.price-before{color:#9ca3af;font-size:15px;margin-inline-start:8px}
.product-actions{display:flex;gap:10px;margin-top:auto}
.btn-details,.btn-whatsapp{flex:1;color:white;padding:10px;border-radius:8px;font-weight:bold;text-decoration:none;text-align:center}
.btn-details{background:linear-gradient(135deg,#667eea 0%,#764ba2 100%)}
.btn-whatsapp{background:linear-gradient(135deg,#25d366 0%,#128c7e 100%)}
.product-section{background:white;border-radius:15px;padding:30px}
.product-grid{display:grid;grid-template-columns:1fr 1fr;gap:40px}
.product-section .product-image img{width:100%;max-width:500px;border-radius:10px}
.price-after{font-size:30px;font-weight:bold;color:#667eea}
.discount-badge{background:#ef4444;color:white;padding:4px 12px;border-radius:20px;margin-inline-start:10px}
.load-more{text-align:center;margin:40px 0}
.load-more-btn{background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);color:white;padding:14px 40px;border:none;border-radius:25px;font-size:18px;font-weight:bold;cursor:pointer}
.hidden{display:none}
@media (max-width:768px){.product-grid{grid-template-columns:1fr}}
";

pub fn url_encode(text: &str) -> String {
    utf8_percent_encode(text, QUERY_ENCODE).to_string()
}

/// Header and footer rendered once per build.
pub struct Layout {
    pub header: String,
    pub footer: String,
}

impl Layout {
    pub fn new(config: &Config, categories: &[Category]) -> Self {
        let dropdown: String = categories
            .iter()
            .map(|c| {
                format!(
                    "<a href=\"/categories/{}.html\">{} ({})</a>\n",
                    c.slug,
                    text(&c.name),
                    c.members.len()
                )
            })
            .collect();

        let store = text(&config.store_name);
        let whatsapp = if config.whatsapp_number.is_empty() {
            String::new()
        } else {
            format!(
                "<div class=\"header-actions\"><a href=\"https://wa.me/{}\" class=\"whatsapp-btn\" target=\"_blank\" rel=\"noopener\">📱 واتساب</a></div>",
                attr(&config.whatsapp_number)
            )
        };

        let header = format!(
            r#"<header class="site-header">
<div class="header-container">
<div class="top-bar">
<div class="logo"><a href="/index.html">🛒 {store}</a></div>
<div class="search-box">
<form action="/404.html" method="get" class="search-form">
<input type="text" name="q" placeholder="ابحث عن منتج..." class="search-input" required>
<button type="submit" class="search-btn">🔍 بحث</button>
</form>
</div>
{whatsapp}
</div>
<nav class="main-nav">
<a href="/index.html">الرئيسية</a>
<div class="dropdown">
<a href="/categories.html" class="dropbtn">الفئات ▼</a>
<div class="dropdown-content">
{dropdown}</div>
</div>
<a href="/legal/about.html">من نحن</a>
<a href="/legal/contact.html">اتصل بنا</a>
<a href="/legal/shipping.html">الشحن</a>
<a href="/legal/returns.html">الاسترجاع</a>
<a href="/legal/privacy.html">الخصوصية</a>
</nav>
</div>
</header>"#
        );

        let footer = format!(
            r#"<footer class="site-footer">
<div class="footer-container">
<div class="footer-section">
<h3>{store}</h3>
<p>أفضل المنتجات بأسعار منافسة مع توصيل مجاني لجميع المحافظات</p>
</div>
<div class="footer-section">
<h3>روابط سريعة</h3>
<ul>
<li><a href="/index.html">الرئيسية</a></li>
<li><a href="/categories.html">الفئات</a></li>
<li><a href="/legal/contact.html">اتصل بنا</a></li>
</ul>
</div>
</div>
<div class="footer-bottom">
<p>&copy; {store}. جميع الحقوق محفوظة.</p>
</div>
</footer>"#
        );

        Self { header, footer }
    }
}

/// `wa.me` link with a prefilled order message, or `None` without a number.
pub fn whatsapp_link(config: &Config, product: &Product, page_url: &str) -> Option<String> {
    if config.whatsapp_number.is_empty() {
        return None;
    }
    let message = format!(
        "مرحباً، أريد طلب: {} - SKU: {} - السعر: {} {} - الرابط: {page_url}",
        product.title,
        product.sku,
        format_price(product.price),
        config.currency
    );
    Some(format!(
        "https://wa.me/{}?text={}",
        config.whatsapp_number,
        url_encode(&message)
    ))
}

/// Full HTML document around `body`.
pub fn document(title: &str, description: &str, canonical: &str, head_extra: &str, css: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ar" dir="rtl">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<meta name="description" content="{description}">
<link rel="canonical" href="{canonical}">
<link rel="icon" href="/assets/favicon.svg" type="image/svg+xml">
{head_extra}<style>{css}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = text(title),
        description = attr(description),
        canonical = attr(canonical),
    )
}

pub fn load_more_script(step: usize) -> String {
    format!(
        r#"<script>
function loadMore(){{
const btn=document.querySelector('.load-more-btn');
let count=0;
document.querySelectorAll('.product-hidden.hidden').forEach(p=>{{
if(count<{step}){{p.classList.remove('hidden');count++;}}
}});
if(document.querySelectorAll('.product-hidden.hidden').length===0){{
btn.textContent='تم عرض جميع المنتجات ✓';
btn.disabled=true;
btn.style.opacity='0.6';
}}
}}
</script>"#
    )
}
