//! Find/replace passes over already published pages.
//!
//! There is no HTML parser here: every pass keys off exact markers that the
//! generator and earlier passes emit, and each pass is a no-op when run a
//! second time.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, NoExpand, Regex};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ThemeConfig;
use crate::error::{BotError, Result};

const ROOT_PAGES: [&str; 3] = ["index.html", "categories.html", "404.html"];
const PAGE_FOLDERS: [&str; 3] = ["products", "categories", "legal"];
const FALLBACK_PRODUCT_NAME: &str = "هذا المنتج";

const THEME_BLOCK: &str = r#"<style id="theme-overhaul">
:root{--primary-color:#764ba2;--secondary-color:#667eea;--text-dark:#2d3748;--bg-light:#f8fafc;--white:#ffffff;--radius:8px;--shadow-sm:0 1px 3px rgba(0,0,0,0.1);--shadow-lg:0 10px 15px -3px rgba(0,0,0,0.1)}
body{font-family:'Inter','Segoe UI',Tahoma,sans-serif !important;background-color:var(--bg-light) !important;color:var(--text-dark) !important}
.site-header{background:var(--white) !important;color:var(--text-dark) !important;border-bottom:1px solid #e2e8f0;box-shadow:var(--shadow-sm) !important}
.logo a,.main-nav a,.dropdown .dropbtn{color:var(--text-dark) !important}
.main-nav a:hover{background:#f8fafc !important;color:var(--primary-color) !important}
.search-input{background:#f1f5f9 !important;border:1px solid #e2e8f0 !important}
.search-btn,.btn-details{background:var(--primary-color) !important}
.hero-section{background:var(--white) !important;color:var(--text-dark) !important;padding:80px 20px !important;border-bottom:1px solid #e2e8f0}
.product-card{border:1px solid #e2e8f0 !important;box-shadow:none !important;border-radius:var(--radius) !important}
.product-card:hover{box-shadow:var(--shadow-lg) !important;border-color:var(--primary-color) !important}
.product-section,.reviews-section,.faq-section{background:var(--white) !important;border:1px solid #e2e8f0 !important;box-shadow:var(--shadow-sm) !important;border-radius:var(--radius) !important}
.faq-section{padding:50px;margin:30px auto;max-width:1300px}
.faq-title{color:var(--text-dark);font-weight:800;border-bottom:2px solid var(--primary-color);display:inline-block;margin-bottom:40px}
.faq-grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(300px,1fr));gap:25px}
.faq-item{background:var(--white);padding:25px;border:1px solid #f1f5f9;border-right:4px solid var(--primary-color);border-radius:12px}
.faq-question{font-weight:bold;color:var(--text-dark);margin-bottom:12px;font-size:18px}
.faq-answer{color:#4b5563;line-height:1.6}
h1,h2,h3{font-weight:700 !important}
</style>
<link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700;800&display=swap" rel="stylesheet">"#;

const CHATBOT_WIDGET: &str = r#"<div id="chatbot-container">
<button id="chatbot-toggle" aria-expanded="false" aria-controls="chatbot-window"><span>💬</span><span>مساعد المتجر</span></button>
<div id="chatbot-window" class="hidden">
<div id="chatbot-header"><h3>🤖 مساعد المتجر</h3><button id="chatbot-close" aria-label="إغلاق">✕</button></div>
<div id="chatbot-messages"><div class="message bot-message">مرحباً! 👋 اسأل عن المنتجات والأسعار والتوصيل 🛍️</div></div>
<div id="chatbot-input-area"><input type="text" id="user-input" placeholder="اكتب سؤالك هنا..." aria-label="إدخال الرسالة"><button id="send-button" aria-label="إرسال">📤</button></div>
</div>
</div>
<script src="/chatbot.js"></script>
"#;

static THEME_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<style id="theme-overhaul">.*?</style>\n<link href="https://fonts\.googleapis\.com/css2\?family=Inter[^"]*" rel="stylesheet">"#)
        .expect("static regex")
});

static FAQ_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<section class="faq-section">.*?</section>\n?"#).expect("static regex"));

static PRODUCT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<h1 class="product-title">(.*?)</h1>"#).expect("static regex"));

static ABSOLUTE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<base\s[^>]*>)|\b(href|src)="/([^"]*)""#).expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Product,
    Other,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ThemeReport {
    pub pages_seen: usize,
    pub pages_changed: usize,
}

fn faq_section(product_name: &str) -> String {
    format!(
        r#"<section class="faq-section">
<h2 class="faq-title">🤔 الأسئلة الشائعة حول {product_name}</h2>
<div class="faq-grid">
<div class="faq-item">
<div class="faq-question">🚚 هل توصيل {product_name} مجاني؟</div>
<div class="faq-answer">نعم، نوفر خدمة التوصيل المجاني والسريع لمنتج {product_name} لجميع المحافظات.</div>
</div>
<div class="faq-item">
<div class="faq-question">⏱️ كم يستغرق وصول المنتج؟</div>
<div class="faq-answer">يستغرق توصيل {product_name} عادةً من 2 إلى 4 أيام عمل حسب محافظتك.</div>
</div>
<div class="faq-item">
<div class="faq-question">🔍 هل يمكنني فحص المنتج قبل الدفع؟</div>
<div class="faq-answer">بكل تأكيد! يمكنك فحص {product_name} والتأكد من مطابقته قبل تسليم المبلغ للمندوب.</div>
</div>
<div class="faq-item">
<div class="faq-question">🔄 ما هي سياسة الاستبدال؟</div>
<div class="faq-answer">نوفر استبدال {product_name} خلال 14 يوماً في حال وجود أي خلل مصنعي.</div>
</div>
</div>
</section>
"#
    )
}

fn insert_before_first(html: &str, anchor: &str, insert: &str) -> Option<String> {
    let at = html.find(anchor)?;
    let mut out = String::with_capacity(html.len() + insert.len());
    out.push_str(&html[..at]);
    out.push_str(insert);
    out.push_str(&html[at..]);
    Some(out)
}

fn inject_chatbot(html: String) -> String {
    let mut html = html;
    if !html.contains("chatbot.css\"") {
        if let Some(updated) =
            insert_before_first(&html, "</head>", "<link rel=\"stylesheet\" href=\"/chatbot.css\">\n")
        {
            html = updated;
        }
    }
    if !html.contains("id=\"chatbot-container\"") {
        if let Some(updated) = insert_before_first(&html, "</body>", CHATBOT_WIDGET) {
            html = updated;
        }
    }
    html
}

/// `prefix` leads from the page's folder back to the site root.
fn relative_paths(html: &str, prefix: &str) -> String {
    ABSOLUTE_PATH
        .replace_all(html, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return caps[0].to_string();
            }
            let rest = &caps[3];
            if rest.starts_with('/') {
                // protocol-relative `//host/...`
                return caps[0].to_string();
            }
            let target = match (prefix.is_empty(), rest.is_empty()) {
                (true, true) => "./".to_string(),
                _ => format!("{prefix}{rest}"),
            };
            format!("{}=\"{target}\"", &caps[2])
        })
        .into_owned()
}

fn insert_base(html: String, href: &str) -> String {
    if html.contains("<base ") {
        return html;
    }
    let tag = format!("\n<base href=\"{href}\">");
    match html.find("<head>") {
        Some(at) => {
            let end = at + "<head>".len();
            format!("{}{tag}{}", &html[..end], &html[end..])
        }
        None => html,
    }
}

fn apply_theme_block(html: String) -> String {
    if THEME_STYLE.is_match(&html) {
        return THEME_STYLE.replace(&html, NoExpand(THEME_BLOCK)).into_owned();
    }
    insert_before_first(&html, "</head>", &format!("{THEME_BLOCK}\n")).unwrap_or(html)
}

fn apply_faq(html: String) -> String {
    let name = PRODUCT_TITLE
        .captures(&html)
        .map(|c| c[1].trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| FALLBACK_PRODUCT_NAME.to_string());
    let faq = faq_section(&name);

    let html = FAQ_SECTION.replace_all(&html, "").into_owned();
    for anchor in ["<div class=\"reviews-section\">", "<footer", "</body>"] {
        if let Some(updated) = insert_before_first(&html, anchor, &faq) {
            return updated;
        }
    }
    html
}

/// Applies every configured pass to one page.
///
/// `depth` is the number of folders between the site root and the page.
/// Root-relative links are resolved against the `<base>` tag when one is
/// configured, and against the page's own folder otherwise.
pub fn rewrite(html: &str, kind: PageKind, depth: usize, options: &ThemeConfig) -> String {
    let mut html = html.to_string();

    if options.chatbot {
        html = inject_chatbot(html);
    }
    if options.relative_paths {
        let prefix = match options.base_href {
            Some(_) => String::new(),
            None => "../".repeat(depth),
        };
        html = relative_paths(&html, &prefix);
    }
    if let Some(href) = &options.base_href {
        html = insert_base(html, href);
    }
    html = apply_theme_block(html);
    if kind == PageKind::Product {
        html = apply_faq(html);
    }
    html
}

struct Page {
    path: PathBuf,
    kind: PageKind,
    depth: usize,
}

fn pages_under(root: &Path) -> Vec<Page> {
    let mut pages: Vec<Page> = ROOT_PAGES
        .iter()
        .map(|name| root.join(name))
        .filter(|p| p.is_file())
        .map(|path| Page {
            path,
            kind: PageKind::Other,
            depth: 0,
        })
        .collect();

    for folder in PAGE_FOLDERS {
        let kind = if folder == "products" {
            PageKind::Product
        } else {
            PageKind::Other
        };
        let walker = WalkDir::new(root.join(folder))
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "html") {
                pages.push(Page {
                    path: path.to_path_buf(),
                    kind,
                    depth: 1,
                });
            }
        }
    }

    pages
}

/// Rewrites every known page under `root` in place.
pub fn apply(root: &Path, options: &ThemeConfig) -> Result<ThemeReport> {
    let mut report = ThemeReport::default();

    for Page { path, kind, depth } in pages_under(root) {
        let page = path.display().to_string();
        let original = fs::read_to_string(&path).map_err(|e| BotError::io(&page, e))?;
        let updated = rewrite(&original, kind, depth, options);
        report.pages_seen += 1;

        if updated != original {
            fs::write(&path, updated).map_err(|e| BotError::io(&page, e))?;
            report.pages_changed += 1;
            debug!(%page, "page rewritten");
        }
    }

    info!(seen = report.pages_seen, changed = report.pages_changed, "theme pass finished");
    Ok(report)
}
