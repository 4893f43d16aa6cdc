//! URL slugs and hashtags derived from product titles.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

const ARABIC: &str = r"\x{0600}-\x{06FF}\x{0750}-\x{077F}\x{08A0}-\x{08FF}\x{FB50}-\x{FDFF}\x{FE70}-\x{FEFF}";

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

static NOT_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"[^{ARABIC}\-]")).expect("static regex"));

static NOT_HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"[^{ARABIC}A-Za-z0-9_]")).expect("static regex"));

static NOT_SKU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\-]").expect("static regex"));

static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("static regex"));

static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").expect("static regex"));

fn clean(text: &str, separator: &str, disallowed: &Regex, repeated: &Regex) -> String {
    let joined = WHITESPACE.replace_all(text.trim(), separator);
    let kept = disallowed.replace_all(&joined, "");
    let collapsed = repeated.replace_all(&kept, separator);
    collapsed.trim_matches(|c| separator.contains(c)).to_string()
}

/// Arabic-only path segment: words joined by `-`, everything else dropped.
pub fn slugify(text: &str) -> String {
    clean(text, "-", &NOT_SLUG, &DASHES)
}

/// `A.001147` becomes `a001147`.
pub fn clean_sku(sku: &str) -> String {
    NOT_SKU.replace_all(&sku.to_lowercase(), "").into_owned()
}

/// Slug of a product page, made unique across the catalog by the SKU.
pub fn product_slug(title: &str, sku: &str) -> String {
    let title_slug = slugify(title);
    let sku = clean_sku(sku);

    match (title_slug.is_empty(), sku.is_empty()) {
        (true, true) => "product".into(),
        (true, false) => format!("product-{sku}"),
        (false, true) => title_slug,
        (false, false) => format!("{title_slug}-{sku}"),
    }
}

/// `#tag` built from a phrase, or `None` when nothing usable remains.
pub fn hashtag(text: &str) -> Option<String> {
    let tag = clean(text, "_", &NOT_HASHTAG, &UNDERSCORES);
    (!tag.is_empty()).then(|| format!("#{tag}"))
}

/// Hashtags from the first `max` title words longer than three characters.
pub fn title_hashtags(title: &str, max: usize) -> Vec<String> {
    title
        .split_whitespace()
        .filter(|word| word.chars().count() > 3)
        .take(max)
        .filter_map(hashtag)
        .collect()
}

/// Hands out slugs that are unique within one site build.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, slug: String) -> String {
        if self.used.insert(slug.clone()) {
            return slug;
        }

        let mut counter = 1;
        loop {
            let candidate = format!("{slug}-{counter}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_arabic(c: char) -> bool {
        matches!(c as u32,
            0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF)
    }

    fn assert_well_formed(slug: &str, sep: char) {
        assert!(!slug.starts_with(sep), "leading separator in {slug:?}");
        assert!(!slug.ends_with(sep), "trailing separator in {slug:?}");
        assert!(!slug.contains(&format!("{sep}{sep}")), "doubled separator in {slug:?}");
    }

    #[test]
    fn slugify_joins_words_with_dashes() {
        assert_eq!(slugify("  قطاعة   خضار  "), "قطاعة-خضار");
        assert_eq!(slugify("جهاز اعداد الفشار"), "جهاز-اعداد-الفشار");
    }

    #[test]
    fn slugify_drops_latin_digits_and_punctuation() {
        assert_eq!(slugify("خلاط - Blender 3000 (محمول)!"), "خلاط-محمول");
        assert_eq!(slugify("Magic Mop"), "");
    }

    #[test]
    fn slugify_drops_zero_width_spaces() {
        assert_eq!(slugify("منظف \u{200B}\u{200B}اسطوانة الغسالة"), "منظف-اسطوانة-الغسالة");
    }

    #[test]
    fn slugs_only_contain_the_allowed_class() {
        let titles = [
            "قلم اللحية لملئ الفراغات و تحديد",
            "--- زيت أوميغا --- لتطويل اللحية ---",
            "داعم الظهر السحري 2024 🔥🔥",
            "  - - -  ",
            "معجون أسنان: لتبييض/الأسنان & ازالة البقع",
            "",
        ];
        for title in titles {
            let slug = slugify(title);
            assert!(slug.chars().all(|c| c == '-' || is_arabic(c)), "{slug:?}");
            assert_well_formed(&slug, '-');
        }
    }

    #[test]
    fn product_slug_appends_clean_sku() {
        assert_eq!(product_slug("قطاعة متعددة الوظائف", "A.001147"), "قطاعة-متعددة-الوظائف-a001147");
        assert_eq!(product_slug("Magic Mop", "G.000010"), "product-g000010");
        assert_eq!(product_slug("ميزان الطعام", ""), "ميزان-الطعام");
        assert_eq!(product_slug("", ""), "product");
    }

    #[test]
    fn hashtag_uses_underscores_and_keeps_latin() {
        assert_eq!(hashtag("ذي قار").as_deref(), Some("#ذي_قار"));
        assert_eq!(hashtag("  Air Fryer 5L! ").as_deref(), Some("#Air_Fryer_5L"));
        assert_eq!(hashtag("!!!"), None);
    }

    #[test]
    fn hashtags_are_well_formed() {
        for text in ["_ _ منتجات __ متنوعة _", "A - B", "١٢٣ عرض"] {
            let tag = hashtag(text).unwrap();
            let body = tag.strip_prefix('#').unwrap();
            assert!(body.chars().all(|c| c == '_' || c.is_ascii_alphanumeric() || is_arabic(c)));
            assert_well_formed(body, '_');
        }
    }

    #[test]
    fn title_hashtags_skip_short_words() {
        assert_eq!(
            title_hashtags("حزام الرقبة المغناطيسي و ضد الالم", 3),
            vec!["#حزام", "#الرقبة", "#المغناطيسي"]
        );
        assert_eq!(title_hashtags("قلم اللحية لملئ الفراغات", 2), vec!["#اللحية", "#لملئ"]);
        assert!(title_hashtags("قلم و ضد", 3).is_empty());
    }

    #[test]
    fn registry_appends_counters_for_collisions() {
        let mut registry = SlugRegistry::new();
        assert_eq!(registry.claim("ميزان".into()), "ميزان");
        assert_eq!(registry.claim("ميزان".into()), "ميزان-1");
        assert_eq!(registry.claim("ميزان".into()), "ميزان-2");
        assert_eq!(registry.claim("ميزان-1".into()), "ميزان-1-1");
    }
}
