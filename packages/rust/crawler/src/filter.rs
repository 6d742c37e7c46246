//! Noise filtering for crawled image candidates.
//!
//! The primary document pass only checks the format allow-list. Images found
//! on linked github/project pages additionally run through the noise ruleset
//! (badges, icons, UI chrome, CMS asset paths), all by substring matching on
//! the lowercased URL.

use std::sync::LazyLock;

use regex::Regex;

/// Image formats the crawl considers at all, by URL path extension.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".tiff", ".svg"];

/// URL substrings marking non-content images.
const NOISE_KEYWORDS: &[&str] = &[
    // UI chrome
    "logo", "icon", "favicon", "button", "badge", "shield", "emoji",
    // build/status badges
    "status", "travis", "coveralls", "codecov", "pypi", "npm", "build",
    // action buttons
    "download", "install", "get", "buy", "shop", "cart", "subscribe",
    // social media
    "social", "facebook", "twitter", "linkedin", "youtube", "instagram",
    // code platforms
    "github", "gitlab", "bitbucket", "stackoverflow", "reddit",
    // navigation glyphs
    "arrow", "chevron", "caret", "plus", "minus", "close", "next", "prev",
    // widgets
    "menu", "hamburger", "nav", "breadcrumb", "pagination", "tabs",
    // people
    "avatar", "profile", "user", "team", "member", "admin",
    // meta pages
    "sponsor", "donate", "support", "help", "faq",
    // ads
    "ad", "advertisement", "banner", "promo", "sponsored",
    // settings
    "tool", "gear", "settings", "config", "preferences", "options",
    // institutions and funding
    "university", "college", "institute", "institut", "center", "centre",
    "lab", "laboratory", "foundation", "funded", "stiftung", "gmbh", "inc",
    "ltd", "mpi", "mpii", "eu", "europ", "germany", "corporation", "company",
];

/// Path fragments used by icon/asset bundles.
const ICON_PATHS: &[&str] = &[
    "/icons/", "/images/icons/", "/assets/icons/", "/static/icons/",
    "/img/icons/", "/css/icons/", "/js/icons/", "/fonts/",
    "/ui/", "/components/", "/elements/", "/widgets/",
];

/// Extensions that are almost always small icons.
const ICON_EXTENSIONS: &[&str] = &[".ico", ".svg"];

/// CMS and admin path fragments.
const SYSTEM_PATHS: &[&str] = &[
    "/wp-content/", "/wp-includes/", "/wp-admin/",
    "/themes/", "/plugins/", "/uploads/",
    "/admin/", "/backend/", "/dashboard/",
];

static SIZE_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"size=(\d+)").expect("size param regex"));

/// `size=` query values below this request icon-sized renders.
const MIN_SIZE_PARAM: u32 = 150;

/// True when the URL path ends with a supported image extension.
/// Query string and fragment are ignored; works on relative URLs too.
pub fn is_supported_image_path(url: &str) -> bool {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Heavier noise check applied to images found on linked pages.
///
/// The primary pass deliberately skips this, so e.g. a favicon referenced by
/// the paper's own HTML is still a candidate there.
pub fn should_skip_asset(url: &str) -> bool {
    let url_lower = url.to_lowercase();

    if NOISE_KEYWORDS.iter().any(|kw| url_lower.contains(kw)) {
        return true;
    }

    if let Some(caps) = SIZE_PARAM_RE.captures(url) {
        let size = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        if size.is_some_and(|s| s < MIN_SIZE_PARAM) {
            return true;
        }
    }

    if ICON_PATHS.iter().any(|p| url_lower.contains(p)) {
        return true;
    }

    if ICON_EXTENSIONS.iter().any(|ext| url_lower.ends_with(ext)) {
        return true;
    }

    SYSTEM_PATHS.iter().any(|p| url_lower.contains(p))
}
