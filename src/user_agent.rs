//! User-Agent classification
//!
//! Heuristic parsing of User-Agent strings into device type, operating system,
//! browser and a bot flag. Every detector is an ordered rule list: the first
//! matching rule wins, so more specific markers must come before generic ones
//! (e.g. Edge before Chrome, Chrome before Safari).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Substrings that mark crawlers, link unfurlers and scripted HTTP clients.
/// Matched against the lowercased User-Agent.
const BOT_PATTERNS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "scraper",
    "googlebot",
    "bingbot",
    "slurp",
    "duckduckbot",
    "baiduspider",
    "yandexbot",
    "facebookexternalhit",
    "twitterbot",
    "rogerbot",
    "linkedinbot",
    "embedly",
    "quora",
    "pinterest",
    "slackbot",
    "whatsapp",
    "flipboard",
    "tumblr",
    "bitlybot",
    "skypeuripreview",
    "nuzzel",
    "discordbot",
    "qwantify",
    "pinterestbot",
    "bitrixlinkpreview",
    "xing-contenttabreceiver",
    "chrome-lighthouse",
    "telegrambot",
    "applebot",
    "ia_archiver",
    "archive.org_bot",
    "megaindex",
    "dotbot",
    "sogou",
    "exabot",
    "facebot",
    "curl",
    "wget",
    "python-requests",
    "go-http-client",
    "java/",
    "php/",
    "ruby",
    "perl",
    "node",
];

/// Windows NT kernel versions, most recent first.
const WINDOWS_VERSIONS: &[(&str, &str)] = &[
    ("windows nt 10.0", "Windows 10/11"),
    ("windows nt 6.3", "Windows 8.1"),
    ("windows nt 6.2", "Windows 8"),
    ("windows nt 6.1", "Windows 7"),
    ("windows nt 6.0", "Windows Vista"),
    ("windows nt 5.1", "Windows XP"),
    ("windows nt 5.0", "Windows 2000"),
];

/// Linux distributions that advertise themselves in the User-Agent.
const LINUX_DISTROS: &[(&str, &str)] = &[
    ("ubuntu", "Ubuntu"),
    ("fedora", "Fedora"),
    ("debian", "Debian"),
    ("centos", "CentOS"),
    ("redhat", "Red Hat"),
    ("rhel", "Red Hat"),
];

const UNKNOWN: &str = "Unknown";

/// Coarse device category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    #[default]
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
            DeviceType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a User-Agent string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUserAgent {
    pub device: DeviceType,
    pub os: String,
    pub browser: String,
    pub is_bot: bool,
}

impl Default for ParsedUserAgent {
    fn default() -> Self {
        Self {
            device: DeviceType::Unknown,
            os: UNKNOWN.to_string(),
            browser: UNKNOWN.to_string(),
            is_bot: false,
        }
    }
}

struct Patterns {
    mobile: Regex,
    tablet: Regex,
    desktop: Regex,
    not_desktop: Regex,
    mac_version: Regex,
    android_version: Regex,
    ios_version: Regex,
    ipados_version: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Literal patterns: compilation cannot fail
        let re = |p: &str| Regex::new(p).expect("static user-agent pattern");
        Patterns {
            mobile: re(r"(?i)android|webos|iphone|ipod|blackberry|iemobile|opera mini"),
            tablet: re(r"(?i)ipad|tablet"),
            desktop: re(r"(?i)windows|macintosh|linux"),
            not_desktop: re(r"(?i)android|mobile"),
            mac_version: re(r"(?i)mac os x ([\d_]+)"),
            android_version: re(r"(?i)android ([\d.]+)"),
            ios_version: re(r"(?i)iphone os ([\d_]+)"),
            ipados_version: re(r"(?i)os ([\d_]+)"),
        }
    })
}

/// Quick bot check without running the full classifier
pub fn is_bot(user_agent: &str) -> bool {
    if user_agent.is_empty() {
        return false;
    }
    detect_bot(&user_agent.to_lowercase())
}

/// Classify a User-Agent string
pub fn parse_user_agent(user_agent: &str) -> ParsedUserAgent {
    if user_agent.is_empty() {
        return ParsedUserAgent::default();
    }

    let lower = user_agent.to_lowercase();

    ParsedUserAgent {
        device: detect_device(user_agent, &lower),
        os: detect_os(user_agent, &lower),
        browser: detect_browser(&lower).to_string(),
        is_bot: detect_bot(&lower),
    }
}

fn detect_bot(lower: &str) -> bool {
    BOT_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

fn detect_device(ua: &str, lower: &str) -> DeviceType {
    let p = patterns();

    if p.mobile.is_match(ua) {
        if p.tablet.is_match(ua) || is_android_tablet(lower) {
            return DeviceType::Tablet;
        }
        return DeviceType::Mobile;
    }

    if p.desktop.is_match(ua) && !p.not_desktop.is_match(ua) {
        return DeviceType::Desktop;
    }

    DeviceType::Unknown
}

/// Android tablets omit the "Mobile" token that phones carry after "Android".
fn is_android_tablet(lower: &str) -> bool {
    lower
        .rfind("android")
        .is_some_and(|idx| !lower[idx..].contains("mobile"))
}

fn detect_os(ua: &str, lower: &str) -> String {
    let p = patterns();

    if let Some((_, name)) = WINDOWS_VERSIONS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
    {
        return (*name).to_string();
    }
    if lower.contains("windows") {
        return "Windows".to_string();
    }

    if lower.contains("mac os x") || lower.contains("macintosh") {
        return versioned("macOS", &p.mac_version, ua);
    }

    if lower.contains("android") {
        return versioned("Android", &p.android_version, ua);
    }

    if lower.contains("iphone") {
        return versioned("iOS", &p.ios_version, ua);
    }

    if lower.contains("ipad") {
        return versioned("iPadOS", &p.ipados_version, ua);
    }

    if let Some((_, name)) = LINUX_DISTROS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
    {
        return (*name).to_string();
    }
    if lower.contains("linux") {
        return "Linux".to_string();
    }

    UNKNOWN.to_string()
}

/// "{name} {version}" with underscores normalized to dots, or bare name
fn versioned(name: &str, pattern: &Regex, ua: &str) -> String {
    match pattern.captures(ua).and_then(|c| c.get(1)) {
        Some(version) => format!("{} {}", name, version.as_str().replace('_', ".")),
        None => name.to_string(),
    }
}

fn detect_browser(lower: &str) -> &'static str {
    if lower.contains("edg/") || lower.contains("edgios/") || lower.contains("edgandroid") {
        return "Edge";
    }
    if lower.contains("chrome/") && !lower.contains("edg") {
        return "Chrome";
    }
    if lower.contains("firefox/") {
        return "Firefox";
    }
    if lower.contains("safari/") && !lower.contains("chrome") {
        return "Safari";
    }
    if lower.contains("opr/") || lower.contains("opera/") {
        return "Opera";
    }
    if lower.contains("msie") || lower.contains("trident/") {
        return "Internet Explorer";
    }
    if lower.contains("samsungbrowser/") {
        return "Samsung Internet";
    }
    if lower.contains("ucbrowser/") {
        return "UC Browser";
    }
    UNKNOWN
}
