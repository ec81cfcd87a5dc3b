use regex::Regex;
use std::sync::LazyLock;
use unicode_width::UnicodeWidthChar;

static LINK_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(http://www\.|https://www\.|http://|https://)?[a-z0-9]+([\-.]{1}[a-z0-9]+)*\.[a-z]{2,5}(:[0-9]{1,5})?(/.*)?$",
    )
    .expect("link shape pattern is valid")
});

static BASE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^/]+").expect("base url pattern is valid"));

// Host application tokens that make sites serve app-specific markup.
static HOST_UA_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(obsidian/[0-9.]+|Electron/[0-9.]+)\s").expect("user agent pattern is valid")
});

/// Safely truncate a string, ensuring it is not truncated in the middle of multi-byte characters
///
/// This function will:
/// 1. Correctly handle Unicode characters (including Chinese, emoji, etc.)
/// 2. Add ellipsis when maximum length is reached
/// 3. Ensure the output string's display width does not exceed the specified length
#[allow(dead_code)]
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

/// Whether `value` looks like a web address worth previewing.
pub fn is_link_shaped(value: &str) -> bool {
    LINK_SHAPE.is_match(value)
}

/// `scheme://host[:port]` of an http(s) URL, without a trailing slash.
pub fn base_url(url: &str) -> Option<&str> {
    BASE_URL.find(url).map(|m| m.as_str())
}

pub fn normalize_user_agent(user_agent: &str) -> String {
    HOST_UA_TOKENS.replace_all(user_agent, "").into_owned()
}
