//! Link detection in free-text event fields.

/// Hosts recognized as video-conference links
pub const MEETING_HOSTS: &[&str] = &[
    "meet.google.com",
    "zoom.us/",
    "teams.microsoft.com",
    "teams.live.com",
];

const WORD_SEPARATORS: &[char] = &[' ', '\n', '\t', '\r', '<', '>', '"', '\\'];
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '"', '\''];

/// Find the first video-conference link in text
pub fn find_meeting_link(text: &str) -> Option<String> {
    words(text)
        .find(|word| MEETING_HOSTS.iter().any(|host| word.contains(host)))
        .map(trim_link_suffix)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
}

/// Extract all http(s) links from text, deduplicated, in order of appearance
pub fn extract_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for word in words(text) {
        if word.len() > 8 && (word.starts_with("http://") || word.starts_with("https://")) {
            let link = trim_link_suffix(word);
            if !links.iter().any(|l| l == link) {
                links.push(link.to_string());
            }
        }
    }
    links
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(WORD_SEPARATORS).filter(|w| !w.is_empty())
}

fn trim_link_suffix(link: &str) -> &str {
    link.trim_end_matches(TRAILING_PUNCTUATION)
}
