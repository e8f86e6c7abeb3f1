use common::Metadata;

const KEYWORDS: [&str; 6] = [
    "instrumental",
    "inst.",
    "(inst)",
    "karaoke",
    "backing track",
    "no vocals",
];

/// Keyword hint for UI pre-fill. Never feeds the score.
pub fn detect_instrumental(metadata: &Metadata) -> bool {
    [&metadata.title, &metadata.genre, &metadata.comment]
        .into_iter()
        .flatten()
        .map(|value| value.to_lowercase())
        .any(|value| KEYWORDS.iter().any(|keyword| value.contains(keyword)))
}
