//! Text overlay formatting for the wall display.
//!
//! Pure string shaping; the queue item goes in, ready-to-render lines come
//! out. Rendering itself is the display surface's problem.

use crate::rotation::QueueItem;

/// Captions longer than this are cut and ellipsized.
pub const MAX_OVERLAY_CAPTION_CHARS: usize = 50;

/// The lines the wall draws over the current photo. Empty options mean the
/// line is omitted entirely, never rendered blank.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayText {
    /// Headline: the pet's name, or the owner's name when no pet name was
    /// given.
    pub title: String,
    /// Owner credit plus Instagram handle, e.g. `Ana  @ana.pics`. Omitted
    /// when it would just repeat the title.
    pub credit: Option<String>,
    /// `Age: 3 years`, when provided.
    pub age: Option<String>,
    /// `Lisbon/PT`, city and region joined, whichever are present.
    pub location: Option<String>,
    pub caption: Option<String>,
}

impl OverlayText {
    pub fn for_item(item: &QueueItem) -> Self {
        let title = item
            .pet_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&item.display_name)
            .trim()
            .to_string();

        let owner = item.display_name.trim();
        // Suppress the credit line when the pet goes by the owner's name.
        let owner = if owner.is_empty() || owner.eq_ignore_ascii_case(&title) {
            None
        } else {
            Some(owner.to_string())
        };
        let handle = item.instagram.as_deref().map(format_handle);
        let credit = match (owner, handle) {
            (Some(o), Some(h)) => Some(format!("{o}  {h}")),
            (Some(o), None) => Some(o),
            (None, Some(h)) => Some(h),
            (None, None) => None,
        };

        Self {
            title,
            credit,
            age: item.pet_age.as_deref().map(format_age),
            location: format_location(item.city.as_deref(), item.region.as_deref()),
            caption: item.caption.as_deref().map(truncate_caption),
        }
    }
}

/// Normalizes an Instagram handle to exactly one leading `@`.
pub fn format_handle(handle: &str) -> String {
    let bare = handle.trim().trim_start_matches('@');
    format!("@{bare}")
}

pub fn format_age(age: &str) -> String {
    format!("Age: {}", age.trim())
}

/// `city/REGION` when both are present, either alone otherwise.
pub fn format_location(city: Option<&str>, region: Option<&str>) -> Option<String> {
    let city = city.map(str::trim).filter(|s| !s.is_empty());
    let region = region.map(str::trim).filter(|s| !s.is_empty());
    match (city, region) {
        (Some(c), Some(r)) => Some(format!("{c}/{r}")),
        (Some(c), None) => Some(c.to_string()),
        (None, Some(r)) => Some(r.to_string()),
        (None, None) => None,
    }
}

/// Collapses runs of whitespace and caps the caption, appending `...` when
/// anything was cut.
pub fn truncate_caption(caption: &str) -> String {
    let collapsed: Vec<&str> = caption.split_whitespace().collect();
    let collapsed = collapsed.join(" ");
    if collapsed.chars().count() <= MAX_OVERLAY_CAPTION_CHARS {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(MAX_OVERLAY_CAPTION_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> QueueItem {
        QueueItem {
            id: "rec-000001".to_string(),
            display_name: "Ana".to_string(),
            instagram: Some("ana.pics".to_string()),
            caption: Some("Loves the beach".to_string()),
            pet_name: Some("Bolinha".to_string()),
            pet_age: Some("3 years".to_string()),
            city: Some("Lisbon".to_string()),
            region: Some("PT".to_string()),
            storage_path: "pending/1_Ana.jpg".to_string(),
        }
    }

    #[test]
    fn full_item_produces_all_lines() {
        let text = OverlayText::for_item(&item());
        assert_eq!(text.title, "Bolinha");
        assert_eq!(text.credit.as_deref(), Some("Ana  @ana.pics"));
        assert_eq!(text.age.as_deref(), Some("Age: 3 years"));
        assert_eq!(text.location.as_deref(), Some("Lisbon/PT"));
        assert_eq!(text.caption.as_deref(), Some("Loves the beach"));
    }

    #[test]
    fn missing_pet_name_falls_back_to_owner() {
        let mut it = item();
        it.pet_name = None;
        let text = OverlayText::for_item(&it);
        assert_eq!(text.title, "Ana");
        // Owner would repeat the title; only the handle survives.
        assert_eq!(text.credit.as_deref(), Some("@ana.pics"));
    }

    #[test]
    fn pet_named_after_owner_suppresses_credit_name() {
        let mut it = item();
        it.pet_name = Some("ana".to_string());
        it.instagram = None;
        let text = OverlayText::for_item(&it);
        assert_eq!(text.title, "ana");
        assert!(text.credit.is_none());
    }

    #[test]
    fn handle_gets_exactly_one_at_sign() {
        assert_eq!(format_handle("@@ana"), "@ana");
        assert_eq!(format_handle("ana"), "@ana");
        assert_eq!(format_handle(" @ana "), "@ana");
    }

    #[test]
    fn location_joins_present_parts() {
        assert_eq!(format_location(Some("Lisbon"), Some("PT")).unwrap(), "Lisbon/PT");
        assert_eq!(format_location(Some("Lisbon"), None).unwrap(), "Lisbon");
        assert_eq!(format_location(None, Some("PT")).unwrap(), "PT");
        assert!(format_location(None, None).is_none());
        assert!(format_location(Some("  "), None).is_none());
    }

    #[test]
    fn caption_is_collapsed_and_capped() {
        assert_eq!(truncate_caption("a   b\n\tc"), "a b c");
        let long = "x".repeat(80);
        let out = truncate_caption(&long);
        assert_eq!(out.chars().count(), MAX_OVERLAY_CAPTION_CHARS + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn short_caption_passes_through() {
        assert_eq!(truncate_caption("hello"), "hello");
    }
}
