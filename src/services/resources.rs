//! Static resource list shown on the dashboard landing page.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub title: &'static str,
    pub url: &'static str,
}

pub const RESOURCES: &[Resource] = &[
    Resource { title: "Business Planning 101", url: "https://example.com/business-planning" },
    Resource { title: "Marketing Strategies", url: "https://example.com/marketing-strategies" },
    Resource { title: "Financial Management", url: "https://example.com/financial-management" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_links_in_display_order() {
        let titles: Vec<_> = RESOURCES.iter().map(|r| r.title).collect();
        assert_eq!(titles, ["Business Planning 101", "Marketing Strategies", "Financial Management"]);
        assert!(RESOURCES.iter().all(|r| r.url.starts_with("https://")));
    }
}
