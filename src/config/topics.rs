#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub id: &'static str,
    pub name: &'static str,
}

pub const DEFAULT_TOPIC: &str = "all";

pub static TOPICS: &[Topic] = &[
    Topic { id: DEFAULT_TOPIC, name: "All Topics" },
    Topic { id: "bail", name: "Bail" },
    Topic { id: "murder", name: "Murder / Homicide" },
    Topic { id: "fraud", name: "Fraud / Cheating" },
    Topic { id: "cyber", name: "Cyber Crime" },
    Topic { id: "contract", name: "Contract Law" },
    Topic { id: "property", name: "Property Disputes" },
    Topic { id: "constitutional", name: "Constitutional Law" },
    Topic { id: "family", name: "Family Law" },
];

pub fn topic_by_id(id: &str) -> Option<&'static Topic> {
    let id = id.trim().to_lowercase();
    TOPICS.iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(topic_by_id("Bail").map(|t| t.name), Some("Bail"));
        assert_eq!(topic_by_id(DEFAULT_TOPIC).map(|t| t.name), Some("All Topics"));
        assert!(topic_by_id("maritime").is_none());
    }
}
