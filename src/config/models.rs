//! Catalog of models the client can offer. Adding an entry here makes it show
//! up everywhere a model is chosen.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Served by the CaseCut backend itself.
    Local,
    /// Hosted inference API; the backend proxies it unless called directly.
    HuggingFace,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::HuggingFace => "huggingface",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Chat,
    Summarize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: Provider,
    pub description: &'static str,
    pub capabilities: &'static [Capability],
    /// Repository path on the hosted inference API.
    pub hf_model: Option<&'static str>,
}

pub const DEFAULT_MODEL_ID: &str = "casecut-legal";

pub static MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: DEFAULT_MODEL_ID,
        name: "CaseCut Legal AI",
        provider: Provider::Local,
        description: "Custom legal research & summarization",
        capabilities: &[Capability::Chat, Capability::Summarize],
        hf_model: None,
    },
    ModelInfo {
        id: "hf-bart-large-cnn",
        name: "BART Large CNN",
        provider: Provider::HuggingFace,
        description: "Facebook abstractive summarization",
        capabilities: &[Capability::Summarize],
        hf_model: Some("facebook/bart-large-cnn"),
    },
    ModelInfo {
        id: "hf-legal-led",
        name: "Legal LED",
        provider: Provider::HuggingFace,
        description: "Long-document legal summarization",
        capabilities: &[Capability::Summarize],
        hf_model: Some("nsi319/legal-led-base-16384"),
    },
    ModelInfo {
        id: "hf-falconsai",
        name: "FalconSAI Summarizer",
        provider: Provider::HuggingFace,
        description: "Lightweight text summarization",
        capabilities: &[Capability::Summarize],
        hf_model: Some("Falconsai/text_summarization"),
    },
];

pub fn models_by_capability(capability: Capability) -> Vec<&'static ModelInfo> {
    MODELS.iter()
        .filter(|m| m.capabilities.contains(&capability))
        .collect()
}

pub fn model_by_id(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_house_model_chats() {
        let chat: Vec<_> = models_by_capability(Capability::Chat)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(chat, vec![DEFAULT_MODEL_ID]);
        assert_eq!(models_by_capability(Capability::Summarize).len(), 4);
        assert_eq!(models_by_capability(Capability::Summarize)[0].id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn hosted_models_carry_a_repository_path() {
        for model in MODELS.iter().filter(|m| m.provider == Provider::HuggingFace) {
            assert!(model.hf_model.is_some(), "{} has no hf_model", model.id);
        }
        assert_eq!(model_by_id("hf-legal-led").and_then(|m| m.hf_model), Some("nsi319/legal-led-base-16384"));
        assert!(model_by_id("gpt-5").is_none());
    }
}
