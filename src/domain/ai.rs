//! AI domain types and prompt construction
//!
//! Single-shot prompts forwarded to Azure OpenAI. No retrieval or multi-step
//! reasoning happens locally; the value here is the prompt shape and the
//! tier gating done in the route layer.

use serde::{Deserialize, Serialize};

/// Request DTO for content recommendations
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    /// Page or site the recommendation is about
    pub url: String,
    /// What the user wants: meta descriptions, content outline, etc.
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Optional audit findings to ground the answer in
    #[serde(default)]
    pub context: Option<String>,
}

/// Response DTO for content recommendations
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub content: String,
}

/// Request DTO for industry detection
#[derive(Debug, Clone, Deserialize)]
pub struct DetectIndustryRequest {
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response DTO for industry detection
#[derive(Debug, Clone, Serialize)]
pub struct DetectIndustryResponse {
    pub industry: String,
}

pub const RECOMMENDATION_SYSTEM_PROMPT: &str = "You are an SEO consultant. \
Give specific, actionable recommendations. Answer in plain text without \
markdown headers.";

pub const INDUSTRY_SYSTEM_PROMPT: &str = "You classify websites into a single \
industry category. Respond with only the industry name, nothing else.";

/// Build the user prompt for a content recommendation request
pub fn recommendation_prompt(req: &GenerateRequest) -> String {
    let mut prompt = format!(
        "Website: {}\nTask: {}\n",
        req.url.trim(),
        req.topic.trim()
    );

    if !req.keywords.is_empty() {
        prompt.push_str(&format!("Target keywords: {}\n", req.keywords.join(", ")));
    }

    if let Some(context) = req.context.as_deref().filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("Audit findings:\n{}\n", context.trim()));
    }

    prompt.push_str("Provide SEO content recommendations for this task.");
    prompt
}

/// Build the user prompt for an industry detection request
pub fn industry_prompt(req: &DetectIndustryRequest) -> String {
    match req.description.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(description) => format!(
            "Website: {}\nDescription: {}\nWhich industry is this website in?",
            req.url.trim(),
            description.trim()
        ),
        None => format!(
            "Website: {}\nWhich industry is this website in?",
            req.url.trim()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_prompt_includes_keywords_and_context() {
        let req = GenerateRequest {
            url: "https://example.com".to_string(),
            topic: "meta descriptions".to_string(),
            keywords: vec!["seo".to_string(), "audit".to_string()],
            context: Some("Missing H1 on 12 pages".to_string()),
        };

        let prompt = recommendation_prompt(&req);
        assert!(prompt.contains("Website: https://example.com"));
        assert!(prompt.contains("Target keywords: seo, audit"));
        assert!(prompt.contains("Missing H1 on 12 pages"));
    }

    #[test]
    fn recommendation_prompt_omits_empty_sections() {
        let req = GenerateRequest {
            url: "https://example.com".to_string(),
            topic: "outline".to_string(),
            keywords: vec![],
            context: Some("   ".to_string()),
        };

        let prompt = recommendation_prompt(&req);
        assert!(!prompt.contains("Target keywords"));
        assert!(!prompt.contains("Audit findings"));
    }

    #[test]
    fn industry_prompt_with_and_without_description() {
        let mut req = DetectIndustryRequest {
            url: "https://shop.example".to_string(),
            description: None,
        };
        assert!(!industry_prompt(&req).contains("Description:"));

        req.description = Some("Handmade ceramics store".to_string());
        assert!(industry_prompt(&req).contains("Handmade ceramics store"));
    }
}
