//! Agent Router
//!
//! Picks the design domain a prompt is about using the catalog's keyword
//! sets. Domains are checked in priority order (building, envelope, facade)
//! and the first one with any keyword inside the prompt wins, even if a later
//! domain would match more keywords.

use std::sync::Arc;

use crate::parameters::{AgentDomain, ParameterCatalog};

#[derive(Debug, Clone)]
pub struct AgentRouter {
    catalog: Arc<ParameterCatalog>,
}

impl AgentRouter {
    pub fn new(catalog: Arc<ParameterCatalog>) -> Self {
        Self { catalog }
    }

    /// Classify a prompt. Pure: no I/O, same prompt gives same domain.
    pub fn route(&self, prompt: &str) -> AgentDomain {
        let lowered = prompt.to_lowercase();
        AgentDomain::ROUTABLE
            .into_iter()
            .find(|domain| {
                self.catalog
                    .keywords_for(*domain)
                    .iter()
                    .any(|keyword| lowered.contains(keyword.as_str()))
            })
            .unwrap_or(AgentDomain::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> AgentRouter {
        AgentRouter::new(Arc::new(ParameterCatalog::load_default().unwrap()))
    }

    #[test]
    fn test_routes_building_prompt() {
        assert_eq!(
            router().route("increase block2 width"),
            AgentDomain::Building
        );
        assert_eq!(
            router().route("Make the PODIUM two floors taller"),
            AgentDomain::Building
        );
    }

    #[test]
    fn test_routes_envelope_and_facade() {
        assert_eq!(
            router().route("reduce the front setback"),
            AgentDomain::Envelope
        );
        assert_eq!(
            router().route("use more glazing on the facade"),
            AgentDomain::Facade
        );
    }

    #[test]
    fn test_first_match_wins() {
        // Mentions both a building keyword and an envelope keyword
        assert_eq!(
            router().route("push the block back to the setback line"),
            AgentDomain::Building
        );
        // Envelope outranks facade
        assert_eq!(
            router().route("align the facade panels with the site boundary"),
            AgentDomain::Envelope
        );
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(router().route("make it nicer"), AgentDomain::None);
        assert_eq!(router().route(""), AgentDomain::None);
    }

    #[test]
    fn test_deterministic() {
        let router = router();
        let prompt = "widen the courtyard and add mullions";
        let first = router.route(prompt);
        for _ in 0..10 {
            assert_eq!(router.route(prompt), first);
        }
    }
}
