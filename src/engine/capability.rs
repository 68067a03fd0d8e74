//! Capability negotiation against the engine's advertised method names.
//!
//! Engines have exposed the same feature under different names over time.
//! Negotiation runs once per connection: for every capability the first
//! candidate the engine advertises wins, and later calls use the resolved
//! name directly.

use log::debug;

use crate::error::EngineError;

const LOG_TARGET: &str = "treelens::engine";

pub const HOVER_CANDIDATES: &[&str] = &["hover", "getHover", "hoverInfo"];
pub const COMPLETION_CANDIDATES: &[&str] = &["completions", "complete", "getCompletions"];
pub const EVALUATE_CANDIDATES: &[&str] = &["evaluate", "eval"];
pub const FORMAT_CANDIDATES: &[&str] = &["format", "formatSource"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Hover,
    Completion,
    Evaluate,
    Format,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Hover,
        Capability::Completion,
        Capability::Evaluate,
        Capability::Format,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Hover => "hover",
            Capability::Completion => "completion",
            Capability::Evaluate => "evaluate",
            Capability::Format => "format",
        }
    }

    /// Method names to try, in order of preference
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Capability::Hover => HOVER_CANDIDATES,
            Capability::Completion => COMPLETION_CANDIDATES,
            Capability::Evaluate => EVALUATE_CANDIDATES,
            Capability::Format => FORMAT_CANDIDATES,
        }
    }
}

/// Method names resolved for one engine connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    hover: Option<&'static str>,
    completion: Option<&'static str>,
    evaluate: Option<&'static str>,
    format: Option<&'static str>,
}

impl Capabilities {
    /// Resolve every capability against `advertised`
    pub fn negotiate<S: AsRef<str>>(advertised: &[S]) -> Self {
        let resolve = |capability: Capability| {
            let method = capability
                .candidates()
                .iter()
                .copied()
                .find(|candidate| advertised.iter().any(|m| m.as_ref() == *candidate));
            debug!(
                target: LOG_TARGET,
                "Capability {} resolved to {:?}",
                capability.name(),
                method
            );
            method
        };

        Self {
            hover: resolve(Capability::Hover),
            completion: resolve(Capability::Completion),
            evaluate: resolve(Capability::Evaluate),
            format: resolve(Capability::Format),
        }
    }

    /// Every capability resolved to its first candidate
    pub fn all() -> Self {
        Self {
            hover: Some(HOVER_CANDIDATES[0]),
            completion: Some(COMPLETION_CANDIDATES[0]),
            evaluate: Some(EVALUATE_CANDIDATES[0]),
            format: Some(FORMAT_CANDIDATES[0]),
        }
    }

    pub fn method(&self, capability: Capability) -> Option<&'static str> {
        match capability {
            Capability::Hover => self.hover,
            Capability::Completion => self.completion,
            Capability::Evaluate => self.evaluate,
            Capability::Format => self.format,
        }
    }

    /// Resolved method, or [`EngineError::Unsupported`]
    pub fn require(&self, capability: Capability) -> Result<&'static str, EngineError> {
        self.method(capability)
            .ok_or(EngineError::Unsupported(capability.name()))
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.method(capability).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["getHover", "hoverInfo"], Some("getHover"))]
    #[case(&["hoverInfo", "hover"], Some("hover"))]
    #[case(&["hoverInfo"], Some("hoverInfo"))]
    #[case(&["evaluate"], None)]
    fn test_first_candidate_wins(#[case] advertised: &[&str], #[case] expected: Option<&str>) {
        let caps = Capabilities::negotiate(advertised);
        assert_eq!(caps.method(Capability::Hover), expected);
    }

    #[test]
    fn test_missing_capability_is_unsupported() {
        let caps = Capabilities::negotiate(&["eval", "formatSource"]);
        assert_eq!(caps.require(Capability::Evaluate).unwrap(), "eval");
        assert_eq!(caps.require(Capability::Format).unwrap(), "formatSource");
        assert!(!caps.supports(Capability::Completion));
        assert!(matches!(
            caps.require(Capability::Completion),
            Err(EngineError::Unsupported("completion"))
        ));
    }

    #[test]
    fn test_negotiate_from_owned_names() {
        let advertised = vec!["complete".to_string(), "getCompletions".to_string()];
        let caps = Capabilities::negotiate(&advertised);
        assert_eq!(caps.method(Capability::Completion), Some("complete"));
    }

    #[test]
    fn test_all() {
        let caps = Capabilities::all();
        for capability in Capability::ALL {
            assert!(caps.supports(capability));
        }
    }
}
