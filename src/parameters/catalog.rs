//! Parameter Catalog
//!
//! Loads the closed allow-list of parameter keys, grouped by agent domain.
//! The catalog is read once at startup and never mutated; every stage that
//! handles a key (match, update, payload build, save) checks it here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{FormIoError, Result};

const DEFAULT_CATALOG: &str = include_str!("catalog.yaml");

/// Coarse category used to scope which keys a prompt may address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentDomain {
    Building,
    Envelope,
    Facade,
    None,
}

impl AgentDomain {
    /// Routable domains in routing priority order
    pub const ROUTABLE: [AgentDomain; 3] = [
        AgentDomain::Building,
        AgentDomain::Envelope,
        AgentDomain::Facade,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentDomain::Building => "building",
            AgentDomain::Envelope => "envelope",
            AgentDomain::Facade => "facade",
            AgentDomain::None => "none",
        }
    }

    pub fn is_routable(&self) -> bool {
        !matches!(self, AgentDomain::None)
    }
}

impl fmt::Display for AgentDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AgentDomain {
    type Err = FormIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "building" => Ok(AgentDomain::Building),
            "envelope" => Ok(AgentDomain::Envelope),
            "facade" => Ok(AgentDomain::Facade),
            "none" => Ok(AgentDomain::None),
            other => Err(FormIoError::validation(format!(
                "Unknown agent domain '{}'. Valid values: building, envelope, facade, none",
                other
            ))),
        }
    }
}

/// One allow-listed parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ParameterSpec {
    /// Clamp a numeric value into the declared range
    pub fn clamp(&self, value: f64) -> f64 {
        let lower = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(lower, |max| lower.min(max))
    }

    /// Human-readable bounds for prompts, e.g. "between 0 and 30000 mm"
    pub fn bounds_hint(&self) -> Option<String> {
        let unit = self
            .unit
            .as_deref()
            .map(|u| format!(" {}", u))
            .unwrap_or_default();
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some(format!("between {} and {}{}", min, max, unit)),
            (Some(min), None) => Some(format!("at least {}{}", min, unit)),
            (None, Some(max)) => Some(format!("at most {}{}", max, unit)),
            (None, None) => None,
        }
    }
}

/// Parameters and routing keywords for one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub parameters: Vec<ParameterSpec>,
}

/// On-disk shape of the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    version: String,
    domains: BTreeMap<AgentDomain, DomainDefinition>,
}

/// The closed allow-list of parameter keys
#[derive(Debug, Clone)]
pub struct ParameterCatalog {
    version: String,
    domains: BTreeMap<AgentDomain, DomainDefinition>,
    index: HashMap<String, (AgentDomain, usize)>,
}

impl ParameterCatalog {
    /// Load the catalog compiled into the binary
    pub fn load_default() -> Result<Self> {
        Self::load_from_str(DEFAULT_CATALOG)
    }

    /// Load from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormIoError::Config(format!(
                "Failed to read parameter catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::load_from_str(&content)
    }

    /// Load from a YAML string
    pub fn load_from_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)
            .map_err(|e| FormIoError::Config(format!("Invalid parameter catalog: {}", e)))?;
        Self::from_file(file)
    }

    fn from_file(file: CatalogFile) -> Result<Self> {
        let mut domains = file.domains;
        let mut index = HashMap::new();

        if domains.contains_key(&AgentDomain::None) {
            return Err(FormIoError::Config(
                "Parameter catalog cannot define keys for domain 'none'".to_string(),
            ));
        }

        for (domain, definition) in domains.iter_mut() {
            if definition.parameters.is_empty() {
                return Err(FormIoError::Config(format!(
                    "Domain '{}' lists no parameters",
                    domain
                )));
            }
            for keyword in definition.keywords.iter_mut() {
                // An empty keyword would match every prompt
                if keyword.trim().is_empty() {
                    return Err(FormIoError::Config(format!(
                        "Domain '{}' has an empty routing keyword",
                        domain
                    )));
                }
                *keyword = keyword.to_lowercase();
            }
            for (position, spec) in definition.parameters.iter().enumerate() {
                if spec.key.trim().is_empty() {
                    return Err(FormIoError::Config(format!(
                        "Domain '{}' has a parameter with an empty key",
                        domain
                    )));
                }
                if let Some((existing, _)) = index.insert(spec.key.clone(), (*domain, position)) {
                    return Err(FormIoError::Config(format!(
                        "Parameter '{}' is listed in both '{}' and '{}'",
                        spec.key, existing, domain
                    )));
                }
            }
        }

        Ok(Self {
            version: file.version,
            domains,
            index,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Exact, case-sensitive allow-list membership
    pub fn is_valid_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Domain that owns a key
    pub fn domain_of(&self, key: &str) -> Option<AgentDomain> {
        self.index.get(key).map(|(domain, _)| *domain)
    }

    pub fn spec_for(&self, key: &str) -> Option<&ParameterSpec> {
        let (domain, position) = self.index.get(key)?;
        self.domains
            .get(domain)
            .and_then(|definition| definition.parameters.get(*position))
    }

    /// Keys a prompt routed to `domain` may address, in catalog order
    pub fn keys_for(&self, domain: AgentDomain) -> Vec<&str> {
        self.domains
            .get(&domain)
            .map(|definition| {
                definition
                    .parameters
                    .iter()
                    .map(|spec| spec.key.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lower-cased routing keywords for `domain`
    pub fn keywords_for(&self, domain: AgentDomain) -> &[String] {
        self.domains
            .get(&domain)
            .map(|definition| definition.keywords.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
