//! Assistant identities

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conversation::DriverSet;

/// Contact address replies point users to
pub const DEFAULT_CONTACT_EMAIL: &str = "iipt.aiml@gmail.com";

/// The assistants this crate ships
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BotKind {
    Indeed,
    Gmtt,
    Nirankari,
    Safety,
    Interview,
}

impl BotKind {
    /// Short lowercase name used in file names and stored records
    pub fn slug(self) -> &'static str {
        match self {
            BotKind::Indeed => "indeed",
            BotKind::Gmtt => "gmtt",
            BotKind::Nirankari => "nirankari",
            BotKind::Safety => "safety",
            BotKind::Interview => "interview",
        }
    }

    /// Profile for the organisation assistants
    pub fn profile(self) -> Option<BotProfile> {
        match self {
            BotKind::Indeed => Some(BotProfile::indeed()),
            BotKind::Gmtt => Some(BotProfile::gmtt()),
            BotKind::Safety => Some(BotProfile::safety()),
            BotKind::Nirankari | BotKind::Interview => None,
        }
    }
}

impl fmt::Display for BotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Who an assistant speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotProfile {
    pub kind: BotKind,
    pub assistant_name: String,
    pub org_name: String,
    /// `company`, `foundation`, ...
    pub org_type: String,
    pub website: String,
    pub founder: Option<String>,
    pub services: Vec<String>,
    pub contact_email: String,
    pub drivers: DriverSet,
}

impl BotProfile {
    fn base(kind: BotKind, assistant_name: &str, org_name: &str, org_type: &str, website: &str) -> Self {
        Self {
            kind,
            assistant_name: assistant_name.to_string(),
            org_name: org_name.to_string(),
            org_type: org_type.to_string(),
            website: website.to_string(),
            founder: None,
            services: Vec::new(),
            contact_email: DEFAULT_CONTACT_EMAIL.to_string(),
            drivers: DriverSet::default(),
        }
    }

    fn with_services(mut self, services: &[&str]) -> Self {
        self.services = services.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_founder(mut self, founder: impl Into<String>) -> Self {
        self.founder = Some(founder.into());
        self
    }

    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = email.into();
        self
    }

    pub fn with_drivers(mut self, drivers: DriverSet) -> Self {
        self.drivers = drivers;
        self
    }

    pub fn indeed() -> Self {
        Self::base(
            BotKind::Indeed,
            "Infi",
            "Indeed Inspiring Infotech",
            "company",
            "https://indeedinspiring.com",
        )
        .with_founder("Mr. Kushal Sharma")
        .with_services(&["AI solutions", "web development", "digital transformation"])
        .with_drivers(DriverSet::indeed())
    }

    pub fn gmtt() -> Self {
        Self::base(
            BotKind::Gmtt,
            "TreeBot",
            "Give Me Trees Foundation",
            "foundation",
            "https://www.givemetrees.org",
        )
        .with_founder("Kuldeep Bharti")
        .with_services(&["tree planting", "environmental conservation", "urban greening"])
        .with_drivers(DriverSet::gmtt())
    }

    pub fn safety() -> Self {
        Self::base(
            BotKind::Safety,
            "SafeBot",
            "Indeed Inspiring Infotech Safety Training",
            "training programme",
            "https://indeedinspiring.com",
        )
        .with_services(&["workplace safety", "hazard reporting", "emergency procedures"])
        .with_drivers(DriverSet::safety())
    }

    /// Services as prose: `a, b and c`
    pub fn services_sentence(&self) -> String {
        match self.services.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_sentence() {
        assert_eq!(
            BotProfile::gmtt().services_sentence(),
            "tree planting, environmental conservation and urban greening"
        );

        let mut profile = BotProfile::indeed();
        profile.services = vec!["AI".into()];
        assert_eq!(profile.services_sentence(), "AI");
        profile.services.clear();
        assert_eq!(profile.services_sentence(), "");
    }

    #[test]
    fn test_kind_profiles() {
        assert_eq!(BotKind::Safety.profile().unwrap().assistant_name, "SafeBot");
        assert!(BotKind::Nirankari.profile().is_none());
        assert_eq!(BotKind::Gmtt.to_string(), "gmtt");
        assert_eq!(
            serde_json::to_string(&BotKind::Interview).unwrap(),
            "\"interview\""
        );
    }
}
