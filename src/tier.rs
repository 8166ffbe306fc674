//! Per-tier search profiles
//!
//! Coverage and quality figures are descriptive labels picked by tier. They
//! are estimates with no measured basis and must be presented as such.

use serde::Serialize;

use crate::catalog::AuthTier;
use crate::types::DataQuality;

pub const ESTIMATES_NOTE: &str =
    "Coverage and data quality are approximate estimates picked by authentication tier, not measured guarantees";

/// Static description of what a tier offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierProfile {
    pub tier: AuthTier,
    pub strategy: &'static str,
    pub coverage: &'static str,
    pub data_quality: DataQuality,
    pub data_points: &'static [&'static str],
}

const ANONYMOUS: TierProfile = TierProfile {
    tier: AuthTier::Anonymous,
    strategy: "Basic Public Search",
    coverage: "60-70%",
    data_quality: DataQuality::Basic,
    data_points: &["basic_process_info", "parties", "movements", "court_info"],
};

const CREDENTIALED: TierProfile = TierProfile {
    tier: AuthTier::Credentialed,
    strategy: "OAB Enhanced Search",
    coverage: "85-90%",
    data_quality: DataQuality::Detailed,
    data_points: &[
        "complete_process_info",
        "confidential_movements",
        "sealed_information",
        "party_details",
        "lawyer_information",
        "procedural_history",
    ],
};

const CERTIFICATED: TierProfile = TierProfile {
    tier: AuthTier::Certificated,
    strategy: "Full Certificate Search",
    coverage: "95-99%",
    data_quality: DataQuality::Complete,
    data_points: &[
        "all_process_data",
        "sensitive_information",
        "complete_documentation",
        "judicial_decisions",
        "administrative_data",
        "financial_information",
    ],
};

pub fn profile(tier: AuthTier) -> TierProfile {
    match tier {
        AuthTier::Anonymous => ANONYMOUS,
        AuthTier::Credentialed => CREDENTIALED,
        AuthTier::Certificated => CERTIFICATED,
    }
}
