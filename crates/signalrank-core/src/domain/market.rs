use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{IndexCode, ValidationError};

/// Equity market of the Korea Exchange covered by the reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Kospi,
    Kosdaq,
}

impl Market {
    pub const ALL: [Self; 2] = [Self::Kospi, Self::Kosdaq];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kospi => "KOSPI",
            Self::Kosdaq => "KOSDAQ",
        }
    }

    /// Market id used by the KRX data portal.
    pub const fn provider_id(self) -> &'static str {
        match self {
            Self::Kospi => "STK",
            Self::Kosdaq => "KSQ",
        }
    }

    pub fn benchmark(self) -> IndexCode {
        let code = match self {
            Self::Kospi => "1001",
            Self::Kosdaq => "2001",
        };
        IndexCode::from_static(code)
    }

    /// Lowercase slug for file names.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Kospi => "kospi",
            Self::Kosdaq => "kosdaq",
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "KOSPI" | "STK" => Ok(Self::Kospi),
            "KOSDAQ" | "KSQ" => Ok(Self::Kosdaq),
            other => Err(ValidationError::InvalidMarket {
                value: other.to_owned(),
            }),
        }
    }
}

/// Either the whole exchange or one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketScope {
    All,
    Only(Market),
}

impl MarketScope {
    pub const fn provider_id(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Only(market) => market.provider_id(),
        }
    }
}

impl Display for MarketScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Only(market) => Display::fmt(market, f),
        }
    }
}

/// Investor category tracked by the net-buying report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorCategory {
    InvestmentTrust,
    PensionFund,
    PrivateEquity,
    Foreign,
    InstitutionTotal,
}

impl InvestorCategory {
    pub const ALL: [Self; 5] = [
        Self::InvestmentTrust,
        Self::PensionFund,
        Self::PrivateEquity,
        Self::Foreign,
        Self::InstitutionTotal,
    ];

    /// Presentation groups: fund managers first, then foreign/institution totals.
    pub const GROUPS: [&'static [Self]; 2] = [
        &[Self::InvestmentTrust, Self::PensionFund, Self::PrivateEquity],
        &[Self::Foreign, Self::InstitutionTotal],
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvestmentTrust => "investment_trust",
            Self::PensionFund => "pension_fund",
            Self::PrivateEquity => "private_equity",
            Self::Foreign => "foreign",
            Self::InstitutionTotal => "institution_total",
        }
    }

    /// Column label shown in rendered tables.
    pub const fn label(self) -> &'static str {
        match self {
            Self::InvestmentTrust => "투신",
            Self::PensionFund => "연기금",
            Self::PrivateEquity => "사모",
            Self::Foreign => "외국인",
            Self::InstitutionTotal => "기관",
        }
    }

    /// Investor type code of the KRX net-purchase endpoint.
    pub const fn provider_code(self) -> &'static str {
        match self {
            Self::InvestmentTrust => "3000",
            Self::PrivateEquity => "3100",
            Self::PensionFund => "6000",
            Self::InstitutionTotal => "7050",
            Self::Foreign => "9000",
        }
    }

    /// Whether the per-date flow of this category only appears in the
    /// detailed investor breakdown.
    pub const fn requires_detail(self) -> bool {
        matches!(
            self,
            Self::InvestmentTrust | Self::PensionFund | Self::PrivateEquity
        )
    }
}

impl Display for InvestorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestorCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidInvestor {
                value: value.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markets_map_to_benchmarks() {
        assert_eq!(Market::Kospi.benchmark().as_str(), "1001");
        assert_eq!(Market::Kosdaq.benchmark().as_str(), "2001");
    }

    #[test]
    fn parses_market_names_case_insensitively() {
        assert_eq!("kosdaq".parse::<Market>().expect("valid"), Market::Kosdaq);
        assert!("NYSE".parse::<Market>().is_err());
    }

    #[test]
    fn investor_groups_cover_every_category_once() {
        let mut seen: Vec<InvestorCategory> =
            InvestorCategory::GROUPS.iter().flat_map(|g| g.iter().copied()).collect();
        seen.sort();
        let mut all = InvestorCategory::ALL.to_vec();
        all.sort();
        assert_eq!(seen, all);
    }

    #[test]
    fn only_fund_categories_need_detail() {
        assert!(InvestorCategory::PensionFund.requires_detail());
        assert!(!InvestorCategory::Foreign.requires_detail());
        assert_eq!(
            "institution-total".parse::<InvestorCategory>().expect("valid"),
            InvestorCategory::InstitutionTotal
        );
    }
}
