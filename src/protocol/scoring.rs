// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Risk scoring of revealed figures.

use super::error::{AnalysisError, ProtocolResult};
use crate::storage::RiskClassification;

/// Scores strictly above this value flag the report.
pub const FLAG_THRESHOLD: u32 = 70;

/// Maximum score a scorer may produce.
pub const MAX_SCORE: u32 = 100;

/// A plaintext score with the method that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskScore {
    pub value: u32,
    pub method: String,
}

impl RiskScore {
    pub fn new(value: u32, method: impl Into<String>) -> Self {
        Self {
            value,
            method: method.into(),
        }
    }

    pub fn classify(&self, threshold: u32) -> RiskClassification {
        if self.value > threshold {
            RiskClassification::Flagged
        } else {
            RiskClassification::Analyzed
        }
    }
}

/// Revealed report figures, parsed from oracle cleartexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealedFigures {
    pub revenue: u64,
    pub expenses: u64,
    pub tax_data: u64,
}

impl RevealedFigures {
    /// Parse cleartexts delivered in ciphertext order (revenue, expenses, tax).
    pub fn parse(cleartexts: &[String]) -> ProtocolResult<Self> {
        let field = |index: usize, name: &'static str| -> ProtocolResult<u64> {
            let value = cleartexts.get(index).map(String::as_str).unwrap_or_default();
            value.trim().parse().map_err(|_| AnalysisError::MalformedCleartext {
                field: name,
                value: value.to_string(),
            })
        };
        Ok(Self {
            revenue: field(0, "revenue")?,
            expenses: field(1, "expenses")?,
            tax_data: field(2, "tax_data")?,
        })
    }
}

/// Produces a plaintext risk score from revealed figures.
pub trait RiskScorer: Send + Sync {
    fn method(&self) -> &str;

    fn score(&self, figures: &RevealedFigures) -> ProtocolResult<RiskScore>;
}

/// Weighs the expense ratio against the effective tax rate.
///
/// `score = min(100, 0.7 * expense% + 1.5 * (20 - min(tax%, 20)))`, and a
/// report with zero revenue scores 100.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpenseTaxRatioScorer;

impl RiskScorer for ExpenseTaxRatioScorer {
    fn method(&self) -> &str {
        "expense-tax-ratio/v1"
    }

    fn score(&self, figures: &RevealedFigures) -> ProtocolResult<RiskScore> {
        if figures.revenue == 0 {
            return Ok(RiskScore::new(MAX_SCORE, self.method()));
        }

        let revenue = u128::from(figures.revenue);
        let expense_pct = u128::from(figures.expenses) * 100 / revenue;
        let tax_pct = (u128::from(figures.tax_data) * 100 / revenue).min(20);

        let raw = expense_pct * 7 / 10 + (20 - tax_pct) * 3 / 2;
        let value = raw.min(u128::from(MAX_SCORE)) as u32;
        Ok(RiskScore::new(value, self.method()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figures(revenue: u64, expenses: u64, tax_data: u64) -> RevealedFigures {
        RevealedFigures {
            revenue,
            expenses,
            tax_data,
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(RiskScore::new(85, "m").classify(FLAG_THRESHOLD), RiskClassification::Flagged);
        assert_eq!(RiskScore::new(70, "m").classify(FLAG_THRESHOLD), RiskClassification::Analyzed);
        assert_eq!(RiskScore::new(40, "m").classify(FLAG_THRESHOLD), RiskClassification::Analyzed);
    }

    #[test]
    fn healthy_company_scores_low() {
        // 50% expenses, 20% tax
        let score = ExpenseTaxRatioScorer.score(&figures(1000, 500, 200)).unwrap();
        assert_eq!(score.value, 35);
    }

    #[test]
    fn loss_making_untaxed_company_is_capped() {
        let score = ExpenseTaxRatioScorer.score(&figures(1000, 1500, 0)).unwrap();
        assert_eq!(score.value, 100);
    }

    #[test]
    fn zero_revenue_is_maximal_risk() {
        let score = ExpenseTaxRatioScorer.score(&figures(0, 10, 0)).unwrap();
        assert_eq!(score.value, MAX_SCORE);
    }

    #[test]
    fn parse_rejects_non_numeric_cleartexts() {
        let ok = RevealedFigures::parse(&["1".into(), " 2 ".into(), "3".into()]).unwrap();
        assert_eq!(ok, figures(1, 2, 3));

        let bad = RevealedFigures::parse(&["1".into(), "two".into(), "3".into()]);
        assert!(matches!(
            bad,
            Err(AnalysisError::MalformedCleartext { field: "expenses", .. })
        ));

        let short = RevealedFigures::parse(&["1".into()]);
        assert!(matches!(
            short,
            Err(AnalysisError::MalformedCleartext { field: "expenses", .. })
        ));
    }
}
