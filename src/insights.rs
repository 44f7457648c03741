use crate::config::InsightConfig;
use crate::ingestion::{is_core_category, CategoryResolver, LedgerClass};
use crate::schema::{
    AiInsight, AnomalyDetection, EmergencyFundStatus, EntityContext, FinancialHealth, InsightType,
    LedgerEntry, RiskLevel, Severity, SpendingPattern, TrendDirection,
};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Composes anomalies, spending patterns and the health assessment into
/// actionable insights.
pub struct InsightGenerator<'a> {
    config: &'a InsightConfig,
}

impl<'a> InsightGenerator<'a> {
    pub fn new(config: &'a InsightConfig) -> Self {
        Self { config }
    }

    pub fn generate(
        &self,
        entries: &[LedgerEntry],
        anomalies: &[AnomalyDetection],
        patterns: &[SpendingPattern],
        health: &FinancialHealth,
    ) -> Vec<AiInsight> {
        if entries.len() < self.config.min_records {
            return Vec::new();
        }

        let context = health.context;
        let mut insights = Vec::new();

        insights.extend(self.anomaly_insights(entries, anomalies, context));
        insights.extend(self.trend_insights(entries, patterns, context));
        insights.extend(self.risk_insight(health));
        insights.extend(self.opportunity_insight(health));

        if self.config.rank_by_severity {
            insights.sort_by(|a, b| {
                b.severity.cmp(&a.severity).then_with(|| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(Ordering::Equal)
                })
            });
        }

        debug!("Generated {} insights", insights.len());
        insights
    }

    pub fn severity_for(&self, confidence: f64) -> Severity {
        if confidence > self.config.high_severity_confidence {
            Severity::High
        } else if confidence > self.config.medium_severity_confidence {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    fn anomaly_insights(
        &self,
        entries: &[LedgerEntry],
        anomalies: &[AnomalyDetection],
        context: EntityContext,
    ) -> Vec<AiInsight> {
        let by_id: HashMap<&str, &LedgerEntry> =
            entries.iter().map(|e| (e.id.as_str(), e)).collect();

        anomalies
            .iter()
            .enumerate()
            .map(|(idx, anomaly)| {
                let entry = by_id.get(anomaly.record_id.as_str());
                AiInsight {
                    id: format!(
                        "anomaly-{}-{}-{}",
                        anomaly.anomaly_type.as_str(),
                        anomaly.record_id,
                        idx
                    ),
                    insight_type: InsightType::Anomaly,
                    title: anomaly.anomaly_type.title().to_string(),
                    description: anomaly.explanation.clone(),
                    severity: self.severity_for(anomaly.confidence),
                    confidence: anomaly.confidence,
                    actionable: anomaly.suggested_action.is_some(),
                    action: anomaly.suggested_action.clone(),
                    category: entry.map(|e| e.category.clone()),
                    amount: entry.map(|e| e.amount),
                    date: entry.map(|e| e.date),
                    context: Some(context),
                }
            })
            .collect()
    }

    /// Rising categories with enough history that are either core or a
    /// meaningful share of all records.
    fn trend_insights(
        &self,
        entries: &[LedgerEntry],
        patterns: &[SpendingPattern],
        context: EntityContext,
    ) -> Vec<AiInsight> {
        let total = entries.len() as f64;
        let resolver = CategoryResolver::build(context, entries);

        patterns
            .iter()
            .filter(|p| p.trend == TrendDirection::Increasing)
            .filter(|p| p.frequency >= self.config.trend_min_occurrences)
            .filter(|p| {
                p.frequency as f64 / total > self.config.trend_min_share
                    || is_core_category(context, &p.category)
            })
            .map(|p| {
                let earning = resolver.class_of(&p.category) == LedgerClass::Income;
                let (title, severity, action) = if earning {
                    (
                        format!("'{}' is growing", p.category),
                        Severity::Low,
                        None,
                    )
                } else {
                    (
                        format!("Spending on '{}' is rising", p.category),
                        Severity::Medium,
                        Some(format!(
                            "Review recent '{}' transactions and set a monthly limit",
                            p.category
                        )),
                    )
                };

                AiInsight {
                    id: format!("trend-{}", p.category),
                    insight_type: InsightType::Trend,
                    title,
                    description: format!(
                        "Recent '{}' records run above the earliest ones ({} records, average {:.2}).",
                        p.category, p.frequency, p.average_amount
                    ),
                    severity,
                    confidence: self.config.trend_confidence,
                    actionable: action.is_some(),
                    action,
                    category: Some(p.category.clone()),
                    amount: Some(p.average_amount),
                    date: Some(p.last_occurrence),
                    context: Some(context),
                }
            })
            .collect()
    }

    fn risk_insight(&self, health: &FinancialHealth) -> Option<AiInsight> {
        if health.risk_level != RiskLevel::High {
            return None;
        }

        let fund = match health.emergency_fund_status {
            EmergencyFundStatus::Good => "adequate",
            EmergencyFundStatus::Warning => "below target",
            EmergencyFundStatus::Critical => "critically low",
        };

        Some(AiInsight {
            id: "risk-overall".to_string(),
            insight_type: InsightType::Risk,
            title: "High financial risk".to_string(),
            description: format!(
                "Debt-to-income is {:.2}, savings rate is {:.1}% and emergency reserves are {}.",
                health.debt_to_income_ratio,
                health.savings_rate * 100.0,
                fund
            ),
            severity: Severity::High,
            confidence: self.config.risk_confidence,
            actionable: true,
            action: Some(match health.context {
                EntityContext::Individual => {
                    "Cut discretionary spending and pay down high-interest debt first".to_string()
                }
                EntityContext::Organization => {
                    "Review cost structure and short-term liabilities".to_string()
                }
            }),
            category: None,
            amount: None,
            date: None,
            context: Some(health.context),
        })
    }

    fn opportunity_insight(&self, health: &FinancialHealth) -> Option<AiInsight> {
        let (title, description, shortfall) = match (&health.context, &health.organization) {
            (EntityContext::Organization, Some(metrics)) => {
                if metrics.profit_margin >= self.config.profit_margin_guidance {
                    return None;
                }
                (
                    "Improve profit margin".to_string(),
                    format!(
                        "Profit margin is {:.1}%, under the {:.0}% guidance.",
                        metrics.profit_margin, self.config.profit_margin_guidance
                    ),
                    metrics.profit_margin < 0.0,
                )
            }
            _ => {
                if health.savings_rate >= self.config.savings_rate_guidance {
                    return None;
                }
                (
                    "Grow your savings rate".to_string(),
                    format!(
                        "Savings rate is {:.1}%, under the {:.0}% guidance.",
                        health.savings_rate * 100.0,
                        self.config.savings_rate_guidance * 100.0
                    ),
                    health.savings_rate < 0.0,
                )
            }
        };

        Some(AiInsight {
            id: "opportunity-savings".to_string(),
            insight_type: InsightType::Opportunity,
            title,
            description,
            severity: if shortfall { Severity::Medium } else { Severity::Low },
            confidence: self.config.opportunity_confidence,
            actionable: true,
            action: Some("Automate a fixed transfer to savings at the start of each month".to_string()),
            category: None,
            amount: None,
            date: None,
            context: Some(health.context),
        })
    }
}
