use crate::config::HealthConfig;
use crate::ingestion::{CategoryResolver, LedgerClass};
use crate::schema::{
    EmergencyFundStatus, EntityContext, FinancialHealth, LedgerEntry, OrganizationMetrics,
    RiskLevel,
};
use crate::utils::safe_div;
use log::debug;

/// Ledger totals by accounting class, as magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerTotals {
    pub income: f64,
    pub expenses: f64,
    pub assets: f64,
    pub liabilities: f64,
    pub equity: f64,
}

impl LedgerTotals {
    pub fn from_entries(entries: &[LedgerEntry], resolver: &CategoryResolver) -> Self {
        let mut totals = Self::default();
        for entry in entries {
            let magnitude = entry.amount.abs();
            match resolver.class_of(&entry.category) {
                LedgerClass::Income => totals.income += magnitude,
                LedgerClass::Expense => totals.expenses += magnitude,
                LedgerClass::Asset => totals.assets += magnitude,
                LedgerClass::Liability => totals.liabilities += magnitude,
                LedgerClass::Equity => totals.equity += magnitude,
                LedgerClass::Other if entry.amount > 0.0 => totals.income += magnitude,
                LedgerClass::Other => totals.expenses += magnitude,
            }
        }
        totals
    }

    /// Assets plus any positive surplus of income over expenses.
    pub fn reserves(&self) -> f64 {
        self.assets + (self.income - self.expenses).max(0.0)
    }
}

pub struct FinancialHealthAssessor<'a> {
    config: &'a HealthConfig,
}

impl<'a> FinancialHealthAssessor<'a> {
    pub fn new(config: &'a HealthConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, entries: &[LedgerEntry], context: EntityContext) -> FinancialHealth {
        let resolver = CategoryResolver::build(context, entries);
        let totals = LedgerTotals::from_entries(entries, &resolver);
        debug!("Ledger totals for {:?}: {:?}", context, totals);

        match context {
            EntityContext::Individual => self.assess_individual(&totals),
            EntityContext::Organization if entries.len() < self.config.organization_min_records => {
                debug!(
                    "Only {} records; using organization defaults",
                    entries.len()
                );
                self.organization_defaults()
            }
            EntityContext::Organization => self.assess_organization(&totals),
        }
    }

    pub fn assess_individual(&self, totals: &LedgerTotals) -> FinancialHealth {
        let cfg = self.config;
        let debt_to_income_ratio = safe_div(totals.liabilities, totals.income);
        let savings_rate = safe_div(totals.income - totals.expenses, totals.income);
        let spending_efficiency = safe_div(totals.expenses, totals.income) * 100.0;
        let emergency_fund_status = self.emergency_fund_status(totals);

        let points = cfg.debt_to_income.points_above(debt_to_income_ratio)
            + cfg.savings_rate.points_below(savings_rate)
            + cfg.spending_efficiency.points_above(spending_efficiency)
            + fund_points(emergency_fund_status);

        FinancialHealth {
            debt_to_income_ratio,
            savings_rate,
            emergency_fund_status,
            spending_efficiency,
            risk_level: self.risk_from_points(points, emergency_fund_status),
            context: EntityContext::Individual,
            organization: None,
        }
    }

    pub fn assess_organization(&self, totals: &LedgerTotals) -> FinancialHealth {
        let cfg = self.config;
        let revenue = totals.income;
        let costs = totals.expenses;

        let metrics = OrganizationMetrics {
            cash_flow_ratio: self.coverage_ratio(totals.assets, totals.liabilities),
            working_capital_ratio: self.coverage_ratio(totals.reserves(), totals.liabilities),
            profit_margin: safe_div(revenue - costs, revenue) * 100.0,
            expense_ratio: safe_div(costs, revenue) * 100.0,
        };
        let emergency_fund_status = self.emergency_fund_status(totals);

        let points = cfg.profit_margin.points_below(metrics.profit_margin)
            + cfg.expense_ratio.points_above(metrics.expense_ratio)
            + cfg.cash_flow_ratio.points_below(metrics.cash_flow_ratio)
            + cfg.working_capital_ratio.points_below(metrics.working_capital_ratio)
            + fund_points(emergency_fund_status);

        FinancialHealth {
            debt_to_income_ratio: safe_div(totals.liabilities, revenue),
            savings_rate: metrics.profit_margin / 100.0,
            emergency_fund_status,
            spending_efficiency: metrics.expense_ratio,
            risk_level: self.risk_from_points(points, emergency_fund_status),
            context: EntityContext::Organization,
            organization: Some(metrics),
        }
    }

    /// Conservative industry ratios used when an organization has too few
    /// records; zeros would read as perfect health.
    pub fn organization_defaults(&self) -> FinancialHealth {
        let cfg = self.config;
        let d = &cfg.organization_defaults;
        let emergency_fund_status = EmergencyFundStatus::Warning;

        let points = cfg.profit_margin.points_below(d.profit_margin)
            + cfg.expense_ratio.points_above(d.expense_ratio)
            + cfg.cash_flow_ratio.points_below(d.cash_flow_ratio)
            + cfg.working_capital_ratio.points_below(d.working_capital_ratio)
            + fund_points(emergency_fund_status);

        FinancialHealth {
            debt_to_income_ratio: d.debt_to_income_ratio,
            savings_rate: d.savings_rate,
            emergency_fund_status,
            spending_efficiency: d.spending_efficiency,
            risk_level: self.risk_from_points(points, emergency_fund_status),
            context: EntityContext::Organization,
            organization: Some(OrganizationMetrics {
                cash_flow_ratio: d.cash_flow_ratio,
                working_capital_ratio: d.working_capital_ratio,
                profit_margin: d.profit_margin,
                expense_ratio: d.expense_ratio,
            }),
        }
    }

    /// Reserves against `emergency_fund_months` of average monthly expenses,
    /// where the ledger total is treated as a year of spending.
    pub fn emergency_fund_status(&self, totals: &LedgerTotals) -> EmergencyFundStatus {
        let target = self.config.emergency_fund_months * (totals.expenses / 12.0);
        if target <= 0.0 {
            return EmergencyFundStatus::Good;
        }

        let coverage = totals.reserves() / target;
        if coverage < self.config.critical_coverage {
            EmergencyFundStatus::Critical
        } else if coverage < self.config.warning_coverage {
            EmergencyFundStatus::Warning
        } else {
            EmergencyFundStatus::Good
        }
    }

    pub fn classify_risk(&self, points: u32) -> RiskLevel {
        if points >= self.config.high_risk_points {
            RiskLevel::High
        } else if points >= self.config.medium_risk_points {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn risk_from_points(&self, points: u32, fund: EmergencyFundStatus) -> RiskLevel {
        let scored = self.classify_risk(points);
        let reconciled = reconcile_risk(scored, fund);
        debug!(
            "Risk points {} -> {:?}, reconciled with {:?} fund to {:?}",
            points, scored, fund, reconciled
        );
        reconciled
    }

    fn coverage_ratio(&self, cover: f64, liabilities: f64) -> f64 {
        if liabilities.abs() < 1e-9 && cover.abs() < 1e-9 {
            self.config.neutral_coverage_ratio
        } else {
            safe_div(cover, liabilities)
        }
    }
}

fn fund_points(status: EmergencyFundStatus) -> u32 {
    match status {
        EmergencyFundStatus::Good => 0,
        EmergencyFundStatus::Warning => 1,
        EmergencyFundStatus::Critical => 2,
    }
}

/// Keeps the risk level consistent with the emergency fund: a good fund caps
/// risk at medium and a critical fund raises it to at least medium.
pub fn reconcile_risk(risk: RiskLevel, fund: EmergencyFundStatus) -> RiskLevel {
    match fund {
        EmergencyFundStatus::Good => risk.min(RiskLevel::Medium),
        EmergencyFundStatus::Critical => risk.max(RiskLevel::Medium),
        EmergencyFundStatus::Warning => risk,
    }
}
