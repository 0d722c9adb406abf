//! crates/finance_core/src/summary.rs
//!
//! Assembles a user's profile and ledgers into the plain-text block that every
//! advice prompt is built around. Composition is a pure read.

use rust_decimal::Decimal;
use std::fmt::Write;

use crate::advice::AdviceError;
use crate::domain::{Expense, FinancialProfile, Income, Investment, InvestmentType, UserId};
use crate::ports::DatabaseService;

pub(crate) const CURRENCY: &str = "₹";

/// Everything the advisor knows about one user at one moment.
#[derive(Debug, Clone)]
pub struct FinancialSnapshot {
    pub profile: FinancialProfile,
    pub incomes: Vec<Income>,
    pub expenses: Vec<Expense>,
    pub investments: Vec<Investment>,
}

impl FinancialSnapshot {
    /// Loads a user's records. A missing profile is a precondition failure, never defaulted.
    pub async fn load(db: &dyn DatabaseService, user_id: UserId) -> Result<Self, AdviceError> {
        let profile = db
            .get_profile_for_user(user_id)
            .await?
            .ok_or(AdviceError::ProfileRequired)?;
        let incomes = db.list_incomes(user_id).await?;
        let expenses = db.list_expenses(user_id).await?;
        let investments = db.list_investments(user_id).await?;
        Ok(Self { profile, incomes, expenses, investments })
    }

    pub fn total_expenses(&self) -> Decimal {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    pub fn total_income(&self) -> Decimal {
        self.incomes.iter().map(|i| i.amount).sum()
    }

    pub fn has_stock_holdings(&self) -> bool {
        self.investments
            .iter()
            .any(|i| i.investment_type == InvestmentType::Stocks)
    }

    /// Renders the deterministic summary block. Empty ledgers render an explicit
    /// placeholder so the prompt keeps the same sections regardless of data volume.
    pub fn compose(&self) -> String {
        let mut out = String::new();
        self.write_profile(&mut out);
        out.push('\n');
        self.write_incomes(&mut out);
        out.push('\n');
        self.write_expenses(&mut out);
        out.push('\n');
        self.write_investments(&mut out);
        out
    }

    fn write_profile(&self, out: &mut String) {
        let p = &self.profile;
        let _ = writeln!(out, "### User Profile");
        let _ = writeln!(out, "- Age: {}", p.age);
        let _ = writeln!(out, "- Monthly Salary: {}{}", CURRENCY, p.monthly_salary);
        let _ = writeln!(out, "- Monthly Savings: {}{}", CURRENCY, p.monthly_savings);
        let _ = writeln!(out, "- Risk Tolerance: {}", p.risk_tolerance);
    }

    fn write_incomes(&self, out: &mut String) {
        let _ = writeln!(out, "### Income Sources");
        if self.incomes.is_empty() {
            let _ = writeln!(out, "No income details provided.");
            return;
        }
        for income in &self.incomes {
            let _ = writeln!(
                out,
                "- {}: {}{} (received {})",
                income.source, CURRENCY, income.amount, income.date_received
            );
        }
    }

    fn write_expenses(&self, out: &mut String) {
        let _ = writeln!(out, "### Expenses");
        if self.expenses.is_empty() {
            let _ = writeln!(out, "No expense details provided.");
            return;
        }
        for expense in &self.expenses {
            let _ = writeln!(
                out,
                "- {}: {}{} (spent {})",
                expense.category, CURRENCY, expense.amount, expense.date_spent
            );
        }
    }

    fn write_investments(&self, out: &mut String) {
        let _ = writeln!(out, "### Investment Portfolio");
        if self.investments.is_empty() {
            let _ = writeln!(out, "No investment details provided.");
            return;
        }
        for inv in &self.investments {
            let _ = writeln!(out, "- {}", describe_investment(inv));
        }
    }
}

/// One holding on one line, with rate and term when the instrument has them.
pub(crate) fn describe_investment(inv: &Investment) -> String {
    let mut line = format!(
        "{} ({}): Invested {}{}, Current {}{}",
        inv.name, inv.investment_type, CURRENCY, inv.amount_invested, CURRENCY, inv.current_value
    );
    if let Some(rate) = inv.interest_rate {
        let _ = write!(line, ", {}% p.a.", rate);
    }
    if let Some(years) = inv.years {
        let _ = write!(line, ", {} year(s)", years);
    }
    line
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::RiskTolerance;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    pub(crate) fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub(crate) fn profile() -> FinancialProfile {
        FinancialProfile {
            id: 1,
            user_id: 7,
            age: 30,
            monthly_salary: 50000,
            monthly_savings: 10000,
            risk_tolerance: RiskTolerance::Medium,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub(crate) fn snapshot() -> FinancialSnapshot {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        FinancialSnapshot {
            profile: profile(),
            incomes: vec![Income {
                id: 1,
                user_id: 7,
                source: "Salary".into(),
                amount: dec("5000.00"),
                date_received: day,
            }],
            expenses: vec![
                Expense {
                    id: 1,
                    user_id: 7,
                    category: "Rent".into(),
                    amount: dec("1000.00"),
                    date_spent: day,
                },
                Expense {
                    id: 2,
                    user_id: 7,
                    category: "Groceries".into(),
                    amount: dec("250.50"),
                    date_spent: day,
                },
            ],
            investments: vec![Investment {
                id: 1,
                user_id: 7,
                name: "Nifty SIP".into(),
                investment_type: InvestmentType::Sip,
                amount_invested: dec("5000.00"),
                current_value: dec("5200.00"),
                date_invested: day,
                interest_rate: Some(dec("12.50")),
                years: Some(5),
            }],
        }
    }

    #[test]
    fn compose_lists_every_section() {
        let text = snapshot().compose();
        assert!(text.contains("- Age: 30"));
        assert!(text.contains("- Monthly Savings: ₹10000"));
        assert!(text.contains("- Risk Tolerance: medium"));
        assert!(text.contains("- Salary: ₹5000.00 (received 2025-03-01)"));
        assert!(text.contains("- Groceries: ₹250.50 (spent 2025-03-01)"));
        assert!(text.contains(
            "Nifty SIP (sip): Invested ₹5000.00, Current ₹5200.00, 12.50% p.a., 5 year(s)"
        ));
    }

    #[test]
    fn empty_ledgers_render_placeholders() {
        let snapshot = FinancialSnapshot {
            profile: profile(),
            incomes: vec![],
            expenses: vec![],
            investments: vec![],
        };
        let text = snapshot.compose();
        assert!(text.contains("### Income Sources\nNo income details provided."));
        assert!(text.contains("### Expenses\nNo expense details provided."));
        assert!(text.contains("### Investment Portfolio\nNo investment details provided."));
    }

    #[test]
    fn compose_is_deterministic() {
        let snapshot = snapshot();
        assert_eq!(snapshot.compose(), snapshot.compose());
        assert_eq!(snapshot.total_expenses(), dec("1250.50"));
        assert!(!snapshot.has_stock_holdings());
    }
}
