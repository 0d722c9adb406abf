//! crates/finance_core/src/validation/records.rs
//!
//! Field and cross-field rules for the finance records and for loan terms.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{FieldErrors, FieldReader, Record, Validate, MONEY, RATE};
use crate::advice::ChatPrompt;
use crate::domain::{
    ChatTurn, InvestmentType, LoanTerms, NewExpense, NewFinancialProfile, NewIncome,
    NewInvestment, RiskTolerance,
};

const MIN_AGE: i64 = 18;
const MAX_AGE: i64 = 100;
const MAX_TEXT_LEN: usize = 255;
const MAX_INVESTMENT_NAME_LEN: usize = 100;

/// Loan fields without which no affordability analysis is attempted.
pub const LOAN_REQUIRED_FIELDS: [&str; 3] = ["loan_amount", "interest_rate", "loan_tenure"];

fn max_rate() -> Decimal {
    Decimal::from(100)
}

impl Validate for NewFinancialProfile {
    fn validate(record: &Record, _today: NaiveDate) -> Result<Self, FieldErrors> {
        let mut fields = FieldReader::new(record);

        let age = fields.integer("age");
        if let Some(age) = age {
            fields.ensure(
                "age",
                (MIN_AGE..=MAX_AGE).contains(&age),
                "Age must be between 18 and 100.",
            );
        }

        let monthly_salary = fields.integer("monthly_salary");
        if let Some(salary) = monthly_salary {
            fields.ensure("monthly_salary", salary >= 0, "Monthly salary cannot be negative.");
        }

        let monthly_savings = if fields.is_absent("monthly_savings") {
            Some(0)
        } else {
            fields.optional_integer("monthly_savings")
        };
        if let Some(savings) = monthly_savings {
            fields.ensure(
                "monthly_savings",
                savings >= 0,
                "Monthly savings cannot be negative.",
            );
        }

        let risk_tolerance =
            fields.choice::<RiskTolerance>("risk_tolerance", &RiskTolerance::ALLOWED);

        fields.finish(move || {
            Some(NewFinancialProfile {
                age: i32::try_from(age?).ok()?,
                monthly_salary: monthly_salary?,
                monthly_savings: monthly_savings?,
                risk_tolerance: risk_tolerance?,
            })
        })
    }
}

/// Shared shape of income and expense entries: label, positive amount, past date.
fn ledger_entry(
    record: &Record,
    today: NaiveDate,
    label_field: &str,
    date_field: &str,
    future_message: &str,
) -> Result<(String, Decimal, NaiveDate), FieldErrors> {
    let mut fields = FieldReader::new(record);

    let label = fields.text(label_field, 3, MAX_TEXT_LEN);

    let amount = fields.decimal("amount", MONEY);
    if let Some(amount) = amount {
        fields.ensure("amount", amount > Decimal::ZERO, "Amount must be greater than 0.");
    }

    let date = fields.date(date_field);
    if let Some(date) = date {
        fields.ensure(date_field, date <= today, future_message);
    }

    fields.finish(move || Some((label?, amount?, date?)))
}

impl Validate for NewIncome {
    fn validate(record: &Record, today: NaiveDate) -> Result<Self, FieldErrors> {
        let (source, amount, date_received) = ledger_entry(
            record,
            today,
            "source",
            "date_received",
            "Date received cannot be in the future.",
        )?;
        Ok(NewIncome { source, amount, date_received })
    }
}

impl Validate for NewExpense {
    fn validate(record: &Record, today: NaiveDate) -> Result<Self, FieldErrors> {
        let (category, amount, date_spent) = ledger_entry(
            record,
            today,
            "category",
            "date_spent",
            "Date spent cannot be in the future.",
        )?;
        Ok(NewExpense { category, amount, date_spent })
    }
}

impl Validate for NewInvestment {
    fn validate(record: &Record, today: NaiveDate) -> Result<Self, FieldErrors> {
        let mut fields = FieldReader::new(record);

        let name = fields.text("name", 2, MAX_INVESTMENT_NAME_LEN);
        let investment_type =
            fields.choice::<InvestmentType>("investment_type", &InvestmentType::ALLOWED);

        let amount_invested = fields.decimal("amount_invested", MONEY);
        if let Some(amount) = amount_invested {
            fields.ensure(
                "amount_invested",
                amount > Decimal::ZERO,
                "Amount invested must be greater than 0.",
            );
        }

        let current_value = fields.decimal("current_value", MONEY);
        if let Some(value) = current_value {
            fields.ensure(
                "current_value",
                value >= Decimal::ZERO,
                "Current value cannot be negative.",
            );
        }

        let date_invested = fields.date("date_invested");
        if let Some(date) = date_invested {
            fields.ensure(
                "date_invested",
                date <= today,
                "Investment date cannot be in the future.",
            );
        }

        let interest_rate = fields.optional_decimal("interest_rate", RATE);
        if let Some(rate) = interest_rate {
            fields.ensure(
                "interest_rate",
                rate > Decimal::ZERO,
                "Interest rate must be greater than 0.",
            );
            fields.ensure(
                "interest_rate",
                rate <= max_rate(),
                "Interest rate cannot exceed 100.",
            );
        }

        let years = fields.optional_integer("years");
        if let Some(years) = years {
            fields.ensure("years", years >= 1, "Years must be at least 1.");
        }

        if investment_type.is_some_and(|kind| kind.requires_rate_and_term()) {
            for field in ["interest_rate", "years"] {
                if fields.is_absent(field) {
                    fields.error(field, "This field is required for SIP and FD investments.");
                }
            }
        }

        fields.finish(move || {
            Some(NewInvestment {
                name: name?,
                investment_type: investment_type?,
                amount_invested: amount_invested?,
                current_value: current_value?,
                date_invested: date_invested?,
                interest_rate,
                years: match years {
                    Some(years) => Some(i32::try_from(years).ok()?),
                    None => None,
                },
            })
        })
    }
}

impl Validate for LoanTerms {
    fn validate(record: &Record, _today: NaiveDate) -> Result<Self, FieldErrors> {
        let mut fields = FieldReader::new(record);

        let loan_type = fields.optional_text("loan_type", MAX_TEXT_LEN);

        let principal = fields.decimal("loan_amount", MONEY);
        if let Some(principal) = principal {
            fields.ensure(
                "loan_amount",
                principal > Decimal::ZERO,
                "Loan amount must be greater than 0.",
            );
        }

        let annual_rate = fields.decimal("interest_rate", RATE);
        if let Some(rate) = annual_rate {
            fields.ensure(
                "interest_rate",
                rate > Decimal::ZERO,
                "Interest rate must be greater than 0.",
            );
            fields.ensure(
                "interest_rate",
                rate <= max_rate(),
                "Interest rate cannot exceed 100.",
            );
        }

        let tenure_years = fields.integer("loan_tenure");
        if let Some(tenure) = tenure_years {
            fields.ensure(
                "loan_tenure",
                (1..=50).contains(&tenure),
                "Loan tenure must be between 1 and 50 years.",
            );
        }

        let existing_emi = if fields.is_absent("existing_loan_emi") {
            Some(Decimal::ZERO)
        } else {
            fields.optional_decimal("existing_loan_emi", MONEY)
        };
        if let Some(emi) = existing_emi {
            fields.ensure(
                "existing_loan_emi",
                emi >= Decimal::ZERO,
                "Existing EMI cannot be negative.",
            );
        }

        fields.finish(move || {
            Some(LoanTerms {
                loan_type,
                principal: principal?,
                annual_rate: annual_rate?,
                tenure_years: i32::try_from(tenure_years?).ok()?,
                existing_emi: existing_emi?,
            })
        })
    }
}

impl Validate for ChatTurn {
    fn validate(record: &Record, _today: NaiveDate) -> Result<Self, FieldErrors> {
        let mut fields = FieldReader::new(record);

        let message = fields.text(
            "message",
            ChatPrompt::MIN_MESSAGE_LEN,
            ChatPrompt::MAX_MESSAGE_LEN,
        );
        let history = fields.optional_turns("history");
        let chat_id = fields.optional_integer("chat_id");

        fields.finish(move || Some(ChatTurn { message: message?, history, chat_id }))
    }
}
