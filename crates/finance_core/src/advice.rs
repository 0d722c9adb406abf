//! crates/finance_core/src/advice.rs
//!
//! Prompt strategies for the four advice modes. Each mode is its own type with
//! its own inputs; all of them turn a `FinancialSnapshot` into an ordered list of
//! chat turns through the `AdvicePrompt` trait, and `advise` drives the round trip.

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::fmt::Write;

use crate::domain::{ChatMessage, ChatRole, InvestmentType, LoanTerms, UserId};
use crate::ports::{AdviceService, DatabaseService, PortError};
use crate::summary::{describe_investment, FinancialSnapshot, CURRENCY};
use crate::validation::{is_absent, FieldErrors, Record, Validate, LOAN_REQUIRED_FIELDS};

const ADVISOR_PERSONA: &str =
    "You are an expert financial advisor specializing in the Indian market.";

/// How many prior turns a chat request may replay.
pub const MAX_HISTORY_TURNS: usize = 10;

/// Share of monthly income above which total EMIs are considered unaffordable.
pub const DTI_THRESHOLD_PERCENT: u32 = 40;

#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
    #[error("Please complete your financial profile before requesting advice.")]
    ProfileRequired,
    #[error("Loan details are required: {0}.")]
    MissingLoanTerms(String),
    #[error("Invalid loan details: {0}")]
    InvalidLoanTerms(FieldErrors),
    #[error("The advice service returned an empty reply.")]
    EmptyReply,
    #[error("The advice request was cancelled.")]
    Cancelled,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// A mode-specific way of turning a snapshot into a conversation.
pub trait AdvicePrompt: Send + Sync {
    /// Short name used in logs.
    fn mode(&self) -> &'static str;

    fn build_messages(&self, snapshot: &FinancialSnapshot) -> Vec<ChatMessage>;
}

/// Loads the caller's snapshot, builds the mode's conversation and returns the reply.
///
/// No remote call is made when the profile is missing.
pub async fn advise(
    db: &dyn DatabaseService,
    llm: &dyn AdviceService,
    user_id: UserId,
    prompt: &dyn AdvicePrompt,
) -> Result<String, AdviceError> {
    let snapshot = FinancialSnapshot::load(db, user_id).await?;
    advise_on(&snapshot, llm, prompt).await
}

/// Same as `advise`, for callers that already hold the snapshot.
pub async fn advise_on(
    snapshot: &FinancialSnapshot,
    llm: &dyn AdviceService,
    prompt: &dyn AdvicePrompt,
) -> Result<String, AdviceError> {
    let messages = prompt.build_messages(snapshot);
    let reply = llm.complete(&messages).await?;
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(AdviceError::EmptyReply);
    }
    Ok(reply.to_string())
}

//=========================================================================================
// Insight
//=========================================================================================

/// One-shot review of the whole financial picture.
#[derive(Debug, Clone, Default)]
pub struct InsightPrompt;

impl AdvicePrompt for InsightPrompt {
    fn mode(&self) -> &'static str {
        "insight"
    }

    fn build_messages(&self, snapshot: &FinancialSnapshot) -> Vec<ChatMessage> {
        let prompt = format!(
            "{persona} Analyze the user's finances below and give personalized advice.\n\n\
             {summary}\n\
             ### Recommendations Needed\n\
             Provide exactly five numbered recommendations covering:\n\
             1. Budget Optimization: unnecessary expenses and better budgeting.\n\
             2. Investment Strategy: asset allocation for a {risk} risk tolerance.\n\
             3. Savings & Wealth Growth: ways to grow the monthly savings of {cur}{savings}.\n\
             4. Risk Management: financial risks and how to mitigate them.\n\
             5. Market Insights: specific Indian instruments (stocks, mutual funds, SIPs) that fit this profile.\n\n\
             Keep every recommendation actionable and tailored to the figures above.",
            persona = ADVISOR_PERSONA,
            summary = snapshot.compose(),
            risk = snapshot.profile.risk_tolerance,
            cur = CURRENCY,
            savings = snapshot.profile.monthly_savings,
        );
        vec![
            ChatMessage::system("You are a financial advisor."),
            ChatMessage::user(prompt),
        ]
    }
}

//=========================================================================================
// Chat
//=========================================================================================

/// Open-ended conversation anchored on the user's financial summary.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    message: String,
    history: Vec<ChatMessage>,
}

impl ChatPrompt {
    pub const MIN_MESSAGE_LEN: usize = 2;
    pub const MAX_MESSAGE_LEN: usize = 1000;

    /// Validates the new message and keeps only the most recent user/assistant turns.
    pub fn new(message: &str, history: Vec<ChatMessage>) -> Result<Self, FieldErrors> {
        let message = message.trim();
        let length = message.chars().count();
        if length == 0 {
            return Err(FieldErrors::single("message", "This field may not be blank."));
        }
        if length < Self::MIN_MESSAGE_LEN {
            return Err(FieldErrors::single(
                "message",
                "Ensure this field has at least 2 characters.",
            ));
        }
        if length > Self::MAX_MESSAGE_LEN {
            return Err(FieldErrors::single(
                "message",
                "Ensure this field has no more than 1000 characters.",
            ));
        }

        let mut history: Vec<ChatMessage> = history
            .into_iter()
            .filter(|turn| turn.role != ChatRole::System && !turn.content.trim().is_empty())
            .collect();
        if history.len() > MAX_HISTORY_TURNS {
            history.drain(..history.len() - MAX_HISTORY_TURNS);
        }

        Ok(Self { message: message.to_string(), history })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}

impl AdvicePrompt for ChatPrompt {
    fn mode(&self) -> &'static str {
        "chat"
    }

    fn build_messages(&self, snapshot: &FinancialSnapshot) -> Vec<ChatMessage> {
        let context = format!(
            "{} Answer the user's questions conversationally, using this financial profile \
             as context for every answer:\n\n{}",
            ADVISOR_PERSONA,
            snapshot.compose()
        );
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(context));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.message.clone()));
        messages
    }
}

//=========================================================================================
// Similar Investments
//=========================================================================================

/// Suggestions that match the risk profile of the current holdings.
#[derive(Debug, Clone, Default)]
pub struct SimilarInvestmentsPrompt;

impl SimilarInvestmentsPrompt {
    fn starter_portfolio(snapshot: &FinancialSnapshot) -> String {
        let p = &snapshot.profile;
        format!(
            "{persona} The user has no investments yet.\n\n\
             - Age: {age}\n\
             - Risk Tolerance: {risk}\n\
             - Monthly Salary: {cur}{salary}\n\
             - Monthly Savings available to invest: {cur}{savings}\n\n\
             Suggest a starter portfolio of five investments suited to a {risk} risk tolerance \
             that can be funded from {cur}{savings} a month. For each, give the instrument type, \
             a suggested monthly amount, the expected return range and why it fits.",
            persona = ADVISOR_PERSONA,
            age = p.age,
            risk = p.risk_tolerance,
            cur = CURRENCY,
            salary = p.monthly_salary,
            savings = p.monthly_savings,
        )
    }

    fn similar_holdings(snapshot: &FinancialSnapshot) -> String {
        let mut holdings = String::new();
        for inv in &snapshot.investments {
            let flag = if inv.investment_type == InvestmentType::Stocks {
                "[STOCK] "
            } else {
                ""
            };
            let _ = writeln!(holdings, "- {}{}", flag, describe_investment(inv));
        }

        let instruction = if snapshot.has_stock_holdings() {
            "For the holdings marked [STOCK], suggest five listed Indian companies with a similar \
             sector exposure and risk profile, giving the ticker, sector and one-line rationale. \
             Balance them against the non-stock holdings so overall risk stays within the user's tolerance."
        } else {
            "Suggest five investments (mutual funds, SIPs, deposits or gold instruments) with a risk \
             and return profile similar to the current holdings, giving the instrument type, \
             expected return range and one-line rationale for each."
        };

        format!(
            "{persona}\n\n\
             - Risk Tolerance: {risk}\n\
             - Monthly Savings: {cur}{savings}\n\n\
             ### Current Holdings\n{holdings}\n{instruction}",
            persona = ADVISOR_PERSONA,
            risk = snapshot.profile.risk_tolerance,
            cur = CURRENCY,
            savings = snapshot.profile.monthly_savings,
            holdings = holdings,
            instruction = instruction,
        )
    }
}

impl AdvicePrompt for SimilarInvestmentsPrompt {
    fn mode(&self) -> &'static str {
        "similar_investments"
    }

    fn build_messages(&self, snapshot: &FinancialSnapshot) -> Vec<ChatMessage> {
        let prompt = if snapshot.investments.is_empty() {
            Self::starter_portfolio(snapshot)
        } else {
            Self::similar_holdings(snapshot)
        };
        vec![
            ChatMessage::system("You are a financial advisor."),
            ChatMessage::user(prompt),
        ]
    }
}

//=========================================================================================
// Loan Affordability
//=========================================================================================

/// Standard amortizing-loan installment: P * r * (1 + r)^n / ((1 + r)^n - 1).
pub fn monthly_emi(principal: Decimal, annual_rate_percent: Decimal, tenure_years: i32) -> Decimal {
    let months = tenure_years.max(1) * 12;
    let p = principal.to_f64().unwrap_or(0.0);
    let r = annual_rate_percent.to_f64().unwrap_or(0.0) / 12.0 / 100.0;
    let emi = if r == 0.0 {
        p / f64::from(months)
    } else {
        let growth = (1.0 + r).powi(months);
        p * r * growth / (growth - 1.0)
    };
    to_cents(Decimal::from_f64(emi).unwrap_or(Decimal::ZERO))
}

fn to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

/// Affordability figures computed locally and quoted to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanFigures {
    pub emi: Decimal,
    pub total_emi: Decimal,
    /// Percent of monthly salary; `None` when no salary is recorded.
    pub dti_percent: Option<Decimal>,
    pub monthly_expenses: Decimal,
}

/// Affordability check of a prospective loan against the recorded finances.
#[derive(Debug, Clone)]
pub struct LoanPrompt {
    terms: LoanTerms,
}

impl LoanPrompt {
    /// Missing terms are a precondition failure; present-but-invalid ones a validation failure.
    pub fn from_record(record: &Record, today: NaiveDate) -> Result<Self, AdviceError> {
        let missing: Vec<&str> = LOAN_REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| is_absent(record, field))
            .collect();
        if !missing.is_empty() {
            return Err(AdviceError::MissingLoanTerms(missing.join(", ")));
        }
        let terms = LoanTerms::validate(record, today).map_err(AdviceError::InvalidLoanTerms)?;
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn figures(&self, snapshot: &FinancialSnapshot) -> LoanFigures {
        let emi = monthly_emi(
            self.terms.principal,
            self.terms.annual_rate,
            self.terms.tenure_years,
        );
        let total_emi = to_cents(emi + self.terms.existing_emi);
        let salary = Decimal::from(snapshot.profile.monthly_salary);
        let dti_percent = if salary > Decimal::ZERO {
            Some(to_cents(total_emi / salary * Decimal::ONE_HUNDRED))
        } else {
            None
        };
        LoanFigures {
            emi,
            total_emi,
            dti_percent,
            monthly_expenses: snapshot.total_expenses(),
        }
    }
}

impl AdvicePrompt for LoanPrompt {
    fn mode(&self) -> &'static str {
        "loan"
    }

    fn build_messages(&self, snapshot: &FinancialSnapshot) -> Vec<ChatMessage> {
        let terms = &self.terms;
        let figures = self.figures(snapshot);
        let dti = figures
            .dti_percent
            .map(|d| format!("{}%", d))
            .unwrap_or_else(|| "unknown (no monthly salary recorded)".to_string());

        let prompt = format!(
            "{persona} Assess whether the user can afford a new loan.\n\n\
             {summary}\n\
             ### Loan Request\n\
             - Loan Type: {loan_type}\n\
             - Principal: {cur}{principal}\n\
             - Annual Interest Rate: {rate}%\n\
             - Tenure: {tenure} year(s)\n\
             - Existing EMI obligations: {cur}{existing}\n\
             - Total recorded monthly expenses: {cur}{expenses}\n\n\
             ### Method\n\
             EMI = P x r x (1 + r)^n / ((1 + r)^n - 1), where P is the principal, r the monthly \
             rate (annual rate / 12 / 100) and n the number of monthly installments.\n\
             DTI = (existing EMI + new EMI) / monthly income x 100.\n\
             A DTI above {threshold}% means the loan is not affordable.\n\n\
             Pre-computed: new EMI {cur}{emi}, total EMI {cur}{total}, DTI {dti}.\n\n\
             Verify these figures, state clearly whether the loan is affordable under the \
             {threshold}% rule after accounting for monthly expenses, and counsel the user: \
             if affordable, how to manage repayment; if not, a smaller principal, longer tenure \
             or steps to reduce existing obligations.",
            persona = ADVISOR_PERSONA,
            summary = snapshot.compose(),
            loan_type = terms.loan_type.as_deref().unwrap_or("Unspecified"),
            cur = CURRENCY,
            principal = terms.principal,
            rate = terms.annual_rate,
            tenure = terms.tenure_years,
            existing = terms.existing_emi,
            expenses = figures.monthly_expenses,
            threshold = DTI_THRESHOLD_PERCENT,
            emi = figures.emi,
            total = figures.total_emi,
            dti = dti,
        );
        vec![
            ChatMessage::system("You are a financial advisor specializing in loan affordability."),
            ChatMessage::user(prompt),
        ]
    }
}
