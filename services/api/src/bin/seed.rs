//! services/api/src/bin/seed.rs
//!
//! Populates the database with three demo users, each with a profile and a few
//! incomes, expenses and investments, plus one staff account for the user
//! directory. Users that already exist are left alone, so running it twice is
//! harmless.

use api_lib::{adapters::DbAdapter, config::Config, error::ApiError, web::auth::hash_password};
use chrono::Utc;
use finance_core::domain::{
    InvestmentType, NewExpense, NewFinancialProfile, NewIncome, NewInvestment, NewUser,
    RiskTolerance,
};
use finance_core::ports::DatabaseService;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

const DEMO_PASSWORD: &str = "DemoPass123";
const STAFF_USERNAME: &str = "finance_admin";

struct DemoUser {
    username: &'static str,
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    age: i32,
    monthly_salary: i64,
    risk_tolerance: RiskTolerance,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        username: "young_investor",
        email: "young@example.com",
        first_name: "Young",
        last_name: "Investor",
        age: 25,
        monthly_salary: 60000,
        risk_tolerance: RiskTolerance::High,
    },
    DemoUser {
        username: "mid_career",
        email: "midcareer@example.com",
        first_name: "Mid",
        last_name: "Career",
        age: 40,
        monthly_salary: 120000,
        risk_tolerance: RiskTolerance::Medium,
    },
    DemoUser {
        username: "retired_saver",
        email: "retired@example.com",
        first_name: "Retired",
        last_name: "Saver",
        age: 60,
        monthly_salary: 45000,
        risk_tolerance: RiskTolerance::Low,
    },
];

const EXPENSE_CATEGORIES: [(&str, i64); 5] = [
    ("Rent", 18000),
    ("Groceries", 8000),
    ("Transport", 5000),
    ("Entertainment", 6000),
    ("Healthcare", 7000),
];

fn demo_investments(today: chrono::NaiveDate) -> Vec<NewInvestment> {
    let holding = |name: &str, investment_type: InvestmentType, invested: i64, current: i64| {
        NewInvestment {
            name: name.to_string(),
            investment_type,
            amount_invested: Decimal::new(invested * 100, 2),
            current_value: Decimal::new(current * 100, 2),
            date_invested: today,
            interest_rate: None,
            years: None,
        }
    };
    vec![
        holding("Reliance Industries", InvestmentType::Stocks, 75000, 80000),
        holding("SBI Bluechip Fund", InvestmentType::MutualFunds, 50000, 52000),
        holding("Gold ETF", InvestmentType::Gold, 40000, 45000),
        NewInvestment {
            interest_rate: Some(Decimal::new(710, 2)),
            years: Some(3),
            ..holding("SBI Fixed Deposit", InvestmentType::Fd, 100000, 100000)
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    let db = DbAdapter::new(pool);
    db.run_migrations().await?;

    let today = Utc::now().date_naive();
    let password_hash = hash_password(DEMO_PASSWORD)?;

    for demo in &DEMO_USERS {
        if db.username_taken(demo.username).await? {
            info!("Skipping {}: already present", demo.username);
            continue;
        }

        let user = db
            .create_user(
                &NewUser {
                    username: demo.username.to_string(),
                    email: demo.email.to_string(),
                    first_name: demo.first_name.to_string(),
                    last_name: demo.last_name.to_string(),
                },
                &password_hash,
            )
            .await?;

        db.create_profile(
            user.id,
            &NewFinancialProfile {
                age: demo.age,
                monthly_salary: demo.monthly_salary,
                monthly_savings: demo.monthly_salary / 5,
                risk_tolerance: demo.risk_tolerance,
            },
        )
        .await?;

        db.create_incomes(
            user.id,
            &[NewIncome {
                source: "Salary".to_string(),
                amount: Decimal::new(demo.monthly_salary * 100, 2),
                date_received: today,
            }],
        )
        .await?;

        let expenses: Vec<NewExpense> = EXPENSE_CATEGORIES
            .iter()
            .map(|(category, amount)| NewExpense {
                category: category.to_string(),
                amount: Decimal::new(amount * 100, 2),
                date_spent: today,
            })
            .collect();
        db.create_expenses(user.id, &expenses).await?;

        db.create_investments(user.id, &demo_investments(today)).await?;

        info!(user_id = user.id, "Seeded {}", demo.username);
    }

    if !db.username_taken(STAFF_USERNAME).await? {
        let staff = db
            .create_user(
                &NewUser {
                    username: STAFF_USERNAME.to_string(),
                    email: "admin@example.com".to_string(),
                    first_name: "Finance".to_string(),
                    last_name: "Admin".to_string(),
                },
                &password_hash,
            )
            .await?;
        db.set_staff(staff.id, true).await?;
        info!(user_id = staff.id, "Seeded staff account {}", STAFF_USERNAME);
    }

    info!(
        "Database seeded. Demo users sign in with the password '{}'.",
        DEMO_PASSWORD
    );
    Ok(())
}
