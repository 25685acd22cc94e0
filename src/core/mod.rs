mod engine;
mod format;
mod snapshot;
mod tax;
mod types;

pub use engine::{
    OVERTIME_MULTIPLIER, compute_account_balances, compute_paycheck, recompute, sum_adjustments,
    summarize, summary_chips,
};
pub use format::format_money;
pub use snapshot::{AccountIdAllocator, BudgetBook, EditError, NewAccount, Snapshot};
pub use tax::{
    FEDERAL_BRACKETS, PAYROLL_TAX_RATE, STANDARD_DEDUCTION, STATE_BRACKETS, TaxBracket,
    Withholding, annual_multiplier, bracket_tax, withhold,
};
pub use types::{
    Account, AccountBalance, AccountId, AccountType, AdjustmentItem, AllocationTone,
    BudgetCategory, BudgetPlan, CategoryAssignment, CheckEntry, Derived, ItemKind, PayFrequency,
    PaycheckInput, PaycheckResult, PaycheckTotals, RawField, Summary, Tab, Theme, parse_amount,
};
