use std::collections::HashMap;

use super::format::format_money;
use super::snapshot::Snapshot;
use super::tax::withhold;
use super::types::{
    Account, AccountBalance, AccountId, AdjustmentItem, AllocationTone, BudgetPlan, Derived,
    PaycheckInput, PaycheckResult, PaycheckTotals, Summary,
};

pub const OVERTIME_MULTIPLIER: f64 = 1.5;

/// Gross-to-net for a single paycheck.
///
/// A known net short-circuits the estimate entirely. Otherwise net is not
/// floored: deductions larger than gross surface as a negative paycheck.
pub fn compute_paycheck(input: &PaycheckInput) -> PaycheckResult {
    if let Some(known_net) = input.known_net_override {
        return PaycheckResult {
            net: known_net.max(0.0),
            used_known_net: true,
            ..PaycheckResult::default()
        };
    }

    let gross = (input.hourly_pay * input.regular_hours
        + input.hourly_pay * OVERTIME_MULTIPLIER * input.overtime_hours
        + input.bonus)
        .max(0.0);
    let k401 = (gross * input.k401_percent / 100.0).max(0.0);
    let benefits = input.benefits.max(0.0);
    let taxes = withhold(gross, k401, input.frequency).total();

    PaycheckResult {
        gross,
        taxes,
        k401,
        benefits,
        net: gross - taxes - k401 - benefits,
        used_known_net: false,
    }
}

pub fn sum_adjustments(items: &[AdjustmentItem]) -> f64 {
    items.iter().map(AdjustmentItem::signed_amount).sum()
}

fn usage_by_account(plan: &BudgetPlan) -> HashMap<&AccountId, f64> {
    let mut usage = HashMap::new();
    for (_, assignment) in plan.entries() {
        let amount = assignment.amount.amount();
        let Some(account) = assignment.account.as_ref() else {
            continue;
        };
        if amount <= 0.0 {
            continue;
        }
        *usage.entry(account).or_insert(0.0) += amount;
    }
    usage
}

pub fn compute_account_balances(accounts: &[Account], plan: &BudgetPlan) -> Vec<AccountBalance> {
    let usage = usage_by_account(plan);
    accounts
        .iter()
        .map(|account| {
            let allocated = account.allocated();
            let used = usage.get(&account.id).copied().unwrap_or(0.0);
            AccountBalance {
                id: account.id.clone(),
                name: account.display_name(),
                allocated,
                used,
                remaining: allocated - used,
            }
        })
        .collect()
}

pub fn summary_chips(balances: &[AccountBalance]) -> Vec<AccountBalance> {
    balances
        .iter()
        .filter(|balance| balance.is_notable())
        .cloned()
        .collect()
}

pub fn summarize(
    checks: &[PaycheckResult],
    adjustment_delta: f64,
    balances: &[AccountBalance],
) -> Summary {
    let mut totals = PaycheckTotals::default();
    for check in checks {
        totals.add(check);
    }

    let final_net = totals.net + adjustment_delta;
    let planned: f64 = balances.iter().map(|balance| balance.allocated).sum();
    let remainder = final_net - planned;

    let safe_net = final_net.max(0.0);
    let allocation_ratio = if safe_net > 0.0 {
        planned / safe_net
    } else {
        0.0
    };
    let allocation_percent = (allocation_ratio * 100.0).clamp(0.0, 100.0);
    let over_by = planned - safe_net;
    let over_budget = over_by > 0.0;

    // The label keeps the unclamped ratio, so it can read above 100%.
    let allocated_text = if safe_net > 0.0 {
        format!("{}% allocated", (allocation_ratio * 100.0).round())
    } else {
        "0% allocated".to_string()
    };
    let (tone, allocation_label, over_by, available) = if over_budget {
        (
            AllocationTone::OverBudget,
            format!("{allocated_text} • Over by {}", format_money(over_by)),
            over_by,
            0.0,
        )
    } else {
        let available = remainder.max(0.0);
        (
            AllocationTone::Normal,
            format!("{allocated_text} • {} available", format_money(available)),
            0.0,
            available,
        )
    };

    Summary {
        totals,
        adjustment_delta,
        final_net,
        planned,
        remainder,
        safe_net,
        allocation_ratio,
        allocation_percent,
        over_budget,
        over_by,
        available,
        allocation_label,
        tone,
        fill_gradient: tone.gradient(),
    }
}

pub fn recompute(snapshot: &Snapshot) -> Derived {
    let checks = snapshot
        .checks
        .iter()
        .map(|entry| compute_paycheck(&entry.to_input()))
        .collect::<Vec<_>>();
    let adjustment_delta = sum_adjustments(&snapshot.items);
    let account_balances = compute_account_balances(&snapshot.accounts, &snapshot.budget);
    let summary = summarize(&checks, adjustment_delta, &account_balances);

    Derived {
        summary_chips: summary_chips(&account_balances),
        checks,
        account_balances,
        summary,
    }
}
