use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::engine::recompute;
use super::types::{
    Account, AccountId, AccountType, AdjustmentItem, BudgetPlan, CheckEntry, Derived, RawField,
    Tab, Theme,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("no paycheck at index {index} (have {len})")]
    CheckOutOfRange { index: usize, len: usize },
    #[error("no income/expense item at index {index} (have {len})")]
    ItemOutOfRange { index: usize, len: usize },
    #[error("unknown account `{0}`")]
    UnknownAccount(AccountId),
    #[error("at least one paycheck is required")]
    LastCheck,
}

// Largest sequence a browser-written snapshot can hold exactly; anything past
// it is treated as corrupt.
pub const MAX_ACCOUNT_SEQUENCE: u64 = 1 << 53;

/// Hands out `acc-N` ids. The counter only moves forward, so a deleted
/// account's id is never issued again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountIdAllocator {
    next: u64,
}

impl Default for AccountIdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl AccountIdAllocator {
    pub fn starting_at(next: u64) -> Self {
        if (1..=MAX_ACCOUNT_SEQUENCE).contains(&next) {
            Self { next }
        } else {
            Self::default()
        }
    }

    pub fn peek(&self) -> u64 {
        self.next
    }

    pub fn next_id(&mut self) -> AccountId {
        let id = AccountId::from_sequence(self.next);
        self.next = self.next.checked_add(1).unwrap_or(self.next);
        id
    }

    pub fn observe(&mut self, id: &AccountId) {
        if let Some(sequence) = id.sequence().filter(|seq| *seq < MAX_ACCOUNT_SEQUENCE) {
            self.next = self.next.max(sequence + 1);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub checks: Vec<CheckEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub accounts: Vec<Account>,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<AdjustmentItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub budget: BudgetPlan,
    #[serde(deserialize_with = "null_as_default")]
    pub active_tab: Tab,
    #[serde(deserialize_with = "null_as_default")]
    pub theme: Theme,
    #[serde(deserialize_with = "lenient_counter")]
    pub account_id_counter: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            checks: Vec::new(),
            accounts: Vec::new(),
            items: Vec::new(),
            budget: BudgetPlan::default(),
            active_tab: Tab::Checks,
            theme: Theme::Dark,
            account_id_counter: 1,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_f64()
        .filter(|counter| (1.0..=MAX_ACCOUNT_SEQUENCE as f64).contains(counter))
        .map(|counter| counter as u64)
        .unwrap_or(1))
}

fn default_accounts(ids: &mut AccountIdAllocator) -> Vec<Account> {
    [
        AccountType::Checking,
        AccountType::Spending,
        AccountType::HighYieldSavings,
    ]
    .into_iter()
    .map(|account_type| Account {
        id: ids.next_id(),
        account_type,
        custom_name: String::new(),
        amount: RawField::default(),
    })
    .collect()
}

impl Snapshot {
    pub fn bootstrap() -> Self {
        Self::default().normalized()
    }

    /// Restores the invariants a loaded snapshot may be missing: every account
    /// has an id below the counter, no list is empty, and budget categories
    /// only point at accounts that exist.
    pub fn normalized(mut self) -> Self {
        let mut ids = AccountIdAllocator::starting_at(self.account_id_counter);
        for account in &self.accounts {
            ids.observe(&account.id);
        }
        let mut renamed = Vec::new();
        for account in &mut self.accounts {
            let corrupt = account
                .id
                .sequence()
                .is_some_and(|seq| seq >= MAX_ACCOUNT_SEQUENCE);
            if account.id.is_blank() || corrupt {
                let fresh = ids.next_id();
                if corrupt {
                    renamed.push((std::mem::replace(&mut account.id, fresh.clone()), fresh));
                } else {
                    account.id = fresh;
                }
            }
        }
        for assignment in self.budget.assignments_mut() {
            if let Some((_, fresh)) = renamed
                .iter()
                .find(|(old, _)| assignment.account.as_ref() == Some(old))
            {
                assignment.account = Some(fresh.clone());
            }
        }

        if self.checks.is_empty() {
            self.checks.push(CheckEntry::default());
        }
        if self.accounts.is_empty() {
            self.accounts = default_accounts(&mut ids);
        }
        if self.items.is_empty() {
            self.items.push(AdjustmentItem::default());
        }

        let accounts = &self.accounts;
        for assignment in self.budget.assignments_mut() {
            let known = assignment
                .account
                .as_ref()
                .is_some_and(|id| accounts.iter().any(|account| &account.id == id));
            if !known {
                assignment.account = None;
            }
        }

        self.account_id_counter = ids.peek();
        self
    }
}

#[derive(Debug, Clone)]
pub struct BudgetBook {
    snapshot: Snapshot,
    ids: AccountIdAllocator,
}

impl Default for BudgetBook {
    fn default() -> Self {
        Self::from_snapshot(Snapshot::bootstrap())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub custom_name: String,
    pub amount: RawField,
}

impl BudgetBook {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let snapshot = snapshot.normalized();
        let ids = AccountIdAllocator::starting_at(snapshot.account_id_counter);
        Self { snapshot, ids }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn derived(&self) -> Derived {
        recompute(&self.snapshot)
    }

    fn allocate_account_id(&mut self) -> AccountId {
        let id = self.ids.next_id();
        self.snapshot.account_id_counter = self.ids.peek();
        id
    }

    fn check_index(&self, index: usize) -> Result<usize, EditError> {
        let len = self.snapshot.checks.len();
        if index < len {
            Ok(index)
        } else {
            Err(EditError::CheckOutOfRange { index, len })
        }
    }

    fn item_index(&self, index: usize) -> Result<usize, EditError> {
        let len = self.snapshot.items.len();
        if index < len {
            Ok(index)
        } else {
            Err(EditError::ItemOutOfRange { index, len })
        }
    }

    fn account_index(&self, id: &AccountId) -> Result<usize, EditError> {
        self.snapshot
            .accounts
            .iter()
            .position(|account| &account.id == id)
            .ok_or_else(|| EditError::UnknownAccount(id.clone()))
    }

    pub fn add_check(&mut self, entry: CheckEntry) -> usize {
        self.snapshot.checks.push(entry);
        self.snapshot.checks.len() - 1
    }

    pub fn duplicate_check(&mut self, index: usize) -> Result<usize, EditError> {
        let index = self.check_index(index)?;
        let copy = self.snapshot.checks[index].clone();
        Ok(self.add_check(copy))
    }

    pub fn check_mut(&mut self, index: usize) -> Result<&mut CheckEntry, EditError> {
        let index = self.check_index(index)?;
        Ok(&mut self.snapshot.checks[index])
    }

    pub fn remove_check(&mut self, index: usize) -> Result<CheckEntry, EditError> {
        let index = self.check_index(index)?;
        if self.snapshot.checks.len() <= 1 {
            return Err(EditError::LastCheck);
        }
        Ok(self.snapshot.checks.remove(index))
    }

    pub fn add_account(&mut self, new_account: NewAccount) -> AccountId {
        let id = self.allocate_account_id();
        let mut account = Account {
            id: id.clone(),
            account_type: AccountType::Checking,
            custom_name: new_account.custom_name,
            amount: new_account.amount,
        };
        account.set_type(new_account.account_type);
        self.snapshot.accounts.push(account);
        id
    }

    pub fn account_mut(&mut self, id: &AccountId) -> Result<&mut Account, EditError> {
        let index = self.account_index(id)?;
        Ok(&mut self.snapshot.accounts[index])
    }

    pub fn remove_account(&mut self, id: &AccountId) -> Result<Account, EditError> {
        let index = self.account_index(id)?;
        let removed = self.snapshot.accounts.remove(index);
        for assignment in self.snapshot.budget.assignments_mut() {
            if assignment.account.as_ref() == Some(&removed.id) {
                assignment.account = None;
            }
        }
        Ok(removed)
    }

    pub fn add_item(&mut self, item: AdjustmentItem) -> usize {
        self.snapshot.items.push(item);
        self.snapshot.items.len() - 1
    }

    pub fn item_mut(&mut self, index: usize) -> Result<&mut AdjustmentItem, EditError> {
        let index = self.item_index(index)?;
        Ok(&mut self.snapshot.items[index])
    }

    pub fn remove_item(&mut self, index: usize) -> Result<AdjustmentItem, EditError> {
        let index = self.item_index(index)?;
        Ok(self.snapshot.items.remove(index))
    }

    pub fn set_budget(&mut self, budget: BudgetPlan) -> Result<(), EditError> {
        for (_, assignment) in budget.entries() {
            if let Some(id) = &assignment.account {
                self.account_index(id)?;
            }
        }
        self.snapshot.budget = budget;
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.snapshot.theme = theme;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.snapshot.theme = self.snapshot.theme.toggled();
        self.snapshot.theme
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.snapshot.active_tab = tab;
    }

    /// Without confirmation nothing changes. The theme survives a reset.
    pub fn reset(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }
        let theme = self.snapshot.theme;
        *self = Self::default();
        self.snapshot.theme = theme;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BudgetCategory, CategoryAssignment, ItemKind, PayFrequency};
    use proptest::prelude::{prop_assert_eq, proptest};

    fn ids(book: &BudgetBook) -> Vec<&str> {
        book.snapshot()
            .accounts
            .iter()
            .map(|account| account.id.as_str())
            .collect()
    }

    #[test]
    fn bootstrap_seeds_starter_records() {
        let snapshot = Snapshot::bootstrap();
        assert_eq!(snapshot.checks, vec![CheckEntry::default()]);
        assert_eq!(snapshot.checks[0].frequency, PayFrequency::Weekly);
        let names = snapshot
            .accounts
            .iter()
            .map(Account::display_name)
            .collect::<Vec<_>>();
        assert_eq!(names, ["Checking", "Spending", "High-Yield Savings"]);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].kind, ItemKind::Expense);
        assert_eq!(snapshot.account_id_counter, 4);
        assert_eq!(snapshot.theme, Theme::Dark);
        assert_eq!(snapshot.active_tab, Tab::Checks);
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut book = BudgetBook::default();
        let added = book.add_account(NewAccount::default());
        assert_eq!(added.as_str(), "acc-4");

        book.remove_account(&added).expect("account exists");
        let next = book.add_account(NewAccount::default());
        assert_eq!(next.as_str(), "acc-5");
        assert_eq!(book.snapshot().account_id_counter, 6);
    }

    #[test]
    fn normalized_moves_counter_past_restored_ids() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
              "checks": [{"hourlyPay": "20"}],
              "accounts": [{"id": "acc-9", "type": "Savings"}, {"type": "Spending"}],
              "items": [{"type": "income", "amount": "10"}],
              "accountIdCounter": 2
            }"#,
        )
        .expect("valid json");
        let snapshot = snapshot.normalized();

        assert_eq!(snapshot.accounts[0].id.as_str(), "acc-9");
        assert_eq!(snapshot.accounts[1].id.as_str(), "acc-10");
        assert_eq!(snapshot.account_id_counter, 11);
        for account in &snapshot.accounts {
            assert!(account.id.sequence().unwrap() < snapshot.account_id_counter);
        }
    }

    #[test]
    fn normalized_drops_dangling_budget_accounts() {
        let mut snapshot = Snapshot::bootstrap();
        snapshot.budget.debt = CategoryAssignment {
            amount: RawField::from("75"),
            account: Some(AccountId::from("acc-77")),
        };
        let snapshot = snapshot.normalized();
        assert_eq!(snapshot.budget.debt.account, None);
        assert_eq!(snapshot.budget.debt.amount.as_str(), "75");
    }

    #[test]
    fn lenient_counter_falls_back_to_one() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"accountIdCounter": "seven"}"#).expect("valid json");
        assert_eq!(snapshot.account_id_counter, 1);
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"accountIdCounter": null}"#).expect("valid json");
        assert_eq!(snapshot.account_id_counter, 1);
    }

    #[test]
    fn oversized_counter_and_ids_are_treated_as_corrupt() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"accountIdCounter": 1e300}"#).expect("valid json");
        assert_eq!(snapshot.account_id_counter, 1);
        let mut book = BudgetBook::from_snapshot(snapshot);
        assert_eq!(ids(&book), ["acc-1", "acc-2", "acc-3"]);
        assert_eq!(book.add_account(NewAccount::default()).as_str(), "acc-4");

        let snapshot: Snapshot = serde_json::from_str(
            r#"{
              "accounts": [{"id": "acc-18446744073709551615"}, {"id": "acc-2"}],
              "budget": {"bills": {"amount": "40", "account": "acc-18446744073709551615"}},
              "accountIdCounter": 18446744073709551615
            }"#,
        )
        .expect("valid json");
        let mut book = BudgetBook::from_snapshot(snapshot);
        assert_eq!(ids(&book), ["acc-3", "acc-2"]);
        assert_eq!(
            book.snapshot().budget.bills.account,
            Some(AccountId::from("acc-3"))
        );
        assert_eq!(book.add_account(NewAccount::default()).as_str(), "acc-4");
        assert_eq!(book.snapshot().account_id_counter, 5);
    }

    #[test]
    fn allocator_ignores_out_of_range_start() {
        let mut ids = AccountIdAllocator::starting_at(u64::MAX);
        assert_eq!(ids.next_id().as_str(), "acc-1");
        ids.observe(&AccountId::from("acc-9007199254740992"));
        assert_eq!(ids.peek(), 2);
    }

    #[test]
    fn null_fields_fall_back_without_losing_records() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
              "checks": null,
              "accounts": [{"id": "acc-5", "type": "Savings", "amount": "300"}],
              "items": null,
              "budget": null,
              "activeTab": null,
              "theme": null,
              "accountIdCounter": 6
            }"#,
        )
        .expect("nulls are accepted");
        assert_eq!(snapshot.theme, Theme::Dark);
        assert_eq!(snapshot.active_tab, Tab::Checks);

        let snapshot = snapshot.normalized();
        assert_eq!(snapshot.checks.len(), 1);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.accounts.len(), 1);
        assert_eq!(snapshot.accounts[0].amount.as_str(), "300");
        assert_eq!(snapshot.account_id_counter, 6);
    }

    #[test]
    fn last_check_cannot_be_removed() {
        let mut book = BudgetBook::default();
        assert_eq!(book.remove_check(0), Err(EditError::LastCheck));

        let copy = book.duplicate_check(0).expect("check exists");
        assert_eq!(copy, 1);
        book.remove_check(0).expect("two checks present");
        assert_eq!(book.snapshot().checks.len(), 1);
        assert_eq!(
            book.remove_check(3),
            Err(EditError::CheckOutOfRange { index: 3, len: 1 })
        );
    }

    #[test]
    fn duplicate_copies_every_field() {
        let mut book = BudgetBook::default();
        {
            let check = book.check_mut(0).expect("check exists");
            check.frequency = PayFrequency::Biweekly;
            check.hourly_pay = RawField::from("31.5");
            check.known_net = RawField::from("900");
        }
        let index = book.duplicate_check(0).expect("check exists");
        assert_eq!(book.snapshot().checks[index], book.snapshot().checks[0]);
    }

    #[test]
    fn accounts_and_items_can_be_emptied() {
        let mut book = BudgetBook::default();
        for id in ["acc-1", "acc-2", "acc-3"] {
            book.remove_account(&AccountId::from(id)).expect("account exists");
        }
        book.remove_item(0).expect("item exists");
        assert!(book.snapshot().accounts.is_empty());
        assert!(book.snapshot().items.is_empty());
        assert_eq!(book.derived().summary.planned, 0.0);
    }

    #[test]
    fn removing_account_unassigns_budget_categories() {
        let mut book = BudgetBook::default();
        let mut plan = BudgetPlan::default();
        *plan.get_mut(BudgetCategory::Bills) = CategoryAssignment {
            amount: RawField::from("100"),
            account: Some(AccountId::from("acc-2")),
        };
        plan.savings.account = Some(AccountId::from("acc-3"));
        book.set_budget(plan).expect("accounts exist");

        book.remove_account(&AccountId::from("acc-2")).expect("account exists");
        assert_eq!(book.snapshot().budget.bills.account, None);
        assert_eq!(
            book.snapshot().budget.savings.account,
            Some(AccountId::from("acc-3"))
        );
        assert_eq!(ids(&book), ["acc-1", "acc-3"]);
    }

    #[test]
    fn set_budget_rejects_unknown_accounts() {
        let mut book = BudgetBook::default();
        let mut plan = BudgetPlan::default();
        plan.debt.account = Some(AccountId::from("acc-42"));
        assert_eq!(
            book.set_budget(plan),
            Err(EditError::UnknownAccount(AccountId::from("acc-42")))
        );
    }

    #[test]
    fn add_account_applies_custom_name_only_for_custom_type() {
        let mut book = BudgetBook::default();
        let custom = book.add_account(NewAccount {
            account_type: AccountType::Custom,
            custom_name: "Travel".to_string(),
            amount: RawField::from("250"),
        });
        let plain = book.add_account(NewAccount {
            account_type: AccountType::Investment,
            custom_name: "ignored".to_string(),
            amount: RawField::default(),
        });
        assert_eq!(book.account_mut(&custom).unwrap().display_name(), "Travel");
        let plain = book.account_mut(&plain).unwrap();
        assert_eq!(plain.display_name(), "Investment");
        assert!(plain.custom_name.is_empty());
    }

    #[test]
    fn declined_reset_changes_nothing() {
        let mut book = BudgetBook::default();
        book.add_item(AdjustmentItem::default());
        book.set_theme(Theme::Light);
        let before = book.snapshot().clone();

        assert!(!book.reset(false));
        assert_eq!(book.snapshot(), &before);
    }

    #[test]
    fn confirmed_reset_restores_defaults_but_keeps_theme() {
        let mut book = BudgetBook::default();
        book.add_account(NewAccount::default());
        book.add_check(CheckEntry::default());
        book.set_theme(Theme::Light);
        book.set_active_tab(Tab::Summary);

        assert!(book.reset(true));
        let mut expected = Snapshot::bootstrap();
        expected.theme = Theme::Light;
        assert_eq!(book.snapshot(), &expected);
        assert_eq!(book.add_account(NewAccount::default()).as_str(), "acc-4");
    }

    #[test]
    fn toggle_theme_flips_between_modes() {
        let mut book = BudgetBook::default();
        assert_eq!(book.toggle_theme(), Theme::Light);
        assert_eq!(book.toggle_theme(), Theme::Dark);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_snapshot_json_round_trips(
            check_count in 1usize..4,
            hourly in 0u32..10_000,
            extra_accounts in 0usize..4,
            removed in 0usize..3,
            income in proptest::bool::ANY,
            light in proptest::bool::ANY
        ) {
            let mut book = BudgetBook::default();
            for idx in 1..check_count {
                let index = book.add_check(CheckEntry::default());
                book.check_mut(index).unwrap().hourly_pay = RawField::from((hourly + idx as u32).to_string().as_str());
            }
            for _ in 0..extra_accounts {
                book.add_account(NewAccount { amount: RawField::from(hourly as f64), ..NewAccount::default() });
            }
            let victim = book.snapshot().accounts[removed].id.clone();
            book.remove_account(&victim).unwrap();
            book.item_mut(0).unwrap().kind = if income { ItemKind::Income } else { ItemKind::Expense };
            book.set_theme(if light { Theme::Light } else { Theme::Dark });

            let json = serde_json::to_string(book.snapshot()).unwrap();
            let restored: Snapshot = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(&restored, book.snapshot());
            prop_assert_eq!(&restored.clone().normalized(), book.snapshot());
            prop_assert_eq!(BudgetBook::from_snapshot(restored).derived(), book.derived());
        }
    }
}
