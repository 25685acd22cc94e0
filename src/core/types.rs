use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawField(String);

impl RawField {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn value(&self) -> f64 {
        parse_amount(&self.0)
    }

    pub fn amount(&self) -> f64 {
        self.value().max(0.0)
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<f64> for RawField {
    fn from(value: f64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RawField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(f64),
            Missing(()),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => RawField(text),
            Repr::Number(value) => RawField::from(value),
            Repr::Missing(()) => RawField::default(),
        })
    }
}

/// Lenient float parse: longest numeric prefix after leading whitespace, 0 when
/// nothing parses or the result is not finite.
pub fn parse_amount(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let digits_from = |mut at: usize| {
        while at < bytes.len() && bytes[at].is_ascii_digit() {
            at += 1;
        }
        at
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut digit_count = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        digit_count += frac_end - (end + 1);
        end = frac_end;
    }
    if digit_count == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_start = end + 1;
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    trimmed[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PayFrequency {
    #[default]
    Weekly,
    Biweekly,
}

impl From<String> for PayFrequency {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "weekly" => PayFrequency::Weekly,
            _ => PayFrequency::Biweekly,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckEntry {
    pub frequency: PayFrequency,
    pub hourly_pay: RawField,
    pub regular_hours: RawField,
    pub overtime_hours: RawField,
    pub bonus: RawField,
    pub k401_percent: RawField,
    pub benefits: RawField,
    pub known_net: RawField,
}

impl CheckEntry {
    pub fn to_input(&self) -> PaycheckInput {
        PaycheckInput {
            frequency: self.frequency,
            hourly_pay: self.hourly_pay.value(),
            regular_hours: self.regular_hours.value(),
            overtime_hours: self.overtime_hours.value(),
            bonus: self.bonus.value(),
            k401_percent: self.k401_percent.value(),
            benefits: self.benefits.value(),
            known_net_override: (!self.known_net.is_blank()).then(|| self.known_net.value()),
        }
    }
}

/// Parsed paycheck inputs. `known_net_override` is `Some` whenever the known-net
/// field held any text, including "0".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaycheckInput {
    pub frequency: PayFrequency,
    pub hourly_pay: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub bonus: f64,
    pub k401_percent: f64,
    pub benefits: f64,
    pub known_net_override: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    const PREFIX: &'static str = "acc-";

    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("{}{sequence}", Self::PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.0
            .strip_prefix(Self::PREFIX)
            .unwrap_or(&self.0)
            .parse()
            .ok()
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    #[default]
    Checking,
    Spending,
    Savings,
    HighYieldSavings,
    Investment,
    EmergencyFund,
    Custom,
    Other(String),
}

impl AccountType {
    pub fn label(&self) -> &str {
        match self {
            AccountType::Checking => "Checking",
            AccountType::Spending => "Spending",
            AccountType::Savings => "Savings",
            AccountType::HighYieldSavings => "High-Yield Savings",
            AccountType::Investment => "Investment",
            AccountType::EmergencyFund => "Emergency Fund",
            AccountType::Custom => "Custom",
            AccountType::Other(label) => label,
        }
    }
}

impl From<String> for AccountType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "Checking" => AccountType::Checking,
            "Spending" => AccountType::Spending,
            "Savings" => AccountType::Savings,
            "High-Yield Savings" => AccountType::HighYieldSavings,
            "Investment" => AccountType::Investment,
            "Emergency Fund" => AccountType::EmergencyFund,
            "Custom" => AccountType::Custom,
            _ => AccountType::Other(value),
        }
    }
}

impl From<AccountType> for String {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default = "blank_account_id")]
    pub id: AccountId,
    #[serde(rename = "type", default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub amount: RawField,
}

fn blank_account_id() -> AccountId {
    AccountId(String::new())
}

impl Account {
    pub fn display_name(&self) -> String {
        match self.account_type {
            AccountType::Custom => {
                let custom = self.custom_name.trim();
                if custom.is_empty() {
                    "Custom Account".to_string()
                } else {
                    custom.to_string()
                }
            }
            ref other => other.label().to_string(),
        }
    }

    pub fn set_type(&mut self, account_type: AccountType) {
        if account_type != AccountType::Custom {
            self.custom_name.clear();
        }
        self.account_type = account_type;
    }

    pub fn allocated(&self) -> f64 {
        self.amount.amount()
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ItemKind {
    Income,
    #[default]
    Expense,
}

impl From<String> for ItemKind {
    fn from(value: String) -> Self {
        if value == "income" {
            ItemKind::Income
        } else {
            ItemKind::Expense
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub name: String,
    pub amount: RawField,
}

impl AdjustmentItem {
    pub fn signed_amount(&self) -> f64 {
        let amount = self.amount.amount();
        match self.kind {
            ItemKind::Income => amount,
            ItemKind::Expense => -amount,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCategory {
    Bills,
    Spending,
    Debt,
    Savings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryAssignment {
    pub amount: RawField,
    #[serde(deserialize_with = "non_blank_account")]
    pub account: Option<AccountId>,
}

fn non_blank_account<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<AccountId>, D::Error> {
    let id = Option::<AccountId>::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.is_blank()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetPlan {
    pub bills: CategoryAssignment,
    pub spending: CategoryAssignment,
    pub debt: CategoryAssignment,
    pub savings: CategoryAssignment,
}

impl BudgetPlan {
    pub fn entries(&self) -> [(BudgetCategory, &CategoryAssignment); 4] {
        [
            (BudgetCategory::Bills, &self.bills),
            (BudgetCategory::Spending, &self.spending),
            (BudgetCategory::Debt, &self.debt),
            (BudgetCategory::Savings, &self.savings),
        ]
    }

    pub fn get_mut(&mut self, category: BudgetCategory) -> &mut CategoryAssignment {
        match category {
            BudgetCategory::Bills => &mut self.bills,
            BudgetCategory::Spending => &mut self.spending,
            BudgetCategory::Debt => &mut self.debt,
            BudgetCategory::Savings => &mut self.savings,
        }
    }

    pub fn assignments_mut(&mut self) -> [&mut CategoryAssignment; 4] {
        [
            &mut self.bills,
            &mut self.spending,
            &mut self.debt,
            &mut self.savings,
        ]
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl From<String> for Theme {
    fn from(value: String) -> Self {
        if value == "light" {
            Theme::Light
        } else {
            Theme::Dark
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Tab {
    #[default]
    Checks,
    Accounts,
    Budget,
    Items,
    Summary,
}

impl From<String> for Tab {
    fn from(value: String) -> Self {
        match value.as_str() {
            "accounts" => Tab::Accounts,
            "budget" => Tab::Budget,
            "items" => Tab::Items,
            "summary" => Tab::Summary,
            _ => Tab::Checks,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaycheckResult {
    pub gross: f64,
    pub taxes: f64,
    pub k401: f64,
    pub benefits: f64,
    pub net: f64,
    pub used_known_net: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PaycheckTotals {
    pub gross: f64,
    pub taxes: f64,
    pub k401: f64,
    pub benefits: f64,
    pub net: f64,
}

impl PaycheckTotals {
    pub fn add(&mut self, check: &PaycheckResult) {
        self.gross += check.gross;
        self.taxes += check.taxes;
        self.k401 += check.k401;
        self.benefits += check.benefits;
        self.net += check.net;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub id: AccountId,
    pub name: String,
    pub allocated: f64,
    pub used: f64,
    pub remaining: f64,
}

impl AccountBalance {
    pub fn is_overdrawn(&self) -> bool {
        self.remaining < 0.0
    }

    pub fn is_notable(&self) -> bool {
        self.allocated > 0.0 || self.is_overdrawn()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationTone {
    Normal,
    OverBudget,
}

impl AllocationTone {
    pub fn gradient(self) -> &'static str {
        match self {
            AllocationTone::Normal => "linear-gradient(90deg, #1bc6cf 0%, #9b7bff 100%)",
            AllocationTone::OverBudget => "linear-gradient(90deg, #b93a3a 0%, #ef6f6f 100%)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub totals: PaycheckTotals,
    pub adjustment_delta: f64,
    pub final_net: f64,
    pub planned: f64,
    pub remainder: f64,
    pub safe_net: f64,
    pub allocation_ratio: f64,
    pub allocation_percent: f64,
    pub over_budget: bool,
    pub over_by: f64,
    pub available: f64,
    pub allocation_label: String,
    pub tone: AllocationTone,
    pub fill_gradient: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Derived {
    pub checks: Vec<PaycheckResult>,
    pub account_balances: Vec<AccountBalance>,
    pub summary_chips: Vec<AccountBalance>,
    pub summary: Summary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_reads_numeric_prefix() {
        assert_eq!(parse_amount("12abc"), 12.0);
        assert_eq!(parse_amount("  -3.25 "), -3.25);
        assert_eq!(parse_amount(".5"), 0.5);
        assert_eq!(parse_amount("1e3"), 1000.0);
        assert_eq!(parse_amount("2e"), 2.0);
        assert_eq!(parse_amount("7."), 7.0);
    }

    #[test]
    fn parse_amount_falls_back_to_zero() {
        for text in ["", "   ", "abc", "-", ".", "$20", "1e999", "Infinity"] {
            assert_eq!(parse_amount(text), 0.0, "input {text:?}");
        }
    }

    #[test]
    fn raw_field_accepts_strings_numbers_and_null() {
        let fields: Vec<RawField> = serde_json::from_str(r#"["20", 40, 1.5, null]"#).unwrap();
        assert_eq!(fields[0].as_str(), "20");
        assert_eq!(fields[1].as_str(), "40");
        assert_eq!(fields[2].value(), 1.5);
        assert!(fields[3].is_blank());
    }

    #[test]
    fn known_net_is_tri_state() {
        let mut entry = CheckEntry::default();
        assert_eq!(entry.to_input().known_net_override, None);

        entry.known_net = RawField::from("0");
        assert_eq!(entry.to_input().known_net_override, Some(0.0));

        entry.known_net = RawField::from("   ");
        assert_eq!(entry.to_input().known_net_override, None);
    }

    #[test]
    fn check_entry_uses_form_keys() {
        let entry: CheckEntry = serde_json::from_str(
            r#"{"frequency":"biweekly","hourlyPay":"25","k401Percent":"6","knownNet":""}"#,
        )
        .unwrap();
        assert_eq!(entry.frequency, PayFrequency::Biweekly);
        assert_eq!(entry.hourly_pay.value(), 25.0);
        assert_eq!(entry.k401_percent.value(), 6.0);
        assert!(entry.known_net.is_blank());
    }

    #[test]
    fn unknown_enum_text_maps_to_defaults() {
        let frequency: PayFrequency = serde_json::from_str(r#""monthly""#).unwrap();
        assert_eq!(frequency, PayFrequency::Biweekly);
        let blank: PayFrequency = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(blank, PayFrequency::Weekly);
        let kind: ItemKind = serde_json::from_str(r#""refund""#).unwrap();
        assert_eq!(kind, ItemKind::Expense);
        let theme: Theme = serde_json::from_str(r#""solarized""#).unwrap();
        assert_eq!(theme, Theme::Dark);
        let tab: Tab = serde_json::from_str(r#""budget""#).unwrap();
        assert_eq!(tab, Tab::Budget);
    }

    #[test]
    fn account_display_name_follows_type() {
        let mut account: Account =
            serde_json::from_str(r#"{"id":"acc-3","type":"High-Yield Savings","amount":"50"}"#)
                .unwrap();
        assert_eq!(account.display_name(), "High-Yield Savings");
        assert_eq!(account.id.sequence(), Some(3));

        account.set_type(AccountType::Custom);
        assert_eq!(account.display_name(), "Custom Account");
        account.custom_name = "  Vacation ".to_string();
        assert_eq!(account.display_name(), "Vacation");

        account.set_type(AccountType::from("Brokerage".to_string()));
        assert_eq!(account.display_name(), "Brokerage");
        assert!(account.custom_name.is_empty());

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["type"], "Brokerage");
        assert_eq!(json["customName"], "");
    }

    #[test]
    fn category_assignment_treats_blank_account_as_unassigned() {
        let plan: BudgetPlan = serde_json::from_str(
            r#"{"bills":{"amount":"100","account":""},"debt":{"amount":"5","account":"acc-2"}}"#,
        )
        .unwrap();
        assert_eq!(plan.bills.account, None);
        assert_eq!(plan.debt.account, Some(AccountId::from("acc-2")));
        assert!(plan.savings.amount.is_blank());
    }

    #[test]
    fn adjustment_amounts_are_floored_before_signing() {
        let refund = AdjustmentItem {
            kind: ItemKind::Income,
            name: "refund".to_string(),
            amount: RawField::from("-40"),
        };
        assert_eq!(refund.signed_amount(), 0.0);

        let rent = AdjustmentItem {
            kind: ItemKind::Expense,
            name: "rent".to_string(),
            amount: RawField::from("1200"),
        };
        assert_eq!(rent.signed_amount(), -1200.0);
    }
}
