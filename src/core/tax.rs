use super::types::PayFrequency;

pub const PAYROLL_TAX_RATE: f64 = 0.0765;
pub const STANDARD_DEDUCTION: f64 = 15_750.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBracket {
    pub cap: f64,
    pub rate: f64,
}

const fn band(cap: f64, rate: f64) -> TaxBracket {
    TaxBracket { cap, rate }
}

pub const FEDERAL_BRACKETS: [TaxBracket; 7] = [
    band(12_400.0, 0.10),
    band(50_400.0, 0.12),
    band(105_700.0, 0.22),
    band(201_775.0, 0.24),
    band(256_225.0, 0.32),
    band(640_600.0, 0.35),
    band(f64::INFINITY, 0.37),
];

/// New Mexico single-filer schedule.
pub const STATE_BRACKETS: [TaxBracket; 5] = [
    band(5_500.0, 0.017),
    band(11_000.0, 0.032),
    band(16_000.0, 0.047),
    band(210_000.0, 0.049),
    band(f64::INFINITY, 0.059),
];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Withholding {
    pub federal: f64,
    pub state: f64,
    pub payroll: f64,
}

impl Withholding {
    pub fn total(self) -> f64 {
        (self.federal + self.state + self.payroll).max(0.0)
    }
}

pub fn annual_multiplier(frequency: PayFrequency) -> f64 {
    match frequency {
        PayFrequency::Weekly => 52.0,
        PayFrequency::Biweekly => 26.0,
    }
}

pub fn bracket_tax(amount: f64, brackets: &[TaxBracket]) -> f64 {
    if amount.is_nan() || amount <= 0.0 {
        return 0.0;
    }

    let mut tax = 0.0;
    let mut previous_cap = 0.0;
    for bracket in brackets {
        if amount <= previous_cap {
            break;
        }
        tax += (amount.min(bracket.cap) - previous_cap) * bracket.rate;
        previous_cap = bracket.cap;
    }
    tax.max(0.0)
}

/// Annualizes one paycheck, taxes it, and converts back to a per-check amount.
///
/// 401k is pre-tax for both income taxes. Federal tax applies the standard
/// deduction; state tax is levied on the undeducted annual base. Payroll tax is
/// a flat rate on gross with no wage cap.
pub fn withhold(gross: f64, k401: f64, frequency: PayFrequency) -> Withholding {
    let multiplier = annual_multiplier(frequency);
    let annual_taxable = ((gross - k401) * multiplier).max(0.0);
    let annual_federal_taxable = (annual_taxable - STANDARD_DEDUCTION).max(0.0);

    Withholding {
        federal: bracket_tax(annual_federal_taxable, &FEDERAL_BRACKETS) / multiplier,
        state: bracket_tax(annual_taxable, &STATE_BRACKETS) / multiplier,
        payroll: gross * PAYROLL_TAX_RATE,
    }
}
