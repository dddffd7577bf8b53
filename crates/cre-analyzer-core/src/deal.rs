use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CreError;
use crate::time_value;
use crate::types::{Area, Money, Rate};
use crate::CreResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A tenant on the rent roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    /// Leased area
    pub area: Area,
    /// Year-1 annual rent per unit of area
    pub rent_per_area: Money,
    /// Last projection year the in-place lease covers
    pub lease_expiration_year: u32,
}

/// How gross rent is projected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "tenants", rename_all = "snake_case")]
pub enum RevenueMode {
    /// Whole-building rent per area at year-1 then stabilized occupancy
    #[default]
    Blended,
    /// Lease-by-lease projection with a re-leasing assumption after expiry
    TenantRoll(Vec<Tenant>),
}

/// Immutable parameter record for a single acquisition.
///
/// Financing quantities (equity, loan, debt service) are never stored; they
/// are derived from the primary fields on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInput {
    // Property
    pub building_area: Area,
    pub purchase_price: Money,
    pub closing_cost_pct: Rate,

    // Financing
    pub down_payment_pct: Rate,
    pub interest_rate: Rate,
    pub loan_term_years: u32,

    // Revenue
    pub base_rent_per_area: Money,
    pub rent_growth_rate: Rate,
    pub year1_occupancy: Rate,
    pub stabilized_occupancy: Rate,
    pub other_income_pct: Rate,
    #[serde(default)]
    pub revenue_mode: RevenueMode,
    /// Share of an expired tenant's area assumed re-leased at market
    #[serde(default = "default_release_occupancy_share")]
    pub release_occupancy_share: Rate,

    // Operating expenses
    pub property_tax_per_area: Money,
    pub insurance_per_area: Money,
    pub cam_per_area: Money,
    pub management_fee_pct: Rate,
    pub leasing_commission_pct: Rate,
    pub repairs_maintenance: Money,
    pub capex_reserve_per_area: Money,
    pub initial_ti: Money,

    // Tax
    pub tax_rate: Rate,
    pub land_value_pct: Rate,
    pub depreciation_years: u32,
    #[serde(default = "default_depreciation_recapture_rate")]
    pub depreciation_recapture_rate: Rate,

    // Exit
    pub hold_period_years: u32,
    pub exit_cap_rate: Rate,
    pub sale_cost_pct: Rate,
    pub discount_rate: Rate,
}

fn default_release_occupancy_share() -> Rate {
    dec!(0.5)
}

fn default_depreciation_recapture_rate() -> Rate {
    dec!(0.25)
}

impl Default for DealInput {
    /// A 50,000 sf single-building acquisition at $10M.
    fn default() -> Self {
        DealInput {
            building_area: dec!(50000),
            purchase_price: dec!(10000000),
            closing_cost_pct: dec!(0.03),
            down_payment_pct: dec!(0.25),
            interest_rate: dec!(0.07),
            loan_term_years: 25,
            base_rent_per_area: dec!(18),
            rent_growth_rate: dec!(0.03),
            year1_occupancy: dec!(0.90),
            stabilized_occupancy: dec!(0.95),
            other_income_pct: dec!(0.02),
            revenue_mode: RevenueMode::Blended,
            release_occupancy_share: default_release_occupancy_share(),
            property_tax_per_area: dec!(1.50),
            insurance_per_area: dec!(0.75),
            cam_per_area: dec!(1.25),
            management_fee_pct: dec!(0.04),
            leasing_commission_pct: dec!(0.03),
            repairs_maintenance: dec!(25000),
            capex_reserve_per_area: dec!(0.75),
            initial_ti: dec!(250000),
            tax_rate: dec!(0.25),
            land_value_pct: dec!(0.20),
            depreciation_years: 39,
            depreciation_recapture_rate: default_depreciation_recapture_rate(),
            hold_period_years: 10,
            exit_cap_rate: dec!(0.065),
            sale_cost_pct: dec!(0.02),
            discount_rate: dec!(0.12),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived financing quantities
// ---------------------------------------------------------------------------

impl DealInput {
    pub fn price_per_area(&self) -> Money {
        if self.building_area.is_zero() {
            return Decimal::ZERO;
        }
        self.purchase_price / self.building_area
    }

    /// Purchase price grossed up for closing costs.
    pub fn total_acquisition_cost(&self) -> Money {
        self.purchase_price * (Decimal::ONE + self.closing_cost_pct)
    }

    pub fn equity_required(&self) -> Money {
        self.total_acquisition_cost() * self.down_payment_pct
    }

    pub fn loan_amount(&self) -> Money {
        self.total_acquisition_cost() - self.equity_required()
    }

    /// Loan amount over total acquisition cost.
    pub fn loan_to_value(&self) -> Rate {
        Decimal::ONE - self.down_payment_pct
    }

    /// Level annual payment that fully amortizes the loan over its term.
    /// Straight-line principal when the rate is zero.
    pub fn annual_debt_service(&self) -> CreResult<Money> {
        let payment = time_value::pmt(
            self.interest_rate,
            self.loan_term_years,
            self.loan_amount(),
            Decimal::ZERO,
        )?;
        Ok(-payment)
    }

    pub fn monthly_debt_service(&self) -> CreResult<Money> {
        Ok(self.annual_debt_service()? / dec!(12))
    }

    /// Building (non-land) share of the purchase price.
    pub fn depreciable_basis(&self) -> Money {
        self.purchase_price * (Decimal::ONE - self.land_value_pct)
    }

    pub fn annual_depreciation(&self) -> CreResult<Money> {
        if self.depreciation_years == 0 {
            return Err(CreError::DivisionByZero {
                context: "annual depreciation (zero-year schedule)".into(),
            });
        }
        Ok(self.depreciable_basis() / Decimal::from(self.depreciation_years))
    }

    /// Copy of this deal with only the down payment changed.
    pub fn with_down_payment(&self, down_payment_pct: Rate) -> DealInput {
        DealInput {
            down_payment_pct,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl DealInput {
    /// Reject inputs no run can be built from.
    pub fn validate(&self) -> CreResult<()> {
        if self.building_area <= Decimal::ZERO {
            return Err(CreError::invalid(
                "building_area",
                "Building area must be positive",
            ));
        }
        if self.purchase_price <= Decimal::ZERO {
            return Err(CreError::invalid(
                "purchase_price",
                "Purchase price must be positive",
            ));
        }
        if self.closing_cost_pct < Decimal::ZERO {
            return Err(CreError::invalid(
                "closing_cost_pct",
                "Closing costs cannot be negative",
            ));
        }
        check_fraction("down_payment_pct", self.down_payment_pct)?;
        if self.down_payment_pct.is_zero() {
            return Err(CreError::invalid(
                "down_payment_pct",
                "Down payment must be above zero: returns are measured on equity",
            ));
        }
        if self.interest_rate < Decimal::ZERO {
            return Err(CreError::invalid(
                "interest_rate",
                "Interest rate cannot be negative",
            ));
        }
        if self.loan_term_years == 0 {
            return Err(CreError::invalid(
                "loan_term_years",
                "Loan term must be at least 1 year",
            ));
        }
        if self.base_rent_per_area < Decimal::ZERO {
            return Err(CreError::invalid(
                "base_rent_per_area",
                "Base rent cannot be negative",
            ));
        }
        if self.rent_growth_rate <= dec!(-1) {
            return Err(CreError::invalid(
                "rent_growth_rate",
                "Growth rate must be greater than -100%",
            ));
        }
        check_fraction("year1_occupancy", self.year1_occupancy)?;
        check_fraction("stabilized_occupancy", self.stabilized_occupancy)?;
        check_fraction("other_income_pct", self.other_income_pct)?;
        check_fraction("release_occupancy_share", self.release_occupancy_share)?;
        check_non_negative("property_tax_per_area", self.property_tax_per_area)?;
        check_non_negative("insurance_per_area", self.insurance_per_area)?;
        check_non_negative("cam_per_area", self.cam_per_area)?;
        check_fraction("management_fee_pct", self.management_fee_pct)?;
        check_fraction("leasing_commission_pct", self.leasing_commission_pct)?;
        check_non_negative("repairs_maintenance", self.repairs_maintenance)?;
        check_non_negative("capex_reserve_per_area", self.capex_reserve_per_area)?;
        check_non_negative("initial_ti", self.initial_ti)?;
        check_fraction("tax_rate", self.tax_rate)?;
        check_fraction("land_value_pct", self.land_value_pct)?;
        check_fraction("depreciation_recapture_rate", self.depreciation_recapture_rate)?;
        if self.depreciation_years == 0 {
            return Err(CreError::invalid(
                "depreciation_years",
                "Depreciation period must be at least 1 year",
            ));
        }
        if self.hold_period_years == 0 {
            return Err(CreError::invalid(
                "hold_period_years",
                "Hold period must be at least 1 year",
            ));
        }
        if self.exit_cap_rate <= Decimal::ZERO {
            return Err(CreError::invalid(
                "exit_cap_rate",
                "Exit cap rate must be positive",
            ));
        }
        check_fraction("sale_cost_pct", self.sale_cost_pct)?;
        if self.discount_rate <= dec!(-1) {
            return Err(CreError::invalid(
                "discount_rate",
                "Discount rate must be greater than -100%",
            ));
        }

        if let RevenueMode::TenantRoll(tenants) = &self.revenue_mode {
            if tenants.is_empty() {
                return Err(CreError::invalid(
                    "revenue_mode",
                    "Tenant roll mode requires at least one tenant",
                ));
            }
            for tenant in tenants {
                if tenant.area <= Decimal::ZERO {
                    return Err(CreError::invalid(
                        "tenants",
                        format!("Tenant '{}' must lease a positive area", tenant.name),
                    ));
                }
                if tenant.rent_per_area < Decimal::ZERO {
                    return Err(CreError::invalid(
                        "tenants",
                        format!("Tenant '{}' has negative rent", tenant.name),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Non-fatal observations about the assumptions.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.loan_term_years < self.hold_period_years {
            warnings.push(format!(
                "Loan term of {} years is shorter than the {}-year hold: debt service stops once repaid",
                self.loan_term_years, self.hold_period_years
            ));
        }
        if self.depreciation_years < self.hold_period_years {
            warnings.push(format!(
                "Depreciation continues past the {}-year schedule for the remainder of the hold",
                self.depreciation_years
            ));
        }
        if self.loan_to_value() > dec!(0.80) {
            warnings.push(format!(
                "LTV of {:.1}% exceeds 80%: high leverage",
                (self.loan_to_value() * dec!(100)).round_dp(1)
            ));
        }
        if self.exit_cap_rate < dec!(0.03) {
            warnings.push(format!(
                "Exit cap rate {} is below 3%: unusually low, verify market data",
                self.exit_cap_rate
            ));
        }
        if let RevenueMode::TenantRoll(tenants) = &self.revenue_mode {
            let leased: Area = tenants.iter().map(|t| t.area).sum();
            if leased > self.building_area {
                warnings.push(format!(
                    "Tenant roll leases {leased} against a building area of {}",
                    self.building_area
                ));
            }
        }

        warnings
    }
}

fn check_fraction(field: &str, value: Rate) -> CreResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(CreError::invalid(field, "Must be a fraction between 0 and 1"));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: Decimal) -> CreResult<()> {
    if value < Decimal::ZERO {
        return Err(CreError::invalid(field, "Cannot be negative"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Named parameters
// ---------------------------------------------------------------------------

/// A numeric input field addressable by name, used by sweeps to build
/// overridden copies of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputParameter {
    BuildingArea,
    PurchasePrice,
    ClosingCostPct,
    DownPaymentPct,
    InterestRate,
    LoanTermYears,
    BaseRentPerArea,
    RentGrowthRate,
    Year1Occupancy,
    StabilizedOccupancy,
    OtherIncomePct,
    PropertyTaxPerArea,
    InsurancePerArea,
    CamPerArea,
    ManagementFeePct,
    LeasingCommissionPct,
    RepairsMaintenance,
    CapexReservePerArea,
    InitialTi,
    TaxRate,
    LandValuePct,
    DepreciationYears,
    HoldPeriodYears,
    ExitCapRate,
    SaleCostPct,
    DiscountRate,
}

impl InputParameter {
    pub const ALL: [InputParameter; 26] = [
        InputParameter::BuildingArea,
        InputParameter::PurchasePrice,
        InputParameter::ClosingCostPct,
        InputParameter::DownPaymentPct,
        InputParameter::InterestRate,
        InputParameter::LoanTermYears,
        InputParameter::BaseRentPerArea,
        InputParameter::RentGrowthRate,
        InputParameter::Year1Occupancy,
        InputParameter::StabilizedOccupancy,
        InputParameter::OtherIncomePct,
        InputParameter::PropertyTaxPerArea,
        InputParameter::InsurancePerArea,
        InputParameter::CamPerArea,
        InputParameter::ManagementFeePct,
        InputParameter::LeasingCommissionPct,
        InputParameter::RepairsMaintenance,
        InputParameter::CapexReservePerArea,
        InputParameter::InitialTi,
        InputParameter::TaxRate,
        InputParameter::LandValuePct,
        InputParameter::DepreciationYears,
        InputParameter::HoldPeriodYears,
        InputParameter::ExitCapRate,
        InputParameter::SaleCostPct,
        InputParameter::DiscountRate,
    ];

    /// Field name as it appears in the serialized deal.
    pub fn name(&self) -> &'static str {
        match self {
            InputParameter::BuildingArea => "building_area",
            InputParameter::PurchasePrice => "purchase_price",
            InputParameter::ClosingCostPct => "closing_cost_pct",
            InputParameter::DownPaymentPct => "down_payment_pct",
            InputParameter::InterestRate => "interest_rate",
            InputParameter::LoanTermYears => "loan_term_years",
            InputParameter::BaseRentPerArea => "base_rent_per_area",
            InputParameter::RentGrowthRate => "rent_growth_rate",
            InputParameter::Year1Occupancy => "year1_occupancy",
            InputParameter::StabilizedOccupancy => "stabilized_occupancy",
            InputParameter::OtherIncomePct => "other_income_pct",
            InputParameter::PropertyTaxPerArea => "property_tax_per_area",
            InputParameter::InsurancePerArea => "insurance_per_area",
            InputParameter::CamPerArea => "cam_per_area",
            InputParameter::ManagementFeePct => "management_fee_pct",
            InputParameter::LeasingCommissionPct => "leasing_commission_pct",
            InputParameter::RepairsMaintenance => "repairs_maintenance",
            InputParameter::CapexReservePerArea => "capex_reserve_per_area",
            InputParameter::InitialTi => "initial_ti",
            InputParameter::TaxRate => "tax_rate",
            InputParameter::LandValuePct => "land_value_pct",
            InputParameter::DepreciationYears => "depreciation_years",
            InputParameter::HoldPeriodYears => "hold_period_years",
            InputParameter::ExitCapRate => "exit_cap_rate",
            InputParameter::SaleCostPct => "sale_cost_pct",
            InputParameter::DiscountRate => "discount_rate",
        }
    }

    /// Axis label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            InputParameter::BuildingArea => "Building Area",
            InputParameter::PurchasePrice => "Purchase Price",
            InputParameter::ClosingCostPct => "Closing Costs",
            InputParameter::DownPaymentPct => "Down Payment",
            InputParameter::InterestRate => "Interest Rate",
            InputParameter::LoanTermYears => "Loan Term (Years)",
            InputParameter::BaseRentPerArea => "Rent per Area",
            InputParameter::RentGrowthRate => "Rent Growth",
            InputParameter::Year1Occupancy => "Year 1 Occupancy",
            InputParameter::StabilizedOccupancy => "Stabilized Occupancy",
            InputParameter::OtherIncomePct => "Other Income",
            InputParameter::PropertyTaxPerArea => "Property Tax per Area",
            InputParameter::InsurancePerArea => "Insurance per Area",
            InputParameter::CamPerArea => "CAM per Area",
            InputParameter::ManagementFeePct => "Management Fee",
            InputParameter::LeasingCommissionPct => "Leasing Commission",
            InputParameter::RepairsMaintenance => "Repairs & Maintenance",
            InputParameter::CapexReservePerArea => "CapEx Reserve per Area",
            InputParameter::InitialTi => "Initial TI",
            InputParameter::TaxRate => "Tax Rate",
            InputParameter::LandValuePct => "Land Value",
            InputParameter::DepreciationYears => "Depreciation Period (Years)",
            InputParameter::HoldPeriodYears => "Hold Period (Years)",
            InputParameter::ExitCapRate => "Exit Cap Rate",
            InputParameter::SaleCostPct => "Sale Costs",
            InputParameter::DiscountRate => "Discount Rate",
        }
    }

    /// Whether the field holds a whole number of years.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            InputParameter::LoanTermYears
                | InputParameter::DepreciationYears
                | InputParameter::HoldPeriodYears
        )
    }

    /// Current value of this field on `input`.
    pub fn value_of(&self, input: &DealInput) -> Decimal {
        match self {
            InputParameter::BuildingArea => input.building_area,
            InputParameter::PurchasePrice => input.purchase_price,
            InputParameter::ClosingCostPct => input.closing_cost_pct,
            InputParameter::DownPaymentPct => input.down_payment_pct,
            InputParameter::InterestRate => input.interest_rate,
            InputParameter::LoanTermYears => Decimal::from(input.loan_term_years),
            InputParameter::BaseRentPerArea => input.base_rent_per_area,
            InputParameter::RentGrowthRate => input.rent_growth_rate,
            InputParameter::Year1Occupancy => input.year1_occupancy,
            InputParameter::StabilizedOccupancy => input.stabilized_occupancy,
            InputParameter::OtherIncomePct => input.other_income_pct,
            InputParameter::PropertyTaxPerArea => input.property_tax_per_area,
            InputParameter::InsurancePerArea => input.insurance_per_area,
            InputParameter::CamPerArea => input.cam_per_area,
            InputParameter::ManagementFeePct => input.management_fee_pct,
            InputParameter::LeasingCommissionPct => input.leasing_commission_pct,
            InputParameter::RepairsMaintenance => input.repairs_maintenance,
            InputParameter::CapexReservePerArea => input.capex_reserve_per_area,
            InputParameter::InitialTi => input.initial_ti,
            InputParameter::TaxRate => input.tax_rate,
            InputParameter::LandValuePct => input.land_value_pct,
            InputParameter::DepreciationYears => Decimal::from(input.depreciation_years),
            InputParameter::HoldPeriodYears => Decimal::from(input.hold_period_years),
            InputParameter::ExitCapRate => input.exit_cap_rate,
            InputParameter::SaleCostPct => input.sale_cost_pct,
            InputParameter::DiscountRate => input.discount_rate,
        }
    }

    /// Copy of `input` with this field set to `value`. Other fields are untouched.
    pub fn apply(&self, input: &DealInput, value: Decimal) -> CreResult<DealInput> {
        let mut out = input.clone();
        match self {
            InputParameter::BuildingArea => out.building_area = value,
            InputParameter::PurchasePrice => out.purchase_price = value,
            InputParameter::ClosingCostPct => out.closing_cost_pct = value,
            InputParameter::DownPaymentPct => out.down_payment_pct = value,
            InputParameter::InterestRate => out.interest_rate = value,
            InputParameter::LoanTermYears => out.loan_term_years = self.whole_years(value)?,
            InputParameter::BaseRentPerArea => out.base_rent_per_area = value,
            InputParameter::RentGrowthRate => out.rent_growth_rate = value,
            InputParameter::Year1Occupancy => out.year1_occupancy = value,
            InputParameter::StabilizedOccupancy => out.stabilized_occupancy = value,
            InputParameter::OtherIncomePct => out.other_income_pct = value,
            InputParameter::PropertyTaxPerArea => out.property_tax_per_area = value,
            InputParameter::InsurancePerArea => out.insurance_per_area = value,
            InputParameter::CamPerArea => out.cam_per_area = value,
            InputParameter::ManagementFeePct => out.management_fee_pct = value,
            InputParameter::LeasingCommissionPct => out.leasing_commission_pct = value,
            InputParameter::RepairsMaintenance => out.repairs_maintenance = value,
            InputParameter::CapexReservePerArea => out.capex_reserve_per_area = value,
            InputParameter::InitialTi => out.initial_ti = value,
            InputParameter::TaxRate => out.tax_rate = value,
            InputParameter::LandValuePct => out.land_value_pct = value,
            InputParameter::DepreciationYears => out.depreciation_years = self.whole_years(value)?,
            InputParameter::HoldPeriodYears => out.hold_period_years = self.whole_years(value)?,
            InputParameter::ExitCapRate => out.exit_cap_rate = value,
            InputParameter::SaleCostPct => out.sale_cost_pct = value,
            InputParameter::DiscountRate => out.discount_rate = value,
        }
        Ok(out)
    }

    fn whole_years(&self, value: Decimal) -> CreResult<u32> {
        if !value.fract().is_zero() {
            return Err(CreError::invalid(
                self.name(),
                format!("{value} is not a whole number of years"),
            ));
        }
        value
            .to_u32()
            .ok_or_else(|| CreError::invalid(self.name(), format!("{value} is out of range")))
    }
}

impl fmt::Display for InputParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputParameter {
    type Err = CreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InputParameter::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| CreError::invalid("parameter", format!("Unknown input parameter '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
