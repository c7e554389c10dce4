//! Fixed registries of population groups, sectors, taxes and key metrics.
//!
//! Every registry is a closed enum whose variants carry the row label used in
//! the backing tables. Per-entry data lives in [`KeyedTable`], which is
//! indexed by the enum rather than by free-form strings, so adding a variant
//! forces every `match` over it to be revisited.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// A closed set of keys with stable dense indices.
pub trait Keyed: Copy + Eq + fmt::Debug + 'static {
    /// Every key, in registry order.
    const ALL: &'static [Self];

    /// Dense index in `0..ALL.len()`.
    fn index(self) -> usize;

    /// Row label used in the backing tables.
    fn label(self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.label() == label)
    }
}

/// Generates the registry plumbing for a unit-variant enum: `ALL`, the
/// dense index, label lookup, `Display` and string conversions for serde.
macro_rules! label_enum {
    ($name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl Keyed for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn index(self) -> usize {
                self as usize
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.label().to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                <$name as Keyed>::from_label(&s)
                    .ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }
    };
}

/// Dense per-key storage for a [`Keyed`] registry.
#[derive(Clone, PartialEq)]
pub struct KeyedTable<K, T> {
    values: Vec<T>,
    _key: PhantomData<K>,
}

impl<K: Keyed, T> KeyedTable<K, T> {
    pub fn from_fn(mut f: impl FnMut(K) -> T) -> Self {
        Self {
            values: K::ALL.iter().map(|&k| f(k)).collect(),
            _key: PhantomData,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        K::ALL.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
        K::ALL.iter().copied().zip(self.values.iter_mut())
    }

    pub fn map<U>(&self, mut f: impl FnMut(K, &T) -> U) -> KeyedTable<K, U> {
        KeyedTable::from_fn(|k| f(k, &self[k]))
    }
}

impl<K: Keyed, T: Default> Default for KeyedTable<K, T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<K: Keyed, T> Index<K> for KeyedTable<K, T> {
    type Output = T;

    fn index(&self, key: K) -> &T {
        &self.values[key.index()]
    }
}

impl<K: Keyed, T> IndexMut<K> for KeyedTable<K, T> {
    fn index_mut(&mut self, key: K) -> &mut T {
        &mut self.values[key.index()]
    }
}

impl<K: Keyed, T: fmt::Debug> fmt::Debug for KeyedTable<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (k.label(), v)))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

/// Demographic groups tracked per region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PopulationGroup {
    Liberal,
    Conservative,
    Capitalist,
    Socialist,
    Youth,
    Adult,
    Seniors,
    Religious,
    NonReligious,
    LowIncome,
    MediumIncome,
    HighIncome,
}

label_enum!(PopulationGroup {
    Liberal => "Liberal",
    Conservative => "Conservative",
    Capitalist => "Capitalist",
    Socialist => "Socialist",
    Youth => "Youth",
    Adult => "Adult",
    Seniors => "Seniors",
    Religious => "Religious",
    NonReligious => "Non Religious",
    LowIncome => "Low Income",
    MediumIncome => "Medium Income",
    HighIncome => "High Income",
});

impl PopulationGroup {
    /// The mutually exclusive set this group belongs to.
    pub fn set(self) -> GroupSet {
        use PopulationGroup::*;
        match self {
            Liberal | Conservative => GroupSet::Political,
            Capitalist | Socialist => GroupSet::Economic,
            Youth | Adult | Seniors => GroupSet::Age,
            Religious | NonReligious => GroupSet::Religious,
            LowIncome | MediumIncome | HighIncome => GroupSet::Income,
        }
    }

    /// Income tiers carry an average income alongside size and trust.
    pub fn is_income_tier(self) -> bool {
        self.set() == GroupSet::Income
    }

    /// Mirror pairs receive opposite policy deltas. Returns the primary group
    /// whose delta is negated for `self`, if `self` is the secondary half.
    pub fn mirrored_from(self) -> Option<PopulationGroup> {
        match self {
            PopulationGroup::Socialist => Some(PopulationGroup::Capitalist),
            PopulationGroup::NonReligious => Some(PopulationGroup::Religious),
            _ => None,
        }
    }
}

/// Partition of the population groups; sizes within a set are conserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum GroupSet {
    Political,
    Economic,
    Age,
    Religious,
    Income,
}

label_enum!(GroupSet {
    Political => "Political",
    Economic => "Economic",
    Age => "Age",
    Religious => "Religious",
    Income => "Income",
});

impl GroupSet {
    pub fn members(self) -> impl Iterator<Item = PopulationGroup> {
        PopulationGroup::ALL
            .iter()
            .copied()
            .filter(move |g| g.set() == self)
    }
}

// ---------------------------------------------------------------------------
// Sectors
// ---------------------------------------------------------------------------

/// Economic sectors. The last two are derived rather than evolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Sector {
    Office,
    Construction,
    Healthcare,
    Manufacturing,
    RealEstate,
    Finance,
    Retail,
    Agriculture,
    Forestry,
    Defence,
    Fishing,
    Information,
    Transport,
    Electricity,
    Water,
    Mining,
    Education,
    Other,
    PublicService,
    Illicit,
}

label_enum!(Sector {
    Office => "Office",
    Construction => "Construction",
    Healthcare => "Healthcare",
    Manufacturing => "Manufacturing",
    RealEstate => "Real Estate",
    Finance => "Finance",
    Retail => "Retail",
    Agriculture => "Agriculture",
    Forestry => "Forestry",
    Defence => "Defence",
    Fishing => "Fishing",
    Information => "Information",
    Transport => "Transport",
    Electricity => "Electricity",
    Water => "Water",
    Mining => "Mining",
    Education => "Education",
    Other => "Other",
    PublicService => "Public Service",
    Illicit => "Illicit",
});

impl Sector {
    pub fn is_ordinary(self) -> bool {
        !matches!(self, Sector::PublicService | Sector::Illicit)
    }

    pub fn ordinary() -> impl Iterator<Item = Sector> {
        Sector::ALL.iter().copied().filter(|s| s.is_ordinary())
    }
}

// ---------------------------------------------------------------------------
// Taxes
// ---------------------------------------------------------------------------

/// How a tax feeds the derived policy coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaxClass {
    /// Lowers consumer spending (effect 1), raises poverty (effect 2).
    Income,
    /// Lowers consumer spending (effect 1), drives inflation (effect 2).
    Consumption,
    /// Lowers consumer spending (effect 1) and growth (effect 2).
    Savings,
    /// Lowers growth (effect 1), raises unemployment (effect 2).
    Sector,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Tax {
    IncomeBracket1,
    IncomeBracket2,
    IncomeBracket3,
    IncomeBracket4,
    IncomeBracket5,
    Gst,
    TobaccoExcise,
    AlcoholExcise,
    FuelExcise,
    SavingsTax,
    CapitalGainsTax,
    CompanyTax,
    PropertyTax,
    ImportTariff,
    MiningRoyalty,
    FinanceLevy,
    ConstructionLevy,
    AgricultureLevy,
    ManufacturingLevy,
    RetailLevy,
    TransportLevy,
    EnergyLevy,
    InformationLevy,
}

label_enum!(Tax {
    IncomeBracket1 => "Income Tax Bracket 1",
    IncomeBracket2 => "Income Tax Bracket 2",
    IncomeBracket3 => "Income Tax Bracket 3",
    IncomeBracket4 => "Income Tax Bracket 4",
    IncomeBracket5 => "Income Tax Bracket 5",
    Gst => "GST",
    TobaccoExcise => "Tobacco Excise",
    AlcoholExcise => "Alcohol Excise",
    FuelExcise => "Fuel Excise",
    SavingsTax => "Savings Tax",
    CapitalGainsTax => "Capital Gains Tax",
    CompanyTax => "Company Tax",
    PropertyTax => "Property Tax",
    ImportTariff => "Import Tariff",
    MiningRoyalty => "Mining Royalty",
    FinanceLevy => "Finance Levy",
    ConstructionLevy => "Construction Levy",
    AgricultureLevy => "Agriculture Levy",
    ManufacturingLevy => "Manufacturing Levy",
    RetailLevy => "Retail Levy",
    TransportLevy => "Transport Levy",
    EnergyLevy => "Energy Levy",
    InformationLevy => "Information Levy",
});

impl Tax {
    pub fn class(self) -> TaxClass {
        use Tax::*;
        match self {
            IncomeBracket1 | IncomeBracket2 | IncomeBracket3 | IncomeBracket4
            | IncomeBracket5 => TaxClass::Income,
            Gst | TobaccoExcise | AlcoholExcise | FuelExcise => TaxClass::Consumption,
            SavingsTax | CapitalGainsTax => TaxClass::Savings,
            CompanyTax | PropertyTax | ImportTariff | MiningRoyalty | FinanceLevy
            | ConstructionLevy | AgricultureLevy | ManufacturingLevy | RetailLevy
            | TransportLevy | EnergyLevy | InformationLevy => TaxClass::Sector,
        }
    }
}

// ---------------------------------------------------------------------------
// Key metrics
// ---------------------------------------------------------------------------

/// Scalar macro indicators kept per region (and aggregated per planet).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Metric {
    Population,
    Gdp,
    Inflation,
    Unemployment,
    Productivity,
    FinancialMalpractice,
    PovertyRate,
    LifeExpectancy,
    HomeownershipRate,
    CrimeRate,
    PrimaryEducation,
    SecondaryEducation,
    TertiaryEducation,
    ConsumerSpending,
    BigMacIndex,
    InterestRate,
    AverageIncome,
    PopGrowthRate,
    PopulationHappiness,
    PoliceStationsNeeded,
    PowerStationsNeeded,
    InternetTowersNeeded,
    CommunicationTowersNeeded,
    HospitalsNeeded,
}

label_enum!(Metric {
    Population => "Population",
    Gdp => "GDP",
    Inflation => "Inflation",
    Unemployment => "Unemployment",
    Productivity => "Productivity",
    FinancialMalpractice => "Financial Malpractice",
    PovertyRate => "Poverty Rate",
    LifeExpectancy => "Life Expectancy",
    HomeownershipRate => "Homeownership Rate",
    CrimeRate => "Crime Rate",
    PrimaryEducation => "Primary Education",
    SecondaryEducation => "Secondary Education",
    TertiaryEducation => "Tertiary Education",
    ConsumerSpending => "Consumer Spending",
    BigMacIndex => "Big Mac Index",
    InterestRate => "Interest Rate",
    AverageIncome => "Average Income",
    PopGrowthRate => "Pop Growth Rate",
    PopulationHappiness => "Population Happiness",
    PoliceStationsNeeded => "Police Stations Needed",
    PowerStationsNeeded => "Power Stations Needed",
    InternetTowersNeeded => "Internet Towers Needed",
    CommunicationTowersNeeded => "Communication Towers Needed",
    HospitalsNeeded => "Hospitals Needed",
});

impl Metric {
    /// Whole-number metrics are persisted without a fractional part.
    pub fn is_count(self) -> bool {
        matches!(
            self,
            Metric::Population
                | Metric::PoliceStationsNeeded
                | Metric::PowerStationsNeeded
                | Metric::InternetTowersNeeded
                | Metric::CommunicationTowersNeeded
                | Metric::HospitalsNeeded
        )
    }
}

pub type GroupTable<T> = KeyedTable<PopulationGroup, T>;
pub type SectorTable<T> = KeyedTable<Sector, T>;
pub type TaxTable<T> = KeyedTable<Tax, T>;
pub type MetricTable<T> = KeyedTable<Metric, T>;
