use crate::error::ValidationError;
use tracing::debug;

/// Closed interval the price slider is allowed to cover (lakh)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDomain {
    pub lower: f64,
    pub upper: f64,
}

impl PriceDomain {
    pub fn new(lower: f64, upper: f64) -> Result<Self, ValidationError> {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(ValidationError::InvertedRange {
                min: lower,
                max: upper,
            });
        }
        Ok(Self { lower, upper })
    }

    fn clamp(&self, value: f64, fallback: f64) -> f64 {
        if value.is_finite() {
            value.clamp(self.lower, self.upper)
        } else {
            fallback
        }
    }

    fn check(&self, value: f64) -> Result<(), ValidationError> {
        if value.is_finite() && value >= self.lower && value <= self.upper {
            Ok(())
        } else {
            Err(ValidationError::OutOfDomain {
                value,
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

impl Default for PriceDomain {
    fn default() -> Self {
        Self {
            lower: 1.0,
            upper: 50.0,
        }
    }
}

/// Selected price window. Always satisfies `min <= max` inside its domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    min: f64,
    max: f64,
}

impl PriceRange {
    /// The whole domain, which is also the default selection
    pub fn full(domain: &PriceDomain) -> Self {
        Self {
            min: domain.lower,
            max: domain.upper,
        }
    }

    /// Accept the pair only if it is already a valid range
    pub fn checked(min: f64, max: f64, domain: &PriceDomain) -> Result<Self, ValidationError> {
        domain.check(min)?;
        domain.check(max)?;
        if min > max {
            return Err(ValidationError::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Swap an inverted pair, then clamp both ends into the domain
    pub fn normalized(min: f64, max: f64, domain: &PriceDomain) -> Self {
        match Self::checked(min, max, domain) {
            Ok(range) => range,
            Err(err) => {
                debug!("Normalizing price range: {}", err);
                let min = domain.clamp(min, domain.lower);
                let max = domain.clamp(max, domain.upper);
                if min <= max {
                    Self { min, max }
                } else {
                    Self { min: max, max: min }
                }
            }
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Value of every filter dimension at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub brand: Option<String>,
    pub fuel: Option<String>,
    pub year: Option<String>,
    pub transmission: Option<String>,
    pub owner: Option<String>,
    pub price_range: PriceRange,
    pub verified_only: bool,
}

impl FilterCriteria {
    pub fn defaults(domain: &PriceDomain) -> Self {
        Self {
            brand: None,
            fuel: None,
            year: None,
            transmission: None,
            owner: None,
            price_range: PriceRange::full(domain),
            verified_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page: u32,
    page_size: u32,
}

impl PaginationState {
    /// Pages are lifted to 1 and capped so that `skip` always fits in a `u32`
    pub fn new(page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        Self {
            page: page.clamp(1, Self::max_page(page_size)),
            page_size,
        }
    }

    /// Highest page whose offset `(page - 1) * page_size` is representable
    pub fn max_page(page_size: u32) -> u32 {
        u32::MAX / page_size.max(1)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

/// Current filter snapshot plus the pagination cursor.
///
/// Mutators only update memory; pushing the URL and refetching is the
/// coordinator's job.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    criteria: FilterCriteria,
    pagination: PaginationState,
    domain: PriceDomain,
}

impl FilterState {
    pub fn new(domain: PriceDomain, page_size: u32) -> Self {
        Self {
            criteria: FilterCriteria::defaults(&domain),
            pagination: PaginationState::new(1, page_size),
            domain,
        }
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn brand(&self) -> Option<&str> {
        self.criteria.brand.as_deref()
    }

    pub fn fuel(&self) -> Option<&str> {
        self.criteria.fuel.as_deref()
    }

    pub fn year(&self) -> Option<&str> {
        self.criteria.year.as_deref()
    }

    pub fn transmission(&self) -> Option<&str> {
        self.criteria.transmission.as_deref()
    }

    pub fn owner(&self) -> Option<&str> {
        self.criteria.owner.as_deref()
    }

    pub fn price_range(&self) -> PriceRange {
        self.criteria.price_range
    }

    pub fn verified_only(&self) -> bool {
        self.criteria.verified_only
    }

    pub fn page(&self) -> u32 {
        self.pagination.page()
    }

    pub fn set_brand(&mut self, brand: Option<String>) {
        self.criteria.brand = brand;
    }

    pub fn set_fuel(&mut self, fuel: Option<String>) {
        self.criteria.fuel = fuel;
    }

    pub fn set_year(&mut self, year: Option<String>) {
        self.criteria.year = year;
    }

    pub fn set_transmission(&mut self, transmission: Option<String>) {
        self.criteria.transmission = transmission;
    }

    pub fn set_owner(&mut self, owner: Option<String>) {
        self.criteria.owner = owner;
    }

    pub fn set_price_range(&mut self, min: f64, max: f64) {
        self.criteria.price_range = PriceRange::normalized(min, max, &self.domain);
    }

    pub fn set_verified_only(&mut self, verified_only: bool) {
        self.criteria.verified_only = verified_only;
    }

    /// Pages are 1-based; zero is lifted to the first page
    pub fn set_page(&mut self, page: u32) {
        self.pagination = PaginationState::new(page, self.pagination.page_size());
    }

    /// Back to the configured defaults, first page
    pub fn reset(&mut self) {
        self.criteria = FilterCriteria::defaults(&self.domain);
        self.set_page(1);
    }
}
