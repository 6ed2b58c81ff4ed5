pub mod population;
pub mod revenue;

pub use population::{consolidate_population, national_totals, NationalTotal, PopulationTable};
pub use revenue::{consolidate_revenue, Granularity, RevenueTable};
