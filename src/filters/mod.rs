pub mod baseline;
pub mod meal_ukf;
pub mod weights;

pub use baseline::GlucoseBaseline;
pub use meal_ukf::{FilterStep, MealUkf};
pub use weights::UtWeights;
