pub mod products;
pub mod scheduled_activations;
pub mod variants;

pub use products::Entity as Products;
pub use scheduled_activations::Entity as ScheduledActivations;
pub use variants::Entity as Variants;
