pub mod tick;

pub use tick::{PriceTick, SPREAD};
