pub mod associations;
pub mod ingredients;
pub mod recipes;
pub mod tags;
pub mod users;

pub use associations::*;
pub use ingredients::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
