pub mod counts;
pub mod grouped;
pub mod matrix;
pub mod median;
pub mod range;
pub mod sum;
mod utils;
pub mod variance;

pub use matrix::MatrixAccess;
pub use utils::Direction;
pub use utils::FloatOps;
pub use utils::Options;
pub use utils::{tabulate_groups, total_groups};
