mod moves;
mod oracle;
mod piece;
mod position;

pub use moves::*;
pub use oracle::*;
pub use piece::*;
pub use position::*;
