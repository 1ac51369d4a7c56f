mod operational_state;
mod record;
mod update;

pub use operational_state::*;
pub use record::*;
pub use update::*;
