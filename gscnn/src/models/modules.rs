mod aspp;
mod atrous;
mod gate;
mod head;
mod residual;
mod resize;
pub(crate) mod utils;

pub use aspp::*;
pub use atrous::*;
pub use gate::*;
pub use head::*;
pub use residual::*;
pub use resize::*;
