pub mod axis;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod sample;
