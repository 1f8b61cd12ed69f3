pub mod codec;
pub mod mask;
pub mod random;
