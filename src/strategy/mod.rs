pub mod accountant;
pub mod historical;
pub mod ma_crossover;
